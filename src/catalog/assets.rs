//! Embedded catalog sources.
//!
//! Plugin manifests, tool risk tables, presets and the workspace tool map are
//! TOML files under `catalog/`, baked into the binary at compile time so the
//! CLI needs no data files at runtime.

/// Embed a list of catalog files as `(relative path, contents)` pairs.
macro_rules! embedded_catalog {
    ($($const_name:ident => [$($path:expr),* $(,)?]),* $(,)?) => {
        $(
            pub const $const_name: &[(&str, &str)] = &[
                $( ($path, include_str!(concat!("../../catalog/", $path))), )*
            ];
        )*
    };
}

embedded_catalog! {
    PLUGIN_SOURCES => [
        "plugins/kubernetes.toml",
        "plugins/docker.toml",
        "plugins/aws.toml",
        "plugins/terraform.toml",
        "plugins/observability.toml",
    ],
    TOOL_SOURCES => [
        "tools/kubectl.toml",
        "tools/docker.toml",
        "tools/aws.toml",
        "tools/terraform.toml",
        "tools/ansible.toml",
        "tools/promtool.toml",
        "tools/logcli.toml",
        "tools/jaeger.toml",
    ],
    PRESET_SOURCES => [
        "presets/devops.toml",
        "presets/sre.toml",
        "presets/platform-engineer.toml",
    ],
}

pub const WORKSPACE_TOOLS_SOURCE: (&str, &str) = (
    "workspaces.toml",
    include_str!("../../catalog/workspaces.toml"),
);

/// All embedded catalog paths, for diagnostics.
pub fn list_sources() -> Vec<&'static str> {
    PLUGIN_SOURCES
        .iter()
        .chain(TOOL_SOURCES)
        .chain(PRESET_SOURCES)
        .map(|(path, _)| *path)
        .chain(std::iter::once(WORKSPACE_TOOLS_SOURCE.0))
        .collect()
}
