//! Role presets: a named bundle of plugins, workspaces and a safety mode.

use super::lifecycle::{InstallReport, PluginManager};
use crate::catalog::{Catalog, PresetDefinition};
use crate::core::document;
use crate::core::error::XopsResult;
use crate::core::paths::{Paths, read_marker};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct PresetApplyReport {
    pub preset: PresetDefinition,
    pub installs: Vec<InstallReport>,
    pub marker: PathBuf,
}

impl PresetApplyReport {
    /// Plugins this run actually installed, including pulled-in dependencies.
    pub fn newly_installed(&self) -> Vec<&str> {
        self.installs
            .iter()
            .flat_map(|r| r.installed.iter().map(String::as_str))
            .collect()
    }
}

pub fn active_preset(paths: &Paths) -> XopsResult<Option<String>> {
    read_marker(&paths.active_preset_marker())
}

/// Install every plugin of the preset (already installed ones are no-ops)
/// and record it as the active preset.
pub fn apply(
    manager: &PluginManager<'_>,
    paths: &Paths,
    catalog: &Catalog,
    name: &str,
) -> XopsResult<PresetApplyReport> {
    let preset = catalog.preset(name)?.clone();
    let installs = preset
        .plugins
        .iter()
        .map(|plugin| manager.install(plugin))
        .collect::<XopsResult<Vec<_>>>()?;

    let marker = paths.active_preset_marker();
    document::write_atomic(&marker, preset.name.as_bytes(), None)?;
    info!(preset = %preset.name, "preset applied");

    Ok(PresetApplyReport {
        preset,
        installs,
        marker,
    })
}
