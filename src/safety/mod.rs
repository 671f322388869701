//! Safety policy: mode → exec settings, binary allowlist, audit logging,
//! plus the profile plumbing that decides which mode is active.
//!
//! The compilers (`exec_config`, `allowlist`, `audit`) are pure. Writing the
//! results out happens in [`sync_runtime_policy`] and [`switch`].

pub mod allowlist;
pub mod audit;
pub mod exec_config;
pub mod mode;
pub mod profile;
pub mod switch;

pub use allowlist::{ExecApprovals, allowlist_patterns, exec_approvals, write_exec_approvals};
pub use audit::{LoggingConfig, audit_config, audit_enabled};
pub use exec_config::{
    AskPolicy, ExecConfig, ExecSecurity, SAFE_BINS, SAFE_MODE_TOOL_DENY, exec_config,
    tool_deny_list,
};
pub use mode::SafetyMode;
pub use profile::{ActiveSafety, Profile, resolve_safety_mode};

use crate::catalog::Catalog;
use crate::config::document::{load_runtime_config, save_runtime_config};
use crate::config::merge::{PolicyKeys, apply_policy};
use crate::core::error::XopsResult;
use crate::core::paths::Paths;
use crate::core::settings::Settings;
use crate::plugins::registry::PluginRegistry;
use std::path::PathBuf;
use tracing::debug;

/// Every policy key for `mode`.
pub fn policy_keys(mode: SafetyMode, profile_audit_logging: bool) -> PolicyKeys {
    PolicyKeys {
        exec: exec_config(mode),
        logging: audit_config(audit_enabled(mode, profile_audit_logging)),
        deny: tool_deny_list(mode),
    }
}

/// Recompile policy from the active mode and the registry's enabled set,
/// then write the approvals file and, if the runtime config exists, its
/// policy keys. Returns the files that actually changed.
pub fn sync_runtime_policy(
    paths: &Paths,
    catalog: &Catalog,
    settings: &Settings,
) -> XopsResult<Vec<PathBuf>> {
    let active = resolve_safety_mode(paths, settings)?;
    let enabled = PluginRegistry::for_paths(paths).enabled_names()?;
    let mut changed = Vec::new();

    let approvals = exec_approvals(active.mode, catalog, &enabled);
    let approvals_path = paths.exec_approvals_path();
    if write_exec_approvals(&approvals_path, &approvals)? {
        changed.push(approvals_path);
    }

    let config_path = paths.runtime_config_path();
    if let Some(loaded) = load_runtime_config(&config_path)? {
        let mut value = loaded.value;
        apply_policy(&mut value, &policy_keys(active.mode, active.audit_logging()));
        if save_runtime_config(&config_path, &value, Some(&loaded.digest))? {
            changed.push(config_path);
        }
    } else {
        debug!(path = %config_path.display(), "no runtime config yet, approvals only");
    }

    Ok(changed)
}
