//! `safety switch` and `safety show`.

use super::profile::{ActiveSafety, active_profile_name, load_profile, save_profile};
use super::{
    ExecApprovals, ExecConfig, SafetyMode, exec_approvals, exec_config, policy_keys,
    resolve_safety_mode, write_exec_approvals,
};
use crate::catalog::Catalog;
use crate::config::document::{load_runtime_config, save_runtime_config};
use crate::config::merge::apply_policy;
use crate::core::error::{XopsError, XopsResult};
use crate::core::paths::Paths;
use crate::core::settings::Settings;
use crate::plugins::registry::PluginRegistry;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SwitchReport {
    pub profile_name: String,
    /// `None` when the profile pinned a mode outside the valid set.
    pub previous: Option<SafetyMode>,
    pub current: SafetyMode,
    pub updated: Vec<PathBuf>,
}

/// Switch the active profile to `requested` and regenerate the runtime
/// policy. Everything is validated and computed before the first write.
pub fn switch_mode(
    paths: &Paths,
    catalog: &Catalog,
    settings: &Settings,
    requested: &str,
) -> XopsResult<SwitchReport> {
    let mode: SafetyMode = requested.parse()?;

    let profile_name = active_profile_name(paths)?;
    let profile_path = paths.profile_path(&profile_name);
    let mut profile = load_profile(&profile_path)?.ok_or_else(|| {
        XopsError::NotFound(format!(
            "no profile at {}; run `xopsbot generate` first",
            profile_path.display()
        ))
    })?;
    let config_path = paths.runtime_config_path();
    let loaded = load_runtime_config(&config_path)?.ok_or_else(|| {
        XopsError::NotFound(format!(
            "no runtime config at {}; run `xopsbot generate` first",
            config_path.display()
        ))
    })?;

    // an invalid pinned mode is overwritten
    let previous = match profile.mode() {
        Ok(pinned) => Some(pinned.unwrap_or(settings.fallback_mode)),
        Err(XopsError::InvalidSafetyMode(raw)) => {
            warn!(profile = %profile_name, mode = %raw, "replacing invalid pinned safety mode");
            None
        }
        Err(e) => return Err(e),
    };
    profile.set_mode(mode);

    let mut config = loaded.value;
    apply_policy(&mut config, &policy_keys(mode, profile.safety.audit_logging));

    let enabled = PluginRegistry::for_paths(paths).enabled_names()?;
    let approvals = exec_approvals(mode, catalog, &enabled);

    save_profile(&profile_path, &profile)?;
    save_runtime_config(&config_path, &config, Some(&loaded.digest))?;
    let approvals_path = paths.exec_approvals_path();
    write_exec_approvals(&approvals_path, &approvals)?;

    info!(profile = %profile_name, from = ?previous, to = %mode, "safety mode switched");
    Ok(SwitchReport {
        profile_name,
        previous,
        current: mode,
        updated: vec![profile_path, config_path, approvals_path],
    })
}

#[derive(Debug, Clone)]
pub struct SafetyStatus {
    pub active: ActiveSafety,
    pub exec: ExecConfig,
    pub approvals: ExecApprovals,
}

pub fn status(paths: &Paths, catalog: &Catalog, settings: &Settings) -> XopsResult<SafetyStatus> {
    let active = resolve_safety_mode(paths, settings)?;
    let enabled = PluginRegistry::for_paths(paths).enabled_names()?;
    Ok(SafetyStatus {
        exec: exec_config(active.mode),
        approvals: exec_approvals(active.mode, catalog, &enabled),
        active,
    })
}
