//! Environment profiles (`profiles/<name>/profile.json`) and active mode
//! resolution.
//!
//! Every command that needs "the current safety mode" goes through
//! [`resolve_safety_mode`]:
//!
//! 1. profile name from the `active-profile` marker, else `dev`
//! 2. profile missing, or without `safety.mode`: the configured fallback
//!    (`[safety] fallback_mode`, default `standard`)
//! 3. profile unreadable, or mode outside the closed set: error

use super::SafetyMode;
use crate::core::document;
use crate::core::error::{XopsError, XopsResult};
use crate::core::paths::{DEFAULT_PROFILE, Paths, read_marker, validate_name};
use crate::core::settings::Settings;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSafety {
    /// Raw value; validated by [`Profile::mode`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default = "default_true")]
    pub audit_logging: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ProfileSafety {
    fn default() -> Self {
        Self {
            mode: None,
            audit_logging: true,
            extra: Map::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// A profile document. Keys this crate does not model (description,
/// bindings, active workspaces, ...) are carried through `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub safety: ProfileSafety,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Profile {
    pub fn new(name: &str, mode: SafetyMode) -> Self {
        Self {
            name: name.to_string(),
            environment: BTreeMap::new(),
            safety: ProfileSafety {
                mode: Some(mode.as_str().to_string()),
                ..ProfileSafety::default()
            },
            extra: Map::new(),
        }
    }

    /// `Ok(None)` when the profile does not pin a mode.
    pub fn mode(&self) -> XopsResult<Option<SafetyMode>> {
        self.safety.mode.as_deref().map(str::parse).transpose()
    }

    pub fn set_mode(&mut self, mode: SafetyMode) {
        self.safety.mode = Some(mode.as_str().to_string());
    }
}

/// Parse a profile (relaxed JSON). Absent file is `Ok(None)`.
pub fn load_profile(path: &Path) -> XopsResult<Option<Profile>> {
    let Some(snapshot) = document::read_snapshot(path)? else {
        return Ok(None);
    };
    let corrupt = |reason: String| XopsError::CorruptConfig {
        path: path.to_path_buf(),
        reason,
    };
    let contents = snapshot
        .text()
        .map_err(|e| corrupt(format!("not UTF-8: {e}")))?;
    let raw: Value = json5::from_str(contents).map_err(|e| corrupt(e.to_string()))?;
    let profile = serde_json::from_value(raw).map_err(|e| corrupt(e.to_string()))?;
    Ok(Some(profile))
}

pub fn save_profile(path: &Path, profile: &Profile) -> XopsResult<()> {
    let json = document::to_pretty_json(profile)?;
    document::write_atomic(path, json.as_bytes(), None)
}

/// Profile named by the `active-profile` marker, or `dev`. The name must be
/// a single path component.
pub fn active_profile_name(paths: &Paths) -> XopsResult<String> {
    let name =
        read_marker(&paths.active_profile_marker())?.unwrap_or_else(|| DEFAULT_PROFILE.to_string());
    validate_name("profile", &name)?;
    Ok(name)
}

/// Outcome of active mode resolution.
#[derive(Debug, Clone)]
pub struct ActiveSafety {
    pub profile_name: String,
    pub profile_path: PathBuf,
    pub profile: Option<Profile>,
    pub mode: SafetyMode,
    /// True when no profile pinned the mode and the fallback applied.
    pub fallback: bool,
}

impl ActiveSafety {
    pub fn audit_logging(&self) -> bool {
        self.profile.as_ref().is_none_or(|p| p.safety.audit_logging)
    }
}

pub fn resolve_safety_mode(paths: &Paths, settings: &Settings) -> XopsResult<ActiveSafety> {
    let profile_name = active_profile_name(paths)?;
    let profile_path = paths.profile_path(&profile_name);
    let profile = load_profile(&profile_path)?;
    let pinned = match &profile {
        Some(p) => p.mode()?,
        None => None,
    };
    let (mode, fallback) = match pinned {
        Some(mode) => (mode, false),
        None => (settings.fallback_mode, true),
    };
    debug!(profile = %profile_name, mode = %mode, fallback, "resolved safety mode");
    Ok(ActiveSafety {
        profile_name,
        profile_path,
        profile,
        mode,
        fallback,
    })
}
