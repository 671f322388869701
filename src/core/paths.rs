//! Filesystem layout for xopsbot state and the runtime it provisions.
//!
//! A [`Paths`] value is built once at startup and passed down explicitly.
//! Nothing below `run()` reads the process environment for locations.

use crate::core::error::{XopsError, XopsResult};
use std::path::{Path, PathBuf};

pub const REGISTRY_FILENAME: &str = "registry.json";
pub const RUNTIME_CONFIG_FILENAME: &str = "openclaw.json";
pub const EXEC_APPROVALS_FILENAME: &str = "exec-approvals.json";
pub const SETTINGS_FILENAME: &str = "config.toml";
pub const DEFAULT_PROFILE: &str = "dev";

/// Resolved directory layout.
///
/// - `xopsbot_home`: registry, skills, workspaces, profiles, markers
/// - `openclaw_home`: the runtime's configuration and exec approvals
/// - `template_dir`: bundled skill/workspace templates (optional; copies are
///   skipped when absent)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub xopsbot_home: PathBuf,
    pub openclaw_home: PathBuf,
    pub template_dir: Option<PathBuf>,
}

impl Paths {
    /// Explicit layout, used by tests and by `discover` once overrides are known.
    pub fn new(xopsbot_home: impl Into<PathBuf>, openclaw_home: impl Into<PathBuf>) -> Self {
        Self {
            xopsbot_home: xopsbot_home.into(),
            openclaw_home: openclaw_home.into(),
            template_dir: None,
        }
    }

    pub fn with_templates(mut self, template_dir: impl Into<PathBuf>) -> Self {
        self.template_dir = Some(template_dir.into());
        self
    }

    /// Fill unset locations from the user's home directory
    /// (`~/.xopsbot`, `~/.openclaw`).
    pub fn discover(
        xopsbot_home: Option<PathBuf>,
        openclaw_home: Option<PathBuf>,
        template_dir: Option<PathBuf>,
    ) -> XopsResult<Self> {
        let home = match (&xopsbot_home, &openclaw_home) {
            (Some(_), Some(_)) => None,
            _ => Some(user_home()?),
        };
        let xopsbot_home = match xopsbot_home {
            Some(p) => p,
            None => home.as_deref().map(|h| h.join(".xopsbot")).unwrap_or_default(),
        };
        let openclaw_home = match openclaw_home {
            Some(p) => p,
            None => home.as_deref().map(|h| h.join(".openclaw")).unwrap_or_default(),
        };
        Ok(Self {
            xopsbot_home,
            openclaw_home,
            template_dir,
        })
    }

    pub fn plugins_dir(&self) -> PathBuf {
        self.xopsbot_home.join("plugins")
    }

    pub fn registry_path(&self) -> PathBuf {
        self.plugins_dir().join(REGISTRY_FILENAME)
    }

    pub fn skills_dir(&self) -> PathBuf {
        self.xopsbot_home.join("skills")
    }

    pub fn skill_dir(&self, skill: &str) -> PathBuf {
        self.skills_dir().join(skill)
    }

    pub fn workspaces_dir(&self) -> PathBuf {
        self.xopsbot_home.join("workspaces")
    }

    pub fn workspace_dir(&self, workspace: &str) -> PathBuf {
        self.workspaces_dir().join(workspace)
    }

    pub fn workspace_skill_dir(&self, workspace: &str, skill: &str) -> PathBuf {
        self.workspace_dir(workspace).join("skills").join(skill)
    }

    pub fn profile_path(&self, profile: &str) -> PathBuf {
        self.xopsbot_home
            .join("profiles")
            .join(profile)
            .join("profile.json")
    }

    pub fn active_profile_marker(&self) -> PathBuf {
        self.xopsbot_home.join("active-profile")
    }

    pub fn active_preset_marker(&self) -> PathBuf {
        self.xopsbot_home.join("active-preset")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.xopsbot_home.join(SETTINGS_FILENAME)
    }

    pub fn runtime_config_path(&self) -> PathBuf {
        self.openclaw_home.join(RUNTIME_CONFIG_FILENAME)
    }

    pub fn exec_approvals_path(&self) -> PathBuf {
        self.openclaw_home.join(EXEC_APPROVALS_FILENAME)
    }

    /// Source directory of a bundled skill template, if templates are configured.
    pub fn skill_template(&self, skill: &str) -> Option<PathBuf> {
        self.template_dir
            .as_deref()
            .map(|t| t.join("skills").join(skill))
    }

    pub fn workspace_template(&self, workspace: &str) -> Option<PathBuf> {
        self.template_dir
            .as_deref()
            .map(|t| t.join("workspaces").join(workspace))
    }
}

fn user_home() -> XopsResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or_else(|| {
            XopsError::NotFound(
                "home directory could not be determined; pass --home and --openclaw-home"
                    .to_string(),
            )
        })
}

/// Check that a profile, workspace or channel name is a single path
/// component, so joining it cannot leave the directory it is joined to.
pub fn validate_name(kind: &str, name: &str) -> XopsResult<()> {
    let bad = name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name == "."
        || name == "..";
    if bad {
        return Err(XopsError::ValidationError(format!("invalid {} name '{}'", kind, name)));
    }
    Ok(())
}

/// Read a single-line marker file, trimmed. Absent or empty markers are `None`.
pub fn read_marker(path: &Path) -> XopsResult<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(raw) => {
            let trimmed = raw.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(XopsError::IoError(e)),
    }
}
