//! Operator settings loaded from `<xopsbot_home>/config.toml`.
//!
//! Every key is optional. A missing file yields [`Settings::default`].
//!
//! ```toml
//! [safety]
//! fallback_mode = "standard"   # used when no profile pins a mode
//!
//! [agents]
//! model = "anthropic/claude-sonnet-4-5"
//! sandbox_mode = "off"
//!
//! [skills]
//! watch = true
//! ```

use crate::core::error::{XopsError, XopsResult};
use crate::safety::SafetyMode;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4-5";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub fallback_mode: SafetyMode,
    pub model: String,
    pub sandbox_mode: String,
    pub watch_skills: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fallback_mode: SafetyMode::Standard,
            model: DEFAULT_MODEL.to_string(),
            sandbox_mode: "off".to_string(),
            watch_skills: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    safety: RawSafety,
    agents: RawAgents,
    skills: RawSkills,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSafety {
    fallback_mode: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAgents {
    model: Option<String>,
    sandbox_mode: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSkills {
    watch: Option<bool>,
}

impl Settings {
    pub fn load(path: &Path) -> XopsResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(XopsError::IoError(e)),
        };
        Self::parse(&content).map_err(|e| match e {
            XopsError::TomlError(inner) => {
                XopsError::ValidationError(format!("{}: {}", path.display(), inner))
            }
            other => other,
        })
    }

    pub fn parse(content: &str) -> XopsResult<Self> {
        let raw: RawSettings = toml::from_str(content)?;
        let defaults = Self::default();
        let fallback_mode = match raw.safety.fallback_mode {
            Some(mode) => mode.parse()?,
            None => defaults.fallback_mode,
        };
        Ok(Self {
            fallback_mode,
            model: raw.agents.model.unwrap_or(defaults.model),
            sandbox_mode: raw.agents.sandbox_mode.unwrap_or(defaults.sandbox_mode),
            watch_skills: raw.skills.watch.unwrap_or(defaults.watch_skills),
        })
    }
}
