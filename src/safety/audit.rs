use super::SafetyMode;
use serde::{Deserialize, Serialize};

/// Runtime `logging` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    pub level: String,
    pub redact_sensitive: String,
}

pub fn audit_config(enabled: bool) -> LoggingConfig {
    LoggingConfig {
        level: if enabled { "info" } else { "warn" }.to_string(),
        redact_sensitive: "tools".to_string(),
    }
}

/// Full mode never audits; otherwise the profile decides.
pub fn audit_enabled(mode: SafetyMode, profile_audit_logging: bool) -> bool {
    mode != SafetyMode::Full && profile_audit_logging
}
