//! Safety mode → runtime exec settings (`agents.defaults.tools.exec`).

use super::SafetyMode;
use serde::{Deserialize, Serialize};

/// Read-only utilities that run without an allowlist match.
pub const SAFE_BINS: [&str; 14] = [
    "jq", "yq", "grep", "awk", "sed", "curl", "cat", "head", "tail", "wc", "sort", "uniq", "cut",
    "tr",
];

/// Agent tools denied outright in safe mode.
pub const SAFE_MODE_TOOL_DENY: [&str; 4] = ["exec", "write", "edit", "apply_patch"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecSecurity {
    Allowlist,
    Full,
}

impl ExecSecurity {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecSecurity::Allowlist => "allowlist",
            ExecSecurity::Full => "full",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AskPolicy {
    #[serde(rename = "off")]
    Off,
    #[serde(rename = "on-miss")]
    OnMiss,
    #[serde(rename = "always")]
    Always,
}

impl AskPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            AskPolicy::Off => "off",
            AskPolicy::OnMiss => "on-miss",
            AskPolicy::Always => "always",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecConfig {
    pub security: ExecSecurity,
    pub ask: AskPolicy,
    /// Absent in full mode; the runtime treats absence as "no allowlist".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_bins: Option<Vec<String>>,
}

pub fn ask_policy(mode: SafetyMode) -> AskPolicy {
    match mode {
        SafetyMode::Safe => AskPolicy::Always,
        SafetyMode::Standard => AskPolicy::OnMiss,
        SafetyMode::Full => AskPolicy::Off,
    }
}

pub fn security(mode: SafetyMode) -> ExecSecurity {
    match mode {
        SafetyMode::Safe | SafetyMode::Standard => ExecSecurity::Allowlist,
        SafetyMode::Full => ExecSecurity::Full,
    }
}

pub fn exec_config(mode: SafetyMode) -> ExecConfig {
    let safe_bins = match mode {
        SafetyMode::Full => None,
        SafetyMode::Safe | SafetyMode::Standard => {
            Some(SAFE_BINS.iter().map(|b| b.to_string()).collect())
        }
    };
    ExecConfig {
        security: security(mode),
        ask: ask_policy(mode),
        safe_bins,
    }
}

/// `tools.deny` for owned agents.
pub fn tool_deny_list(mode: SafetyMode) -> Vec<String> {
    match mode {
        SafetyMode::Safe => SAFE_MODE_TOOL_DENY.iter().map(|t| t.to_string()).collect(),
        SafetyMode::Standard | SafetyMode::Full => Vec::new(),
    }
}
