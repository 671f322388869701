use crate::core::error::XopsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operator-selected safety mode.
///
/// Variants are declared from most to least restrictive, so the derived
/// ordering reads `Safe < Standard < Full` in permissiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyMode {
    /// Read-only. Mutations blocked, every exec prompts.
    Safe,
    /// Allowlisted binaries run; anything else prompts.
    Standard,
    /// No allowlist, never prompts. Development only.
    Full,
}

impl SafetyMode {
    pub const ALL: [SafetyMode; 3] = [SafetyMode::Safe, SafetyMode::Standard, SafetyMode::Full];

    pub fn as_str(self) -> &'static str {
        match self {
            SafetyMode::Safe => "safe",
            SafetyMode::Standard => "standard",
            SafetyMode::Full => "full",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SafetyMode::Safe => "Read-only mode. All mutations are blocked.",
            SafetyMode::Standard => "Approval mode. Mutations require explicit approval.",
            SafetyMode::Full => "Full access mode. No approval required. Development only.",
        }
    }
}

impl fmt::Display for SafetyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SafetyMode {
    type Err = XopsError;

    /// Exact, case-sensitive match on the closed set. No fallback.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "safe" => Ok(SafetyMode::Safe),
            "standard" => Ok(SafetyMode::Standard),
            "full" => Ok(SafetyMode::Full),
            other => Err(XopsError::InvalidSafetyMode(other.to_string())),
        }
    }
}
