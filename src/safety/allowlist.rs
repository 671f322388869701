//! Exec approvals document (`exec-approvals.json`).
//!
//! Patterns are path globs (`*/kubectl`) because the runtime matches with
//! globs. They are copied from the catalog verbatim, never rewritten.

use super::SafetyMode;
use super::exec_config::{AskPolicy, ExecSecurity, ask_policy, security};
use crate::catalog::Catalog;
use crate::core::document;
use crate::core::error::XopsResult;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use tracing::warn;

pub const APPROVALS_VERSION: u32 = 1;
/// Agent scope every allowlist is attached to.
pub const WILDCARD_AGENT: &str = "*";
/// The approvals file gates command execution; keep it owner-only.
pub const APPROVALS_FILE_MODE: u32 = 0o600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowlistEntry {
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAllowlist {
    pub allowlist: Vec<AllowlistEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalDefaults {
    pub security: ExecSecurity,
    pub ask: AskPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecApprovals {
    pub version: u32,
    pub defaults: ApprovalDefaults,
    /// Present iff security is not `full`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agents: Option<BTreeMap<String, AgentAllowlist>>,
}

impl ExecApprovals {
    pub fn patterns(&self) -> Vec<&str> {
        self.agents
            .iter()
            .flat_map(|agents| agents.values())
            .flat_map(|a| a.allowlist.iter())
            .map(|e| e.pattern.as_str())
            .collect()
    }
}

/// Deduplicated binary patterns of every tool bundled by an enabled plugin,
/// in catalog order. Enabled names missing from the catalog are skipped.
pub fn allowlist_patterns(catalog: &Catalog, enabled: &BTreeSet<String>) -> Vec<String> {
    for orphan in enabled.iter().filter(|n| catalog.plugin(n).is_none()) {
        warn!(plugin = %orphan, "enabled plugin is not in the catalog; contributes no patterns");
    }

    let mut seen = HashSet::new();
    let mut patterns = Vec::new();
    for manifest in catalog.plugins().filter(|m| enabled.contains(&m.name)) {
        for tool_name in &manifest.tools {
            let Some(tool) = catalog.tool(tool_name) else {
                continue;
            };
            for pattern in &tool.binary_patterns {
                if seen.insert(pattern.as_str()) {
                    patterns.push(pattern.clone());
                }
            }
        }
    }
    patterns
}

pub fn exec_approvals(mode: SafetyMode, catalog: &Catalog, enabled: &BTreeSet<String>) -> ExecApprovals {
    let defaults = ApprovalDefaults {
        security: security(mode),
        ask: ask_policy(mode),
    };
    let agents = match mode {
        SafetyMode::Full => None,
        SafetyMode::Safe | SafetyMode::Standard => {
            let allowlist = allowlist_patterns(catalog, enabled)
                .into_iter()
                .map(|pattern| AllowlistEntry { pattern })
                .collect();
            Some(BTreeMap::from([(
                WILDCARD_AGENT.to_string(),
                AgentAllowlist { allowlist },
            )]))
        }
    };
    ExecApprovals {
        version: APPROVALS_VERSION,
        defaults,
        agents,
    }
}

/// Write the approvals document (mode 0600). Returns false when the file
/// already had exactly this content.
pub fn write_exec_approvals(path: &Path, approvals: &ExecApprovals) -> XopsResult<bool> {
    let current = document::read_snapshot(path)?;
    let json = document::to_pretty_json(approvals)?;
    document::replace_if_unchanged(
        path,
        json.as_bytes(),
        current.as_ref().map(|s| s.digest.as_str()),
        Some(APPROVALS_FILE_MODE),
    )
}
