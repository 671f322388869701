//! Command-level risk lookup.
//!
//! Informational only: the exec allowlist works at whole-binary granularity
//! and never consults these levels.

use super::{CommandDefinition, ModifierEffect, RiskLevel, ToolDefinition};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub tool: String,
    /// Declared command that matched, if any.
    pub matched: Option<String>,
    /// Level before modifiers (the tool default when unmatched).
    pub base_risk: RiskLevel,
    pub risk: RiskLevel,
    /// Modifier flags that were present on the command line.
    pub modifiers: Vec<String>,
}

/// Classify a command line against a tool's risk table.
///
/// The longest declared command whose words prefix the command line wins.
/// Matching is attempted both with and without a leading binary name, since
/// some tables spell commands as `get` and others as `ansible --version`.
pub fn classify(tool: &ToolDefinition, command_line: &str) -> Classification {
    let words: Vec<&str> = command_line.split_whitespace().collect();
    let stripped: &[&str] = match words.first() {
        Some(first) if *first == tool.name || first.ends_with(&format!("/{}", tool.name)) => {
            &words[1..]
        }
        _ => &words,
    };

    let best = tool
        .commands
        .iter()
        .filter_map(|cmd| {
            let declared: Vec<&str> = cmd.command.split_whitespace().collect();
            let hits = is_word_prefix(&declared, &words) || is_word_prefix(&declared, stripped);
            hits.then_some((declared.len(), cmd))
        })
        // max_by_key keeps the last maximum; reverse so declaration order breaks ties
        .rev()
        .max_by_key(|(len, _)| *len)
        .map(|(_, cmd)| cmd);

    let Some(cmd) = best else {
        return Classification {
            tool: tool.name.clone(),
            matched: None,
            base_risk: tool.default_risk,
            risk: tool.default_risk,
            modifiers: Vec::new(),
        };
    };

    let (risk, modifiers) = apply_modifiers(cmd, &words);
    Classification {
        tool: tool.name.clone(),
        matched: Some(cmd.command.clone()),
        base_risk: cmd.risk,
        risk,
        modifiers,
    }
}

fn is_word_prefix(declared: &[&str], words: &[&str]) -> bool {
    !declared.is_empty() && words.len() >= declared.len() && declared == &words[..declared.len()]
}

fn apply_modifiers(cmd: &CommandDefinition, words: &[&str]) -> (RiskLevel, Vec<String>) {
    let mut risk = cmd.risk;
    let mut applied = Vec::new();
    for modifier in &cmd.risk_modifiers {
        let present = words.iter().any(|w| {
            *w == modifier.flag
                || w.strip_prefix(modifier.flag.as_str())
                    .is_some_and(|rest| rest.starts_with('='))
        });
        if !present {
            continue;
        }
        risk = match modifier.effect {
            ModifierEffect::Lower => risk.lowered(),
            ModifierEffect::Raise => risk.raised(),
        };
        applied.push(modifier.flag.clone());
    }
    (risk, applied)
}
