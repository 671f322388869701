//! TOOLS.md generation for agent workspaces.
//!
//! The generated block sits between marker comments so it can be replaced on
//! every run while hand-written notes below it survive.

use super::{Catalog, CommandDefinition, RiskLevel, ToolDefinition};
use regex::Regex;
use std::sync::LazyLock;

pub const GENERATED_START: &str = "<!-- GENERATED: Safety annotations from tool definitions -->";
pub const GENERATED_END: &str = "<!-- END GENERATED -->";

static LEADING_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^# Tools\s*\n").unwrap());

static GENERATED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!-- GENERATED:.*?-->\s*.*?<!-- END GENERATED -->\s*").unwrap()
});

/// Remove the leading `# Tools` heading and every generated block.
pub fn strip_generated_sections(content: &str) -> String {
    let without_heading = LEADING_HEADING.replace(content, "");
    GENERATED_BLOCK.replace_all(&without_heading, "").into_owned()
}

/// Risk-grouped command tables for one tool. Empty groups are omitted.
pub fn tool_section(tool: &ToolDefinition) -> String {
    let mut lines = vec![format!("## {}\n", tool.name), format!("{}\n", tool.description)];

    for level in RiskLevel::ALL {
        let commands: Vec<&CommandDefinition> =
            tool.commands.iter().filter(|c| c.risk == level).collect();
        if commands.is_empty() {
            continue;
        }
        lines.push(format!("### {} ({} risk)\n", level.header(), level.as_str()));
        lines.push("| Command | Risk | Description |".to_string());
        lines.push("|---------|------|-------------|".to_string());
        for cmd in commands {
            lines.push(format!(
                "| `{} {}` | {} | {} |",
                tool.name,
                cmd.command,
                cmd.risk.as_str(),
                cmd.description
            ));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Full TOOLS.md for `workspace`, keeping hand-written parts of `existing`.
pub fn workspace_tools_md(workspace: &str, catalog: &Catalog, existing: Option<&str>) -> String {
    let mut parts = vec!["# Tools\n".to_string(), format!("{GENERATED_START}\n")];

    parts.push("## Risk Classification Summary\n".to_string());
    parts.push("| Risk Level | Behavior |".to_string());
    parts.push("|------------|----------|".to_string());
    for level in RiskLevel::ALL {
        parts.push(format!("| {} | {} |", level.as_str(), level.behavior()));
    }
    parts.push(String::new());

    for tool in catalog.workspace_tools(workspace) {
        parts.push(tool_section(tool));
    }
    parts.push(GENERATED_END.to_string());

    if let Some(existing) = existing {
        let hand_written = strip_generated_sections(existing);
        let hand_written = hand_written.trim();
        if !hand_written.is_empty() {
            parts.push(String::new());
            parts.push(hand_written.to_string());
        }
    }
    parts.push(String::new());

    parts.join("\n")
}
