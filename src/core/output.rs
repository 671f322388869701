//! Compact output rendering helpers for CLI surfaces.
//!
//! Keeps listings (plugin descriptions, preserved agents, allowlists) bounded
//! and readable in a terminal.

use colored::Colorize;

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

/// Render up to `max_items` names joined by `, ` with a `(+N more)` tail.
pub fn preview_list(items: &[String], max_items: usize) -> String {
    if items.is_empty() {
        return "none".to_string();
    }
    let shown = items
        .iter()
        .take(max_items)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if items.len() > max_items {
        format!("{} (+{} more)", shown, items.len() - max_items)
    } else {
        shown
    }
}

/// One `  - path` line per written file, dimmed.
pub fn print_updated_files(paths: &[std::path::PathBuf]) {
    println!("{}", "Updated files:".bright_black());
    for p in paths {
        println!("  {}", format!("- {}", p.display()).bright_black());
    }
}

pub fn print_restart_note() {
    println!(
        "{}",
        "Note: Restart OpenClaw gateway for changes to take effect.".yellow()
    );
}
