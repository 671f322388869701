//! CLI struct definitions for the xopsbot command-line interface.
//!
//! All clap-derived types live here. Dispatch lives in `lib.rs`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "xopsbot",
    version = env!("CARGO_PKG_VERSION"),
    about = "Provision an openclaw agent runtime for DevOps work: plugins, safety policy and configuration.",
    disable_version_flag = true
)]
pub(crate) struct Cli {
    /// xopsbot state directory (registry, skills, workspaces, profiles).
    #[clap(long, global = true, env = "XOPSBOT_HOME", value_name = "DIR")]
    pub home: Option<PathBuf>,
    /// Runtime configuration directory (openclaw.json, exec-approvals.json).
    #[clap(long, global = true, env = "OPENCLAW_HOME", value_name = "DIR")]
    pub openclaw_home: Option<PathBuf>,
    /// Directory holding `skills/` and `workspaces/` templates.
    #[clap(long, global = true, env = "XOPSBOT_TEMPLATES", value_name = "DIR")]
    pub templates: Option<PathBuf>,
    /// Debug logging on stderr (overridden by XOPSBOT_LOG).
    #[clap(long, short = 'v', global = true)]
    pub verbose: bool,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Install, remove, enable, disable and list plugins.
    Plugin(PluginCli),
    /// Role presets: bundles of plugins, workspaces and a safety mode.
    Preset(PresetCli),
    /// Inspect or switch the active safety mode.
    Safety(SafetyCli),
    /// Write profile, workspaces, openclaw.json and exec approvals.
    Generate(GenerateCli),
    /// Tool risk tables and TOOLS.md generation.
    Tools(ToolsCli),
    /// Print the version.
    Version,
}

#[derive(clap::Args, Debug)]
pub(crate) struct PluginCli {
    #[clap(subcommand)]
    pub command: PluginCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum PluginCommand {
    /// Install a plugin and its missing dependencies.
    Install { name: String },
    /// Remove an installed plugin.
    Remove { name: String },
    /// Re-enable an installed plugin.
    Enable { name: String },
    /// Disable a plugin without removing it.
    Disable { name: String },
    /// List catalog plugins with their status.
    List {
        /// Output format: 'text' or 'json'.
        #[clap(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct PresetCli {
    #[clap(subcommand)]
    pub command: PresetCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum PresetCommand {
    /// List presets.
    List,
    /// Show a preset's contents.
    Show { name: String },
    /// Install a preset's plugins and mark it active.
    Apply { name: String },
}

#[derive(clap::Args, Debug)]
pub(crate) struct SafetyCli {
    #[clap(subcommand)]
    pub command: SafetyCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum SafetyCommand {
    /// Switch the active profile to a new mode (safe, standard, full).
    Switch { mode: String },
    /// Show the active profile, mode and compiled policy.
    Show {
        /// Output format: 'text' or 'json'.
        #[clap(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct GenerateCli {
    /// Workspace to create an agent for (repeatable).
    #[clap(long = "workspace", value_name = "WS")]
    pub workspaces: Vec<String>,
    /// Chat channel to enable (repeatable).
    #[clap(long = "channel", value_name = "CH")]
    pub channels: Vec<String>,
    /// Safety mode: safe, standard or full.
    #[clap(long)]
    pub mode: Option<String>,
    /// Profile to write.
    #[clap(long, default_value = "dev")]
    pub profile: String,
    /// Environment variable for the runtime, KEY=VALUE (repeatable).
    #[clap(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,
    /// Apply a preset first; supplies workspaces and mode when not given.
    #[clap(long)]
    pub preset: Option<String>,
}

#[derive(clap::Args, Debug)]
pub(crate) struct ToolsCli {
    #[clap(subcommand)]
    pub command: ToolsCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum ToolsCommand {
    /// List tool definitions.
    List,
    /// Show a tool's commands grouped by risk.
    Show { tool: String },
    /// Classify a command line against a tool's risk table.
    Classify {
        tool: String,
        #[clap(required = true, num_args = 1.., allow_hyphen_values = true, trailing_var_arg = true)]
        command: Vec<String>,
    },
    /// Render TOOLS.md for a workspace.
    Md {
        workspace: String,
        /// Write into the workspace directory instead of printing.
        #[clap(long)]
        write: bool,
    },
}
