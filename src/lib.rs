//! xopsbot: provisioning for a chat-driven DevOps agent runtime.
//!
//! **xopsbot installs capability plugins, compiles a safety mode into exec
//! policy, and merges the result into the runtime's `openclaw.json` without
//! clobbering anything it does not own.**
//!
//! # Core Principles
//!
//! - **Local-first**: All state is plain JSON/TOML under two home directories
//! - **Resolve before write**: Dependency and validation errors abort before any file changes
//! - **Non-destructive**: Foreign agents, channels and unknown keys survive every merge
//! - **Glob allowlists**: Binary patterns are `*/tool` globs, never regexes
//!
//! # Architecture
//!
//! ## Two Homes
//!
//! - **xopsbot home** (`~/.xopsbot/`): plugin registry, skills, workspaces, profiles, markers
//! - **runtime home** (`~/.openclaw/`): `openclaw.json` and `exec-approvals.json`
//!
//! ## Control Flow
//!
//! `plugin install` → [`plugins::resolve`] computes the order → the registry
//! records the batch in one write → [`safety`] recompiles the allowlist from
//! enabled plugins → [`config::merge`] writes policy keys into the runtime
//! configuration.
//!
//! # Examples
//!
//! ```bash
//! # Set up two agents in standard mode
//! xopsbot generate --workspace k8s-agent --workspace rca-agent --mode standard
//!
//! # Add a capability bundle
//! xopsbot plugin install kubernetes
//!
//! # Tighten policy
//! xopsbot safety switch safe
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: Shared primitives (errors, paths, settings, atomic documents, logging)
//! - [`catalog`]: Embedded plugin, tool and preset definitions; risk docs
//! - [`plugins`]: Resolver, registry, lifecycle manager, presets
//! - [`safety`]: Safety modes and policy compilers
//! - [`config`]: Runtime configuration merge and generation

pub mod catalog;
mod cli;
pub mod config;
pub mod core;
pub mod plugins;
pub mod safety;

use catalog::Catalog;
use catalog::risk::classify;
use catalog::tools_md::workspace_tools_md;
use clap::Parser;
use cli::{
    Cli, Command, GenerateCli, PluginCli, PluginCommand, PresetCli, PresetCommand, SafetyCli,
    SafetyCommand, ToolsCli, ToolsCommand,
};
use colored::Colorize;
use config::generate::{GenerateRequest, parse_env_pair};
use crate::core::error::{XopsError, XopsResult};
use crate::core::fs_tree::FsTreeCopier;
use crate::core::output::{compact_line, preview_list, print_restart_note, print_updated_files};
use crate::core::paths::{Paths, validate_name};
use crate::core::settings::Settings;
use crate::core::{document, logging, time};
use plugins::{PluginManager, PluginStatus, RemoveOutcome, preset};
use safety::SafetyMode;
use std::collections::BTreeMap;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything a command needs, built once per invocation.
struct Context {
    paths: Paths,
    settings: Settings,
    catalog: Catalog,
    copier: FsTreeCopier,
}

impl Context {
    fn manager(&self) -> PluginManager<'_> {
        PluginManager::new(&self.paths, &self.catalog, &self.settings, &self.copier)
    }
}

pub fn run() -> XopsResult<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Command::Version = cli.command {
        println!("v{}", VERSION);
        return Ok(());
    }

    let paths = Paths::discover(cli.home, cli.openclaw_home, cli.templates)?;
    let settings = Settings::load(&paths.settings_path())?;
    let ctx = Context {
        catalog: Catalog::builtin()?,
        paths,
        settings,
        copier: FsTreeCopier,
    };

    match cli.command {
        Command::Plugin(plugin_cli) => run_plugin(&ctx, plugin_cli),
        Command::Preset(preset_cli) => run_preset(&ctx, preset_cli),
        Command::Safety(safety_cli) => run_safety(&ctx, safety_cli),
        Command::Generate(generate_cli) => run_generate(&ctx, generate_cli),
        Command::Tools(tools_cli) => run_tools(&ctx, tools_cli),
        Command::Version => Ok(()),
    }
}

fn run_plugin(ctx: &Context, cli: PluginCli) -> XopsResult<()> {
    let manager = ctx.manager();
    match cli.command {
        PluginCommand::Install { name } => {
            let report = manager.install(&name)?;
            if report.already_installed() {
                println!("{} {} is already installed", "▸".bright_yellow(), name.bold());
                return Ok(());
            }
            let deps: Vec<String> = report
                .installed
                .iter()
                .filter(|n| **n != name)
                .cloned()
                .collect();
            println!("{} Installed {}", "✓".bright_green(), name.bright_green().bold());
            if !deps.is_empty() {
                println!("  Dependencies: {}", preview_list(&deps, 8).bright_cyan());
            }
            println!("  Skills: {}", preview_list(&report.skills, 8).bright_cyan());
            println!("  Tools:  {}", preview_list(&report.tools, 8).bright_cyan());
            if !report.updated.is_empty() {
                print_updated_files(&report.updated);
                print_restart_note();
            }
        }
        PluginCommand::Remove { name } => {
            let report = manager.remove(&name)?;
            match report.outcome {
                RemoveOutcome::NotInstalled => {
                    println!("{} {} is not installed", "▸".bright_yellow(), name.bold());
                }
                RemoveOutcome::Removed => {
                    println!("{} Removed {}", "✓".bright_green(), name.bright_green().bold());
                    if !report.updated.is_empty() {
                        print_updated_files(&report.updated);
                        print_restart_note();
                    }
                }
            }
        }
        PluginCommand::Enable { name } => {
            let updated = manager.enable(&name)?;
            println!("{} Enabled {}", "✓".bright_green(), name.bright_green().bold());
            if !updated.is_empty() {
                print_updated_files(&updated);
                print_restart_note();
            }
        }
        PluginCommand::Disable { name } => {
            let updated = manager.disable(&name)?;
            println!("{} Disabled {}", "✓".bright_green(), name.bright_yellow().bold());
            if !updated.is_empty() {
                print_updated_files(&updated);
                print_restart_note();
            }
        }
        PluginCommand::List { format } => {
            let listings = manager.list()?;
            if format == "json" {
                let envelope =
                    time::command_envelope("plugin.list", "ok", serde_json::json!({ "plugins": listings }));
                println!("{}", document::to_pretty_json(&envelope)?.trim_end());
                return Ok(());
            }
            for listing in &listings {
                let status = match listing.status {
                    PluginStatus::Enabled => listing.status.as_str().bright_green(),
                    PluginStatus::Disabled => listing.status.as_str().bright_yellow(),
                    PluginStatus::Orphaned => listing.status.as_str().bright_red(),
                    PluginStatus::NotInstalled => listing.status.as_str().bright_black(),
                };
                println!(
                    "  {:<14} {:<8} {:<14} {}",
                    listing.name.bold(),
                    listing.version,
                    status,
                    compact_line(&listing.description, 60).bright_black()
                );
            }
        }
    }
    Ok(())
}

fn run_preset(ctx: &Context, cli: PresetCli) -> XopsResult<()> {
    match cli.command {
        PresetCommand::List => {
            let active = preset::active_preset(&ctx.paths)?;
            for p in ctx.catalog.presets() {
                let marker = if active.as_deref() == Some(p.name.as_str()) {
                    "*".bright_green().to_string()
                } else {
                    " ".to_string()
                };
                println!(
                    "{} {:<18} {:<9} {}",
                    marker,
                    p.name.bold(),
                    p.safety_mode.to_string(),
                    compact_line(&p.description, 60).bright_black()
                );
            }
        }
        PresetCommand::Show { name } => {
            let p = ctx.catalog.preset(&name)?;
            println!("{} ({})", p.label.bold(), p.name);
            println!("  {}", p.description);
            println!("  Plugins:    {}", preview_list(&p.plugins, 10).bright_cyan());
            println!("  Workspaces: {}", preview_list(&p.workspaces, 10).bright_cyan());
            println!("  Tools:      {}", preview_list(&p.tools, 10).bright_cyan());
            println!("  Channels:   {}", preview_list(&p.channels, 10).bright_cyan());
            println!("  Safety:     {} - {}", p.safety_mode.to_string().bright_cyan(), p.safety_mode.description());
        }
        PresetCommand::Apply { name } => {
            let manager = ctx.manager();
            let report = preset::apply(&manager, &ctx.paths, &ctx.catalog, &name)?;
            let installed: Vec<String> =
                report.newly_installed().into_iter().map(str::to_string).collect();
            println!(
                "{} Applied preset {}",
                "✓".bright_green(),
                report.preset.name.bright_green().bold()
            );
            println!("  Installed: {}", preview_list(&installed, 10).bright_cyan());
            println!(
                "  Run {} to write the runtime configuration.",
                format!("xopsbot generate --preset {}", report.preset.name).bright_cyan()
            );
        }
    }
    Ok(())
}

fn run_safety(ctx: &Context, cli: SafetyCli) -> XopsResult<()> {
    match cli.command {
        SafetyCommand::Switch { mode } => {
            let report = safety::switch::switch_mode(&ctx.paths, &ctx.catalog, &ctx.settings, &mode)?;
            println!(
                "{} Safety mode switched: {} -> {}",
                "✓".bright_green(),
                report
                    .previous
                    .map_or_else(|| "unknown".to_string(), |m| m.to_string())
                    .bold(),
                report.current.to_string().bright_green().bold()
            );
            println!("  {}", report.current.description().bright_black());
            print_updated_files(&report.updated);
            print_restart_note();
        }
        SafetyCommand::Show { format } => {
            let status = safety::switch::status(&ctx.paths, &ctx.catalog, &ctx.settings)?;
            let patterns: Vec<String> =
                status.approvals.patterns().into_iter().map(str::to_string).collect();
            if format == "json" {
                let envelope = time::command_envelope(
                    "safety.show",
                    "ok",
                    serde_json::json!({
                        "profile": status.active.profile_name,
                        "mode": status.active.mode,
                        "fallback": status.active.fallback,
                        "exec": status.exec,
                        "approvals": status.approvals,
                    }),
                );
                println!("{}", document::to_pretty_json(&envelope)?.trim_end());
                return Ok(());
            }
            let source = if status.active.fallback { " (fallback)" } else { "" };
            println!("Profile:   {}", status.active.profile_name.bold());
            println!("Mode:      {}{}", status.active.mode.to_string().bright_cyan().bold(), source);
            println!("           {}", status.active.mode.description().bright_black());
            println!(
                "Exec:      security={} ask={}",
                status.exec.security.as_str(),
                status.exec.ask.as_str()
            );
            match &status.approvals.agents {
                None => println!("Allowlist: {}", "none (unrestricted)".bright_yellow()),
                Some(_) => println!(
                    "Allowlist: {} pattern(s): {}",
                    patterns.len(),
                    preview_list(&patterns, 6).bright_cyan()
                ),
            }
        }
    }
    Ok(())
}

fn run_generate(ctx: &Context, cli: GenerateCli) -> XopsResult<()> {
    let mode = cli.mode.as_deref().map(str::parse::<SafetyMode>).transpose()?;
    let env = cli
        .env
        .iter()
        .map(|raw| parse_env_pair(raw))
        .collect::<XopsResult<BTreeMap<_, _>>>()?;
    let request = GenerateRequest {
        workspaces: cli.workspaces,
        channels: cli.channels,
        mode,
        profile: cli.profile,
        env,
        preset: cli.preset,
    };

    let manager = ctx.manager();
    let report = config::generate(
        &manager,
        &ctx.paths,
        &ctx.catalog,
        &ctx.settings,
        &ctx.copier,
        &request,
    )?;

    let headline = if report.merged {
        "Configuration merged with existing openclaw.json"
    } else {
        "Configuration generated"
    };
    println!("{} {}", "✓".bright_green(), headline.bright_green());
    if let Some(p) = &report.preset {
        println!("  Preset:     {}", p.bright_cyan());
    }
    println!("  Profile:    {}", report.profile.bright_cyan());
    println!("  Workspaces: {}", preview_list(&report.workspaces, 10).bright_cyan());
    println!("  Agents:     {}", preview_list(&report.agents, 10).bright_cyan());
    let channels = if report.channels.is_empty() {
        "none (TUI only)".to_string()
    } else {
        report.channels.join(", ")
    };
    println!("  Channels:   {}", channels.bright_cyan());
    println!(
        "  Safety:     {} - {}",
        report.mode.to_string().bright_cyan(),
        report.mode.description()
    );
    if !report.preserved_agents.is_empty() {
        println!(
            "  {} {}",
            format!("Preserved {} existing agent(s):", report.preserved_agents.len()).bright_green(),
            preview_list(&report.preserved_agents, 10).bright_cyan()
        );
    }
    print_updated_files(&report.updated);
    if !report.channels.is_empty() {
        println!("{}", "Next steps for channel setup:".yellow());
        for ch in &report.channels {
            println!("  export {}_BOT_TOKEN=\"your-{}-token\"", ch.to_uppercase(), ch);
        }
    }
    print_restart_note();
    Ok(())
}

fn run_tools(ctx: &Context, cli: ToolsCli) -> XopsResult<()> {
    match cli.command {
        ToolsCommand::List => {
            for tool in ctx.catalog.tools() {
                println!(
                    "  {:<10} {:<9} {:>3} commands  {}",
                    tool.name.bold(),
                    tool.default_risk.as_str(),
                    tool.commands.len(),
                    compact_line(&tool.description, 50).bright_black()
                );
            }
        }
        ToolsCommand::Show { tool } => {
            let tool = ctx.catalog.require_tool(&tool)?;
            println!("{}", catalog::tools_md::tool_section(tool));
            println!(
                "Default risk: {}  Binaries: {}",
                tool.default_risk.as_str(),
                tool.binary_patterns.join(", ")
            );
        }
        ToolsCommand::Classify { tool, command } => {
            let tool = ctx.catalog.require_tool(&tool)?;
            let c = classify(tool, &command.join(" "));
            let risk = match c.risk {
                catalog::RiskLevel::Low => c.risk.as_str().bright_green(),
                catalog::RiskLevel::Medium => c.risk.as_str().bright_cyan(),
                catalog::RiskLevel::High => c.risk.as_str().bright_yellow(),
                catalog::RiskLevel::Critical => c.risk.as_str().bright_red(),
            };
            println!("{} ({})", risk.bold(), c.risk.header());
            match &c.matched {
                Some(m) => println!("  Matched:   {} {}", c.tool, m),
                None => println!("  Matched:   {} (tool default)", "nothing".bright_black()),
            }
            if !c.modifiers.is_empty() {
                println!(
                    "  Modifiers: {} (base {})",
                    c.modifiers.join(", "),
                    c.base_risk.as_str()
                );
            }
            println!("  Behavior:  {}", c.risk.behavior().bright_black());
        }
        ToolsCommand::Md { workspace, write } => {
            validate_name("workspace", &workspace)?;
            let target = ctx.paths.workspace_dir(&workspace).join("TOOLS.md");
            let existing = document::read_snapshot(&target)?;
            let current = existing
                .as_ref()
                .map(|s| s.text())
                .transpose()
                .map_err(|e| {
                    XopsError::ValidationError(format!("{} is not UTF-8: {e}", target.display()))
                })?;
            let rendered = workspace_tools_md(&workspace, &ctx.catalog, current);
            if !write {
                print!("{}", rendered);
                return Ok(());
            }
            if !ctx.paths.workspace_dir(&workspace).is_dir() {
                return Err(XopsError::NotFound(format!(
                    "workspace '{}' has not been generated",
                    workspace
                )));
            }
            let expected = existing.as_ref().map(|s| s.digest.as_str());
            if document::replace_if_unchanged(&target, rendered.as_bytes(), expected, None)? {
                println!("{} Wrote {}", "✓".bright_green(), target.display());
            } else {
                println!("{} {} is up to date", "▸".bright_yellow(), target.display());
            }
        }
    }
    Ok(())
}
