//! `xopsbot generate`: write the profile, workspaces, runtime configuration
//! and exec approvals for a set of workspaces.

use super::document::{load_runtime_config, save_runtime_config};
use super::merge::{
    AgentEntry, AgentTools, GeneratedState, OWNED_AGENT_PREFIX, foreign_agents, merge,
};
use crate::catalog::Catalog;
use crate::core::document::write_atomic;
use crate::core::error::{XopsError, XopsResult};
use crate::core::fs_tree::TreeCopier;
use crate::core::paths::{Paths, validate_name};
use crate::core::settings::Settings;
use crate::plugins::PluginManager;
use crate::plugins::preset;
use crate::safety::profile::{Profile, load_profile, save_profile};
use crate::safety::{SafetyMode, exec_approvals, policy_keys, write_exec_approvals};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

pub const AGENT_TOOL_PROFILE: &str = "coding";

#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub workspaces: Vec<String>,
    pub channels: Vec<String>,
    pub mode: Option<SafetyMode>,
    pub profile: String,
    pub env: BTreeMap<String, String>,
    pub preset: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GenerateReport {
    pub profile: String,
    pub mode: SafetyMode,
    pub workspaces: Vec<String>,
    pub channels: Vec<String>,
    pub preset: Option<String>,
    pub agents: Vec<String>,
    /// True when an existing runtime config was merged into.
    pub merged: bool,
    pub preserved_agents: Vec<String>,
    pub updated: Vec<PathBuf>,
}

/// `k8s-agent` → `xops-k8s`. Only the first `-agent` is dropped.
pub fn agent_id(workspace: &str) -> String {
    format!("{}{}", OWNED_AGENT_PREFIX, workspace.replacen("-agent", "", 1))
}

/// `k8s-agent` → `K8s Agent`.
pub fn agent_name(workspace: &str) -> String {
    workspace
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn build_agents(paths: &Paths, workspaces: &[String], mode: SafetyMode) -> Vec<AgentEntry> {
    let deny = policy_keys(mode, true).deny;
    workspaces
        .iter()
        .enumerate()
        .map(|(index, ws)| AgentEntry {
            id: agent_id(ws),
            name: agent_name(ws),
            default: index == 0,
            workspace: paths.workspace_dir(ws).display().to_string(),
            tools: AgentTools {
                profile: AGENT_TOOL_PROFILE.to_string(),
                deny: deny.clone(),
            },
        })
        .collect()
}

/// Parse a `KEY=VALUE` pair.
pub fn parse_env_pair(raw: &str) -> XopsResult<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(XopsError::ValidationError(format!(
            "expected KEY=VALUE, got '{}'",
            raw
        ))),
    }
}

/// Drop repeated workspaces, keeping the first occurrence. Two different
/// workspaces that map to the same agent id are a [`XopsError::ValidationError`].
pub fn dedup_workspaces(workspaces: &[String]) -> XopsResult<Vec<String>> {
    let mut by_id: BTreeMap<String, &str> = BTreeMap::new();
    let mut unique = Vec::with_capacity(workspaces.len());
    for ws in workspaces {
        let id = agent_id(ws);
        match by_id.get(&id) {
            Some(&first) if first == ws => continue,
            Some(&first) => {
                return Err(XopsError::ValidationError(format!(
                    "workspaces '{}' and '{}' both map to agent id '{}'",
                    first, ws, id
                )));
            }
            None => {
                by_id.insert(id, ws);
                unique.push(ws.clone());
            }
        }
    }
    Ok(unique)
}

pub fn generate(
    manager: &PluginManager<'_>,
    paths: &Paths,
    catalog: &Catalog,
    settings: &Settings,
    copier: &dyn TreeCopier,
    request: &GenerateRequest,
) -> XopsResult<GenerateReport> {
    // everything below up to the preset install is read-only
    let preset_def = request
        .preset
        .as_deref()
        .map(|name| catalog.preset(name))
        .transpose()?;
    let workspaces = match (&request.workspaces, preset_def) {
        (ws, _) if !ws.is_empty() => dedup_workspaces(ws)?,
        (_, Some(p)) => dedup_workspaces(&p.workspaces)?,
        _ => Vec::new(),
    };
    if workspaces.is_empty() {
        return Err(XopsError::ValidationError(
            "at least one workspace is required (--workspace or --preset)".to_string(),
        ));
    }
    validate_name("profile", &request.profile)?;
    for ws in &workspaces {
        validate_name("workspace", ws)?;
    }
    for ch in &request.channels {
        validate_name("channel", ch)?;
    }

    let profile_path = paths.profile_path(&request.profile);
    let existing_profile = load_profile(&profile_path)?;
    let pinned = match &existing_profile {
        Some(p) => p.mode()?,
        None => None,
    };
    let mode = request
        .mode
        .or(preset_def.map(|p| p.safety_mode))
        .or(pinned)
        .unwrap_or(settings.fallback_mode);

    let config_path = paths.runtime_config_path();
    load_runtime_config(&config_path)?;

    if let Some(p) = preset_def {
        preset::apply(manager, paths, catalog, &p.name)?;
    }

    let mut profile = existing_profile.unwrap_or_else(|| Profile::new(&request.profile, mode));
    profile.set_mode(mode);
    profile
        .environment
        .extend(request.env.iter().map(|(k, v)| (k.clone(), v.clone())));
    profile
        .extra
        .insert("active_workspaces".to_string(), json!(workspaces));
    save_profile(&profile_path, &profile)?;
    let marker = paths.active_profile_marker();
    write_atomic(&marker, request.profile.as_bytes(), None)?;
    let mut updated = vec![profile_path, marker];

    std::fs::create_dir_all(paths.skills_dir())?;
    for ws in &workspaces {
        let dest = paths.workspace_dir(ws);
        match paths.workspace_template(ws).filter(|p| p.is_dir()) {
            Some(src) => copier.copy_tree(&src, &dest)?,
            None => {
                debug!(workspace = %ws, "no workspace template, creating empty workspace");
                std::fs::create_dir_all(&dest)?;
            }
        }
    }

    let agents = build_agents(paths, &workspaces, mode);
    let channels: Map<String, Value> = request
        .channels
        .iter()
        .map(|ch| (ch.clone(), json!({ "enabled": true })))
        .collect();
    let state = GeneratedState {
        agents: agents.clone(),
        policy: policy_keys(mode, profile.safety.audit_logging),
        skills_dir: paths.skills_dir().display().to_string(),
        watch_skills: settings.watch_skills,
        channels,
        env: profile.environment.clone(),
        model: settings.model.clone(),
        sandbox_mode: settings.sandbox_mode.clone(),
    };

    // reload: the preset install may have rewritten policy keys
    let existing = load_runtime_config(&config_path)?;
    let merged_doc = merge(&state, existing.as_ref().map(|c| &c.value));
    let preserved_agents = foreign_agents(&merged_doc);
    save_runtime_config(
        &config_path,
        &merged_doc,
        existing.as_ref().map(|c| c.digest.as_str()),
    )?;
    updated.push(config_path);

    let enabled = manager.registry().enabled_names()?;
    let approvals_path = paths.exec_approvals_path();
    write_exec_approvals(&approvals_path, &exec_approvals(mode, catalog, &enabled))?;
    updated.push(approvals_path);
    if preset_def.is_some() {
        updated.push(paths.active_preset_marker());
    }

    info!(profile = %request.profile, mode = %mode, workspaces = ?workspaces, "configuration generated");
    Ok(GenerateReport {
        profile: request.profile.clone(),
        mode,
        workspaces,
        channels: request.channels.clone(),
        preset: preset_def.map(|p| p.name.clone()),
        agents: agents.into_iter().map(|a| a.id).collect(),
        merged: existing.is_some(),
        preserved_agents,
        updated,
    })
}
