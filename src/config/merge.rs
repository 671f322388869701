//! Non-destructive merge of generated state into the runtime configuration.
//!
//! Owned keys:
//! - `agents.list[]` entries whose `id` starts with [`OWNED_AGENT_PREFIX`]
//! - `agents.defaults.tools.exec` and `logging`
//! - our entry in `skills.load.extraDirs`
//! - the channel and env keys we generate
//!
//! Everything else is copied through untouched. `agents.defaults.model`,
//! `agents.defaults.sandbox` and `skills.load.watch` are only filled in when
//! missing.

use crate::safety::{ExecConfig, LoggingConfig};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

pub const OWNED_AGENT_PREFIX: &str = "xops-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTools {
    pub profile: String,
    pub deny: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentEntry {
    pub id: String,
    pub name: String,
    pub default: bool,
    pub workspace: String,
    pub tools: AgentTools,
}

/// Policy keys written on every generate, safety switch and plugin change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyKeys {
    pub exec: ExecConfig,
    pub logging: LoggingConfig,
    /// `tools.deny` for owned agents.
    pub deny: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedState {
    pub agents: Vec<AgentEntry>,
    pub policy: PolicyKeys,
    pub skills_dir: String,
    pub watch_skills: bool,
    pub channels: Map<String, Value>,
    pub env: BTreeMap<String, String>,
    pub model: String,
    pub sandbox_mode: String,
}

pub fn is_owned_id(id: &str) -> bool {
    id.starts_with(OWNED_AGENT_PREFIX)
}

fn is_owned(agent: &Value) -> bool {
    agent.get("id").and_then(Value::as_str).is_some_and(is_owned_id)
}

fn is_default(agent: &Value) -> bool {
    agent.get("default").and_then(Value::as_bool).unwrap_or(false)
}

/// Get `map[key]` as an object, inserting an empty one when absent.
/// Loaded configs have their shared sections type-checked already.
fn object_entry<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let slot = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(obj) => obj,
        _ => unreachable!("slot was just made an object"),
    }
}

/// Merge `state` into `existing`, or build a fresh document when there is
/// none. `existing` must be a JSON object; anything else is ignored.
pub fn merge(state: &GeneratedState, existing: Option<&Value>) -> Value {
    let mut root = match existing {
        Some(Value::Object(map)) => map.clone(),
        _ => {
            let mut fresh = Map::new();
            fresh.insert("bindings".to_string(), Value::Array(Vec::new()));
            fresh
        }
    };

    let agents = object_entry(&mut root, "agents");
    let defaults = object_entry(agents, "defaults");
    defaults
        .entry("model")
        .or_insert_with(|| json!({ "primary": state.model }));
    defaults
        .entry("sandbox")
        .or_insert_with(|| json!({ "mode": state.sandbox_mode }));

    let previous = match agents.remove("list") {
        Some(Value::Array(list)) => list,
        _ => Vec::new(),
    };
    let mut list: Vec<Value> = previous.into_iter().filter(|a| !is_owned(a)).collect();
    let foreign_default = list.iter().any(is_default);
    for (index, agent) in state.agents.iter().enumerate() {
        let mut agent = agent.clone();
        agent.default = !foreign_default && index == 0;
        list.push(json!(agent));
    }
    agents.insert("list".to_string(), Value::Array(list));

    let load = object_entry(object_entry(&mut root, "skills"), "load");
    if !matches!(load.get("extraDirs"), Some(Value::Array(_))) {
        load.insert("extraDirs".to_string(), Value::Array(Vec::new()));
    }
    if let Some(Value::Array(dirs)) = load.get_mut("extraDirs") {
        let ours = Value::String(state.skills_dir.clone());
        if !dirs.contains(&ours) {
            dirs.push(ours);
        }
    }
    load.entry("watch").or_insert(Value::Bool(state.watch_skills));

    let channels = object_entry(&mut root, "channels");
    for (name, value) in &state.channels {
        channels.insert(name.clone(), value.clone());
    }
    let env = object_entry(&mut root, "env");
    for (key, value) in &state.env {
        env.insert(key.clone(), Value::String(value.clone()));
    }

    let mut doc = Value::Object(root);
    apply_policy(&mut doc, &state.policy);
    doc
}

/// Overwrite the policy keys in place: exec config, logging, and
/// `tools.deny` on owned agents. Foreign agents are not touched.
pub fn apply_policy(doc: &mut Value, policy: &PolicyKeys) {
    let Value::Object(root) = doc else {
        return;
    };
    root.insert("logging".to_string(), json!(policy.logging));

    let agents = object_entry(root, "agents");
    let tools = object_entry(object_entry(agents, "defaults"), "tools");
    tools.insert("exec".to_string(), json!(policy.exec));

    if let Some(Value::Array(list)) = agents.get_mut("list") {
        for agent in list.iter_mut().filter(|a| is_owned(a)) {
            if let Value::Object(agent) = agent {
                object_entry(agent, "tools").insert("deny".to_string(), json!(policy.deny));
            }
        }
    }
}

/// Display names (falling back to ids) of agents we do not own.
pub fn foreign_agents(doc: &Value) -> Vec<String> {
    doc.pointer("/agents/list")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter(|a| !is_owned(a))
                .map(|a| {
                    a.get("name")
                        .or_else(|| a.get("id"))
                        .and_then(Value::as_str)
                        .unwrap_or("(unnamed)")
                        .to_string()
                })
                .collect()
        })
        .unwrap_or_default()
}
