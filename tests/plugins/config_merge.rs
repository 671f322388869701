use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use tempfile::{TempDir, tempdir};
use xopsbot::catalog::Catalog;
use xopsbot::config::merge::AgentTools;
use xopsbot::config::{
    AgentEntry, GenerateRequest, GeneratedState, OWNED_AGENT_PREFIX, generate, merge,
};
use xopsbot::core::error::XopsError;
use xopsbot::core::fs_tree::FsTreeCopier;
use xopsbot::core::paths::Paths;
use xopsbot::core::settings::Settings;
use xopsbot::plugins::PluginManager;
use xopsbot::safety::profile::load_profile;
use xopsbot::safety::{SafetyMode, policy_keys};

fn setup() -> (TempDir, Paths) {
    let tmp = tempdir().unwrap();
    let paths = Paths::new(tmp.path().join("x"), tmp.path().join("o"));
    (tmp, paths)
}

fn owned(id: &str) -> AgentEntry {
    AgentEntry {
        id: format!("{OWNED_AGENT_PREFIX}{id}"),
        name: id.to_string(),
        default: false,
        workspace: format!("/ws/{id}-agent"),
        tools: AgentTools {
            profile: "coding".to_string(),
            deny: vec![],
        },
    }
}

fn state(mode: SafetyMode, ids: &[&str]) -> GeneratedState {
    GeneratedState {
        agents: ids.iter().map(|id| owned(id)).collect(),
        policy: policy_keys(mode, true),
        skills_dir: "/srv/xopsbot/skills".to_string(),
        watch_skills: true,
        channels: Map::new(),
        env: BTreeMap::new(),
        model: "anthropic/claude-sonnet-4-5".to_string(),
        sandbox_mode: "off".to_string(),
    }
}

fn ids(doc: &Value) -> Vec<String> {
    doc["agents"]["list"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap().to_string())
        .collect()
}

fn defaults(doc: &Value) -> Vec<String> {
    doc["agents"]["list"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|a| a["default"] == json!(true))
        .map(|a| a["id"].as_str().unwrap().to_string())
        .collect()
}

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn request(workspaces: &[&str]) -> GenerateRequest {
    GenerateRequest {
        workspaces: workspaces.iter().map(|w| w.to_string()).collect(),
        profile: "dev".to_string(),
        ..GenerateRequest::default()
    }
}

#[test]
fn test_merge_is_idempotent() {
    let s = state(SafetyMode::Standard, &["k8s", "rca"]);
    let existing = json!({
        "agents": { "list": [ { "id": "manual-1", "default": false } ] },
        "skills": { "load": { "extraDirs": ["/opt/skills"] } },
        "custom": { "nested": [1, 2, 3] }
    });
    let once = merge(&s, Some(&existing));
    let twice = merge(&s, Some(&once));
    assert_eq!(once, twice);
    assert_eq!(ids(&once), ["manual-1", "xops-k8s", "xops-rca"]);
}

#[test]
fn test_foreign_default_agent_is_preserved() {
    let existing = json!({
        "agents": { "list": [
            { "id": "manual-1", "name": "Manual", "default": true, "model": "local/llama" },
            { "id": "xops-old", "name": "Old", "default": false }
        ] }
    });
    let doc = merge(&state(SafetyMode::Standard, &["k8s"]), Some(&existing));

    assert_eq!(ids(&doc), ["manual-1", "xops-k8s"]);
    assert_eq!(defaults(&doc), ["manual-1"]);
    assert_eq!(doc["agents"]["list"][0]["model"], "local/llama");
}

#[test]
fn test_first_owned_agent_is_default_without_foreign_default() {
    let existing = json!({ "agents": { "list": [ { "id": "manual-1" } ] } });
    let doc = merge(&state(SafetyMode::Standard, &["k8s", "rca"]), Some(&existing));
    assert_eq!(defaults(&doc), ["xops-k8s"]);
}

#[test]
fn test_unknown_keys_and_operator_defaults_survive() {
    let existing = json!({
        "gateway": { "port": 18789, "auth": { "token": "secret" } },
        "bindings": [ { "agentId": "manual-1", "match": { "channel": "slack" } } ],
        "agents": { "defaults": {
            "model": { "primary": "openai/gpt-5" },
            "sandbox": { "mode": "docker" },
            "workspace": "/home/op/ws"
        } }
    });
    let doc = merge(&state(SafetyMode::Safe, &["k8s"]), Some(&existing));
    assert_eq!(doc["gateway"], existing["gateway"]);
    assert_eq!(doc["bindings"], existing["bindings"]);
    let d = &doc["agents"]["defaults"];
    assert_eq!(d["model"]["primary"], "openai/gpt-5");
    assert_eq!(d["sandbox"]["mode"], "docker");
    assert_eq!(d["workspace"], "/home/op/ws");
    assert_eq!(d["tools"]["exec"]["ask"], "always");
}

#[test]
fn test_generate_fresh_writes_all_documents() {
    let (_tmp, paths) = setup();
    let catalog = Catalog::builtin().unwrap();
    let settings = Settings::default();
    let manager = PluginManager::new(&paths, &catalog, &settings, &FsTreeCopier);

    let mut req = request(&["k8s-agent", "rca-agent"]);
    req.channels = vec!["slack".to_string()];
    req.mode = Some(SafetyMode::Safe);
    req.env.insert("AWS_REGION".to_string(), "us-east-1".to_string());
    let report = generate(&manager, &paths, &catalog, &settings, &FsTreeCopier, &req).unwrap();

    assert_eq!(report.mode, SafetyMode::Safe);
    assert_eq!(report.agents, ["xops-k8s", "xops-rca"]);
    assert!(!report.merged);
    assert!(report.preserved_agents.is_empty());

    let doc = read_json(&paths.runtime_config_path());
    assert_eq!(doc["bindings"], json!([]));
    assert_eq!(defaults(&doc), ["xops-k8s"]);
    assert_eq!(doc["agents"]["list"][1]["name"], "Rca Agent");
    assert_eq!(
        doc["agents"]["list"][0]["workspace"],
        paths.workspace_dir("k8s-agent").display().to_string()
    );
    assert_eq!(doc["agents"]["list"][0]["tools"]["deny"].as_array().unwrap().len(), 4);
    assert_eq!(doc["channels"]["slack"], json!({ "enabled": true }));
    assert_eq!(doc["env"]["AWS_REGION"], "us-east-1");
    assert_eq!(
        doc["skills"]["load"]["extraDirs"],
        json!([paths.skills_dir().display().to_string()])
    );

    let profile = load_profile(&paths.profile_path("dev")).unwrap().unwrap();
    assert_eq!(profile.mode().unwrap(), Some(SafetyMode::Safe));
    assert_eq!(profile.environment["AWS_REGION"], "us-east-1");
    assert_eq!(
        std::fs::read_to_string(paths.active_profile_marker()).unwrap(),
        "dev"
    );
    assert!(paths.workspace_dir("rca-agent").is_dir());

    let approvals = read_json(&paths.exec_approvals_path());
    assert_eq!(approvals["defaults"]["ask"], "always");
    assert_eq!(approvals["agents"]["*"]["allowlist"], json!([]));
}

#[test]
fn test_generate_merges_into_existing_config() {
    let (_tmp, paths) = setup();
    std::fs::create_dir_all(&paths.openclaw_home).unwrap();
    std::fs::write(
        paths.runtime_config_path(),
        r#"{
          // hand-edited
          gateway: { port: 18789 },
          agents: { list: [
            { id: "manual-1", name: "Manual", default: true },
            { id: "xops-old", name: "Old" },
          ] },
        }"#,
    )
    .unwrap();
    let catalog = Catalog::builtin().unwrap();
    let settings = Settings::default();
    let manager = PluginManager::new(&paths, &catalog, &settings, &FsTreeCopier);

    let report = generate(
        &manager,
        &paths,
        &catalog,
        &settings,
        &FsTreeCopier,
        &request(&["k8s-agent"]),
    )
    .unwrap();
    assert!(report.merged);
    assert_eq!(report.preserved_agents, ["Manual"]);
    assert_eq!(report.mode, SafetyMode::Standard);

    let doc = read_json(&paths.runtime_config_path());
    assert_eq!(doc["gateway"]["port"], 18789);
    assert_eq!(ids(&doc), ["manual-1", "xops-k8s"]);
    assert_eq!(defaults(&doc), ["manual-1"]);

    // same inputs again: identical document
    let before = std::fs::read_to_string(paths.runtime_config_path()).unwrap();
    generate(
        &manager,
        &paths,
        &catalog,
        &settings,
        &FsTreeCopier,
        &request(&["k8s-agent"]),
    )
    .unwrap();
    assert_eq!(
        std::fs::read_to_string(paths.runtime_config_path()).unwrap(),
        before
    );
}

#[test]
fn test_generate_refuses_corrupt_config() {
    let (_tmp, paths) = setup();
    std::fs::create_dir_all(&paths.openclaw_home).unwrap();
    std::fs::write(paths.runtime_config_path(), "{ agents: [").unwrap();
    let catalog = Catalog::builtin().unwrap();
    let settings = Settings::default();
    let manager = PluginManager::new(&paths, &catalog, &settings, &FsTreeCopier);

    let err = generate(
        &manager,
        &paths,
        &catalog,
        &settings,
        &FsTreeCopier,
        &request(&["k8s-agent"]),
    )
    .unwrap_err();
    assert!(matches!(err, XopsError::CorruptConfig { .. }));
    assert_eq!(
        std::fs::read_to_string(paths.runtime_config_path()).unwrap(),
        "{ agents: ["
    );
    assert!(!paths.profile_path("dev").exists());
}

#[test]
fn test_generate_refuses_mistyped_shared_sections() {
    let (_tmp, paths) = setup();
    std::fs::create_dir_all(&paths.openclaw_home).unwrap();
    let raw = r#"{"agents":{"list":{"manual-1":{"id":"manual-1","default":true}}},"channels":["slack"],"env":"prod"}"#;
    std::fs::write(paths.runtime_config_path(), raw).unwrap();
    let catalog = Catalog::builtin().unwrap();
    let settings = Settings::default();
    let manager = PluginManager::new(&paths, &catalog, &settings, &FsTreeCopier);

    let err = generate(
        &manager,
        &paths,
        &catalog,
        &settings,
        &FsTreeCopier,
        &request(&["k8s-agent"]),
    )
    .unwrap_err();
    assert!(
        matches!(err, XopsError::CorruptConfig { ref reason, .. } if reason == "agents.list is not an array"),
        "{err:?}"
    );
    assert_eq!(std::fs::read_to_string(paths.runtime_config_path()).unwrap(), raw);
    assert!(!paths.profile_path("dev").exists());
    assert!(!paths.exec_approvals_path().exists());
}

#[test]
fn test_generate_collapses_repeated_workspaces() {
    let (_tmp, paths) = setup();
    let catalog = Catalog::builtin().unwrap();
    let settings = Settings::default();
    let manager = PluginManager::new(&paths, &catalog, &settings, &FsTreeCopier);

    let report = generate(
        &manager,
        &paths,
        &catalog,
        &settings,
        &FsTreeCopier,
        &request(&["k8s-agent", "rca-agent", "k8s-agent"]),
    )
    .unwrap();
    assert_eq!(report.workspaces, ["k8s-agent", "rca-agent"]);
    let doc: Value =
        serde_json::from_str(&std::fs::read_to_string(paths.runtime_config_path()).unwrap())
            .unwrap();
    assert_eq!(ids(&doc), ["xops-k8s", "xops-rca"]);
}

#[test]
fn test_generate_rejects_workspaces_sharing_an_agent_id() {
    let (_tmp, paths) = setup();
    let catalog = Catalog::builtin().unwrap();
    let settings = Settings::default();
    let manager = PluginManager::new(&paths, &catalog, &settings, &FsTreeCopier);

    let err = generate(
        &manager,
        &paths,
        &catalog,
        &settings,
        &FsTreeCopier,
        &request(&["k8s", "k8s-agent", "k8s"]),
    )
    .unwrap_err();
    assert!(matches!(err, XopsError::ValidationError(ref m) if m.contains("xops-k8s")), "{err:?}");
    assert!(!paths.runtime_config_path().exists());
    assert!(!paths.profile_path("dev").exists());
}

#[test]
fn test_generate_from_preset() {
    let (_tmp, paths) = setup();
    let catalog = Catalog::builtin().unwrap();
    let settings = Settings {
        fallback_mode: SafetyMode::Safe,
        ..Settings::default()
    };
    let manager = PluginManager::new(&paths, &catalog, &settings, &FsTreeCopier);

    let mut req = request(&[]);
    req.preset = Some("sre".to_string());
    let report = generate(&manager, &paths, &catalog, &settings, &FsTreeCopier, &req).unwrap();

    assert_eq!(report.preset.as_deref(), Some("sre"));
    assert_eq!(report.mode, SafetyMode::Standard);
    assert_eq!(report.workspaces, ["k8s-agent", "rca-agent", "incident-agent"]);
    assert_eq!(report.agents, ["xops-k8s", "xops-rca", "xops-incident"]);
    assert!(manager.registry().is_enabled("observability").unwrap());

    let approvals = read_json(&paths.exec_approvals_path());
    assert_eq!(
        approvals["agents"]["*"]["allowlist"],
        json!([
            { "pattern": "*/kubectl" },
            { "pattern": "*/promtool" },
            { "pattern": "*/logcli" },
            { "pattern": "*/curl" }
        ])
    );
}

#[test]
fn test_generate_mode_precedence() {
    let (_tmp, paths) = setup();
    let catalog = Catalog::builtin().unwrap();
    let settings = Settings::default();
    let manager = PluginManager::new(&paths, &catalog, &settings, &FsTreeCopier);

    let mut req = request(&["k8s-agent"]);
    req.mode = Some(SafetyMode::Full);
    generate(&manager, &paths, &catalog, &settings, &FsTreeCopier, &req).unwrap();

    // no --mode: the profile's pinned mode wins over the fallback
    let report = generate(
        &manager,
        &paths,
        &catalog,
        &settings,
        &FsTreeCopier,
        &request(&["k8s-agent"]),
    )
    .unwrap();
    assert_eq!(report.mode, SafetyMode::Full);

    // a preset beats the pinned mode
    let mut req = request(&["k8s-agent"]);
    req.preset = Some("devops".to_string());
    let report = generate(&manager, &paths, &catalog, &settings, &FsTreeCopier, &req).unwrap();
    assert_eq!(report.mode, SafetyMode::Standard);
    assert_eq!(report.workspaces, ["k8s-agent"]);
}

#[test]
fn test_generate_requires_a_workspace() {
    let (_tmp, paths) = setup();
    let catalog = Catalog::builtin().unwrap();
    let settings = Settings::default();
    let manager = PluginManager::new(&paths, &catalog, &settings, &FsTreeCopier);

    let err = generate(&manager, &paths, &catalog, &settings, &FsTreeCopier, &request(&[]))
        .unwrap_err();
    assert!(matches!(err, XopsError::ValidationError(_)));

    let err = generate(
        &manager,
        &paths,
        &catalog,
        &settings,
        &FsTreeCopier,
        &request(&["../escape"]),
    )
    .unwrap_err();
    assert!(matches!(err, XopsError::ValidationError(_)));
    assert!(!paths.xopsbot_home.exists());
}
