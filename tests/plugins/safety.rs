use std::collections::BTreeSet;
use tempfile::{TempDir, tempdir};
use xopsbot::catalog::Catalog;
use xopsbot::core::error::XopsError;
use xopsbot::core::fs_tree::FsTreeCopier;
use xopsbot::core::paths::Paths;
use xopsbot::core::settings::Settings;
use xopsbot::plugins::PluginManager;
use xopsbot::safety::profile::{Profile, load_profile, save_profile};
use xopsbot::safety::switch::{status, switch_mode};
use xopsbot::safety::{
    AskPolicy, ExecSecurity, SAFE_BINS, SafetyMode, allowlist_patterns, exec_approvals,
    exec_config, policy_keys, resolve_safety_mode,
};

fn setup() -> (TempDir, Paths) {
    let tmp = tempdir().unwrap();
    let paths = Paths::new(tmp.path().join("x"), tmp.path().join("o"));
    (tmp, paths)
}

fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|n| n.to_string()).collect()
}

fn read_json(path: &std::path::Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

/// Profile `dev` pinned to `mode`, plus a minimal runtime config.
fn seed_generated_state(paths: &Paths, mode: SafetyMode) {
    save_profile(&paths.profile_path("dev"), &Profile::new("dev", mode)).unwrap();
    std::fs::create_dir_all(&paths.openclaw_home).unwrap();
    std::fs::write(
        paths.runtime_config_path(),
        r#"{
          "agents": { "list": [
            { "id": "manual-1", "name": "Manual", "default": true, "tools": { "deny": ["browser"] } },
            { "id": "xops-k8s", "name": "K8s Agent", "default": false, "tools": { "profile": "coding", "deny": [] } }
          ] },
          "gateway": { "mode": "local" }
        }"#,
    )
    .unwrap();
}

#[test]
fn test_exec_config_per_mode() {
    for mode in SafetyMode::ALL {
        let cfg = exec_config(mode);
        match mode {
            SafetyMode::Full => {
                assert_eq!(cfg.security, ExecSecurity::Full);
                assert_eq!(cfg.ask, AskPolicy::Off);
                assert!(cfg.safe_bins.is_none());
            }
            SafetyMode::Safe | SafetyMode::Standard => {
                assert_eq!(cfg.security, ExecSecurity::Allowlist);
                assert_eq!(cfg.safe_bins.unwrap(), SAFE_BINS.map(String::from));
            }
        }
    }
    assert_eq!(exec_config(SafetyMode::Safe).ask, AskPolicy::Always);
    assert_eq!(exec_config(SafetyMode::Standard).ask, AskPolicy::OnMiss);
}

#[test]
fn test_policy_keys_compose_mode_and_audit_flag() {
    let safe = policy_keys(SafetyMode::Safe, true);
    assert_eq!(safe.deny, ["exec", "write", "edit", "apply_patch"]);
    assert_eq!(safe.logging.level, "info");

    let quiet = policy_keys(SafetyMode::Standard, false);
    assert!(quiet.deny.is_empty());
    assert_eq!(quiet.logging.level, "warn");

    // full mode never audits, whatever the profile says
    assert_eq!(policy_keys(SafetyMode::Full, true).logging.level, "warn");
}

#[test]
fn test_allowlist_is_union_in_catalog_order() {
    let catalog = Catalog::builtin().unwrap();
    let patterns = allowlist_patterns(&catalog, &names(&["docker", "kubernetes"]));
    assert_eq!(patterns, ["*/kubectl", "*/docker"]);

    let with_obs = allowlist_patterns(&catalog, &names(&["observability"]));
    assert_eq!(with_obs, ["*/promtool", "*/logcli", "*/curl"]);

    let terraform = allowlist_patterns(&catalog, &names(&["terraform"]));
    assert_eq!(terraform[0], "*/terraform");
    assert!(terraform.contains(&"*/ansible-playbook".to_string()));
}

#[test]
fn test_allowlist_grows_monotonically_with_enabled_set() {
    let catalog = Catalog::builtin().unwrap();
    let all: Vec<String> = catalog.plugins().map(|m| m.name.clone()).collect();
    let mut enabled = BTreeSet::new();
    let mut previous: Vec<String> = Vec::new();
    for name in all {
        enabled.insert(name);
        let current = allowlist_patterns(&catalog, &enabled);
        assert!(previous.iter().all(|p| current.contains(p)));
        let unique: BTreeSet<&String> = current.iter().collect();
        assert_eq!(unique.len(), current.len());
        previous = current;
    }
}

#[test]
fn test_standard_mode_approvals_for_kubernetes_and_docker() {
    let catalog = Catalog::builtin().unwrap();
    let doc = exec_approvals(
        SafetyMode::Standard,
        &catalog,
        &names(&["kubernetes", "docker"]),
    );
    let value = serde_json::to_value(&doc).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "version": 1,
            "defaults": { "security": "allowlist", "ask": "on-miss" },
            "agents": { "*": { "allowlist": [
                { "pattern": "*/kubectl" },
                { "pattern": "*/docker" }
            ] } }
        })
    );
}

#[test]
fn test_full_mode_approvals_have_no_agents() {
    let catalog = Catalog::builtin().unwrap();
    let doc = exec_approvals(SafetyMode::Full, &catalog, &names(&["kubernetes"]));
    assert!(doc.agents.is_none());
    let value = serde_json::to_value(&doc).unwrap();
    assert!(value.get("agents").is_none());
    assert_eq!(value["defaults"]["security"], "full");
}

#[test]
fn test_resolve_mode_falls_back_without_profile() {
    let (_tmp, paths) = setup();
    let active = resolve_safety_mode(&paths, &Settings::default()).unwrap();
    assert_eq!(active.mode, SafetyMode::Standard);
    assert!(active.fallback);
    assert!(active.profile.is_none());
}

#[test]
fn test_resolve_mode_follows_active_profile_marker() {
    let (_tmp, paths) = setup();
    save_profile(&paths.profile_path("prod"), &Profile::new("prod", SafetyMode::Safe)).unwrap();
    save_profile(&paths.profile_path("dev"), &Profile::new("dev", SafetyMode::Full)).unwrap();

    let active = resolve_safety_mode(&paths, &Settings::default()).unwrap();
    assert_eq!(active.mode, SafetyMode::Full);

    std::fs::write(paths.active_profile_marker(), "prod\n").unwrap();
    let active = resolve_safety_mode(&paths, &Settings::default()).unwrap();
    assert_eq!(active.profile_name, "prod");
    assert_eq!(active.mode, SafetyMode::Safe);
    assert!(!active.fallback);
}

#[test]
fn test_resolve_mode_rejects_invalid_pinned_mode() {
    let (_tmp, paths) = setup();
    let path = paths.profile_path("dev");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, r#"{ name: "dev", safety: { mode: "yolo" } }"#).unwrap();

    let err = resolve_safety_mode(&paths, &Settings::default()).unwrap_err();
    assert!(matches!(err, XopsError::InvalidSafetyMode(ref m) if m == "yolo"));
}

#[test]
fn test_switch_requires_generated_state() {
    let (_tmp, paths) = setup();
    let catalog = Catalog::builtin().unwrap();
    let settings = Settings::default();

    let err = switch_mode(&paths, &catalog, &settings, "safe").unwrap_err();
    assert!(matches!(err, XopsError::NotFound(_)));

    // profile alone is not enough
    save_profile(&paths.profile_path("dev"), &Profile::new("dev", SafetyMode::Standard)).unwrap();
    let err = switch_mode(&paths, &catalog, &settings, "safe").unwrap_err();
    assert!(matches!(err, XopsError::NotFound(_)));
    assert!(!paths.exec_approvals_path().exists());
}

#[test]
fn test_switch_with_invalid_mode_writes_nothing() {
    let (_tmp, paths) = setup();
    seed_generated_state(&paths, SafetyMode::Standard);
    let catalog = Catalog::builtin().unwrap();
    let config_before = std::fs::read_to_string(paths.runtime_config_path()).unwrap();
    let profile_before = std::fs::read_to_string(paths.profile_path("dev")).unwrap();

    let err = switch_mode(&paths, &catalog, &Settings::default(), "paranoid").unwrap_err();
    assert!(matches!(err, XopsError::InvalidSafetyMode(ref m) if m == "paranoid"));
    assert_eq!(
        err.to_string(),
        "Invalid safety mode: paranoid (valid options: safe, standard, full)"
    );

    assert_eq!(
        std::fs::read_to_string(paths.runtime_config_path()).unwrap(),
        config_before
    );
    assert_eq!(
        std::fs::read_to_string(paths.profile_path("dev")).unwrap(),
        profile_before
    );
    assert!(!paths.exec_approvals_path().exists());
}

#[test]
fn test_switch_to_safe_rewrites_policy_only() {
    let (_tmp, paths) = setup();
    seed_generated_state(&paths, SafetyMode::Standard);
    let catalog = Catalog::builtin().unwrap();
    let settings = Settings::default();
    PluginManager::new(&paths, &catalog, &settings, &FsTreeCopier)
        .install("kubernetes")
        .unwrap();

    let report = switch_mode(&paths, &catalog, &settings, "safe").unwrap();
    assert_eq!(report.previous, Some(SafetyMode::Standard));
    assert_eq!(report.current, SafetyMode::Safe);

    let profile = load_profile(&paths.profile_path("dev")).unwrap().unwrap();
    assert_eq!(profile.mode().unwrap(), Some(SafetyMode::Safe));

    let doc = read_json(&paths.runtime_config_path());
    assert_eq!(doc["agents"]["defaults"]["tools"]["exec"]["ask"], "always");
    assert_eq!(doc["gateway"]["mode"], "local");
    let list = doc["agents"]["list"].as_array().unwrap();
    // foreign agent untouched, owned agent gets the safe deny list
    assert_eq!(list[0]["tools"]["deny"], serde_json::json!(["browser"]));
    assert_eq!(
        list[1]["tools"]["deny"],
        serde_json::json!(["exec", "write", "edit", "apply_patch"])
    );

    let approvals = read_json(&paths.exec_approvals_path());
    assert_eq!(approvals["defaults"]["ask"], "always");
    assert_eq!(approvals["agents"]["*"]["allowlist"][0]["pattern"], "*/kubectl");
}

#[test]
fn test_switch_to_full_drops_allowlist_and_audit() {
    let (_tmp, paths) = setup();
    seed_generated_state(&paths, SafetyMode::Safe);
    let catalog = Catalog::builtin().unwrap();
    let settings = Settings::default();

    switch_mode(&paths, &catalog, &settings, "full").unwrap();
    let doc = read_json(&paths.runtime_config_path());
    let exec = &doc["agents"]["defaults"]["tools"]["exec"];
    assert_eq!(exec["security"], "full");
    assert!(exec.get("safeBins").is_none());
    assert_eq!(doc["logging"]["level"], "warn");
    assert_eq!(doc["agents"]["list"][1]["tools"]["deny"], serde_json::json!([]));

    let approvals = read_json(&paths.exec_approvals_path());
    assert!(approvals.get("agents").is_none());

    let current = status(&paths, &catalog, &settings).unwrap();
    assert_eq!(current.active.mode, SafetyMode::Full);
    assert!(current.exec.safe_bins.is_none());
}

#[test]
fn test_switch_reports_fallback_as_previous_when_unpinned() {
    let (_tmp, paths) = setup();
    seed_generated_state(&paths, SafetyMode::Standard);
    let path = paths.profile_path("dev");
    std::fs::write(&path, r#"{ "name": "dev", "safety": { "audit_logging": true } }"#).unwrap();
    let settings = Settings {
        fallback_mode: SafetyMode::Safe,
        ..Settings::default()
    };

    let report = switch_mode(&paths, &Catalog::builtin().unwrap(), &settings, "standard").unwrap();
    assert_eq!(report.previous, Some(SafetyMode::Safe));
    assert_eq!(report.current, SafetyMode::Standard);
}

#[test]
fn test_switch_repairs_invalid_pinned_mode() {
    let (_tmp, paths) = setup();
    seed_generated_state(&paths, SafetyMode::Standard);
    let path = paths.profile_path("dev");
    std::fs::write(&path, r#"{ "name": "dev", "safety": { "mode": "yolo" } }"#).unwrap();
    let catalog = Catalog::builtin().unwrap();
    let settings = Settings::default();

    let report = switch_mode(&paths, &catalog, &settings, "safe").unwrap();
    assert_eq!(report.previous, None);
    assert_eq!(report.current, SafetyMode::Safe);
    let profile = load_profile(&path).unwrap().unwrap();
    assert_eq!(profile.mode().unwrap(), Some(SafetyMode::Safe));
    assert_eq!(
        resolve_safety_mode(&paths, &settings).unwrap().mode,
        SafetyMode::Safe
    );
}

#[test]
fn test_marker_naming_a_path_outside_profiles_is_rejected() {
    let (_tmp, paths) = setup();
    std::fs::create_dir_all(&paths.xopsbot_home).unwrap();
    std::fs::write(paths.active_profile_marker(), "../../etc\n").unwrap();

    let err = resolve_safety_mode(&paths, &Settings::default()).unwrap_err();
    assert!(matches!(err, XopsError::ValidationError(_)), "{err:?}");
    let err = switch_mode(&paths, &Catalog::builtin().unwrap(), &Settings::default(), "safe")
        .unwrap_err();
    assert!(matches!(err, XopsError::ValidationError(_)), "{err:?}");
}
