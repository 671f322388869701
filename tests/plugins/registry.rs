use std::path::Path;
use tempfile::tempdir;
use xopsbot::catalog::{Catalog, PluginManifest};
use xopsbot::core::error::XopsError;
use xopsbot::core::paths::Paths;
use xopsbot::plugins::{InstallOutcome, PluginRegistry, Registry, RemoveOutcome};

fn registry_in(root: &Path) -> PluginRegistry {
    PluginRegistry::for_paths(&Paths::new(root.join("x"), root.join("o")))
}

fn builtin(name: &str) -> PluginManifest {
    Catalog::builtin().unwrap().plugin(name).unwrap().clone()
}

#[test]
fn test_absent_registry_is_empty() {
    let tmp = tempdir().unwrap();
    let registry = registry_in(tmp.path());
    let loaded = registry.load().unwrap();
    assert_eq!(loaded, Registry::default());
    assert_eq!(loaded.version, 1);
    assert!(!registry.path().exists(), "load must not create the file");
}

#[test]
fn test_save_creates_parent_directories() {
    let tmp = tempdir().unwrap();
    let registry = registry_in(tmp.path());
    registry.save(&Registry::default()).unwrap();
    assert!(registry.path().ends_with("plugins/registry.json"));
    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(registry.path()).unwrap()).unwrap();
    assert_eq!(raw, serde_json::json!({"version": 1, "plugins": {}}));
}

#[test]
fn test_install_records_entry_and_is_idempotent() {
    let tmp = tempdir().unwrap();
    let registry = registry_in(tmp.path());
    let docker = builtin("docker");

    assert_eq!(registry.install(&docker).unwrap(), InstallOutcome::Installed);
    let first = registry.load().unwrap().plugins["docker"].clone();
    assert!(first.enabled);
    assert_eq!(first.version, docker.version);

    assert_eq!(
        registry.install(&docker).unwrap(),
        InstallOutcome::AlreadyInstalled
    );
    let loaded = registry.load().unwrap();
    assert_eq!(loaded.plugins.len(), 1);
    assert_eq!(loaded.plugins["docker"], first);
}

#[test]
fn test_on_disk_shape() {
    let tmp = tempdir().unwrap();
    let registry = registry_in(tmp.path());
    registry.install(&builtin("aws")).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(registry.path()).unwrap()).unwrap();
    let entry = &raw["plugins"]["aws"];
    assert_eq!(raw["version"], 1);
    assert_eq!(entry["enabled"], true);
    assert_eq!(entry["source"], "builtin");
    let installed = entry["installed"].as_str().unwrap();
    assert!(installed.ends_with('Z'));
    assert!(chrono::DateTime::parse_from_rfc3339(installed).is_ok());
}

#[test]
fn test_remove_is_a_noop_when_absent() {
    let tmp = tempdir().unwrap();
    let registry = registry_in(tmp.path());
    assert_eq!(registry.remove("docker").unwrap(), RemoveOutcome::NotInstalled);
    assert!(!registry.path().exists());

    registry.install(&builtin("docker")).unwrap();
    assert_eq!(registry.remove("docker").unwrap(), RemoveOutcome::Removed);
    assert!(!registry.is_installed("docker").unwrap());
    assert_eq!(registry.remove("docker").unwrap(), RemoveOutcome::NotInstalled);
}

#[test]
fn test_toggle_requires_installation() {
    let tmp = tempdir().unwrap();
    let registry = registry_in(tmp.path());

    let err = registry.disable("docker").unwrap_err();
    assert!(matches!(err, XopsError::NotInstalled(ref n) if n == "docker"));
    let err = registry.enable("docker").unwrap_err();
    assert!(matches!(err, XopsError::NotInstalled(_)));

    // failed toggles leave no phantom entry behind
    assert!(registry.load().unwrap().plugins.is_empty());
}

#[test]
fn test_disable_keeps_install_timestamp() {
    let tmp = tempdir().unwrap();
    let registry = registry_in(tmp.path());
    registry.install(&builtin("terraform")).unwrap();
    let installed_at = registry.load().unwrap().plugins["terraform"].installed;

    registry.disable("terraform").unwrap();
    assert!(registry.is_installed("terraform").unwrap());
    assert!(!registry.is_enabled("terraform").unwrap());
    assert_eq!(
        registry.load().unwrap().plugins["terraform"].installed,
        installed_at
    );

    registry.enable("terraform").unwrap();
    assert!(registry.is_enabled("terraform").unwrap());
    assert_eq!(
        registry.load().unwrap().plugins["terraform"].installed,
        installed_at
    );
}

#[test]
fn test_is_enabled_false_when_absent() {
    let tmp = tempdir().unwrap();
    let registry = registry_in(tmp.path());
    assert!(!registry.is_enabled("kubernetes").unwrap());
    assert!(!registry.is_installed("kubernetes").unwrap());
}

#[test]
fn test_name_sets_track_enabled_flag() {
    let tmp = tempdir().unwrap();
    let registry = registry_in(tmp.path());
    registry.install(&builtin("docker")).unwrap();
    registry.install(&builtin("aws")).unwrap();
    registry.disable("aws").unwrap();

    let installed: Vec<String> = registry.installed_names().unwrap().into_iter().collect();
    let enabled: Vec<String> = registry.enabled_names().unwrap().into_iter().collect();
    assert_eq!(installed, ["aws", "docker"]);
    assert_eq!(enabled, ["docker"]);
    assert_eq!(registry.list().unwrap().len(), 2);
}

#[test]
fn test_corrupt_registry_is_an_error_not_empty() {
    let tmp = tempdir().unwrap();
    let registry = registry_in(tmp.path());
    std::fs::create_dir_all(registry.path().parent().unwrap()).unwrap();

    for bad in [
        "{ not json",
        r#"{"version": 2, "plugins": {}}"#,
        r#"{"version": 1, "plugins": []}"#,
    ] {
        std::fs::write(registry.path(), bad).unwrap();
        let err = registry.load().unwrap_err();
        assert!(
            matches!(err, XopsError::CorruptRegistry { .. }),
            "{bad}: {err:?}"
        );
        // mutating operations refuse too, and leave the file alone
        assert!(registry.install(&builtin("docker")).is_err());
        assert_eq!(std::fs::read_to_string(registry.path()).unwrap(), bad);
    }
}

#[test]
fn test_invalid_utf8_registry_is_corrupt() {
    let tmp = tempdir().unwrap();
    let registry = registry_in(tmp.path());
    std::fs::create_dir_all(registry.path().parent().unwrap()).unwrap();
    std::fs::write(registry.path(), [0xff, 0xfe, b'{']).unwrap();

    let err = registry.load().unwrap_err();
    assert!(
        matches!(err, XopsError::CorruptRegistry { ref reason, .. } if reason.starts_with("not UTF-8")),
        "{err:?}"
    );
    assert!(registry.install(&builtin("docker")).is_err());
    assert_eq!(std::fs::read(registry.path()).unwrap(), [0xff, 0xfe, b'{']);
}

#[test]
fn test_install_batch_writes_once_and_skips_known() {
    let tmp = tempdir().unwrap();
    let registry = registry_in(tmp.path());
    let docker = builtin("docker");
    let aws = builtin("aws");
    registry.install(&docker).unwrap();

    let added = registry.install_batch(&[&docker, &aws]).unwrap();
    assert_eq!(added, ["aws"]);
    let loaded = registry.load().unwrap();
    assert_eq!(loaded.plugins.len(), 2);

    let before = std::fs::read_to_string(registry.path()).unwrap();
    assert!(registry.install_batch(&[&docker, &aws]).unwrap().is_empty());
    assert_eq!(std::fs::read_to_string(registry.path()).unwrap(), before);
}

#[test]
fn test_handles_share_the_same_file() {
    let tmp = tempdir().unwrap();
    let registry = registry_in(tmp.path());
    registry.install(&builtin("docker")).unwrap();

    // a second handle on the same file sees the first handle's write
    let other = registry_in(tmp.path());
    other.install(&builtin("aws")).unwrap();
    assert_eq!(registry.installed_names().unwrap().len(), 2);
}
