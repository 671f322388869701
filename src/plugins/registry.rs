//! Installation registry: `<xopsbot_home>/plugins/registry.json`.
//!
//! The registry is the single source of truth for which plugins are
//! installed and enabled. Only this module writes it. Every mutation is a
//! read-modify-write of the whole document guarded by the digest check in
//! [`crate::core::document::replace_if_unchanged`].

use crate::catalog::PluginManifest;
use crate::core::document::{self, Snapshot};
use crate::core::error::{XopsError, XopsResult};
use crate::core::paths::Paths;
use crate::core::time::iso_millis;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const REGISTRY_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginSource {
    Builtin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Set once on install. Survives disable/enable.
    #[serde(with = "iso_millis")]
    pub installed: DateTime<Utc>,
    pub enabled: bool,
    pub version: String,
    pub source: PluginSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    pub version: u32,
    pub plugins: BTreeMap<String, RegistryEntry>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            version: REGISTRY_VERSION,
            plugins: BTreeMap::new(),
        }
    }
}

impl Registry {
    pub fn installed_names(&self) -> BTreeSet<String> {
        self.plugins.keys().cloned().collect()
    }

    pub fn enabled_names(&self) -> BTreeSet<String> {
        self.plugins
            .iter()
            .filter(|(_, e)| e.enabled)
            .map(|(n, _)| n.clone())
            .collect()
    }

    fn record(&mut self, manifest: &PluginManifest, now: DateTime<Utc>) -> bool {
        if self.plugins.contains_key(&manifest.name) {
            return false;
        }
        self.plugins.insert(
            manifest.name.clone(),
            RegistryEntry {
                installed: now,
                enabled: true,
                version: manifest.version.clone(),
                source: PluginSource::Builtin,
            },
        );
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    AlreadyInstalled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotInstalled,
}

/// Handle on the registry document. Holds no state beyond its path.
#[derive(Debug, Clone)]
pub struct PluginRegistry {
    path: PathBuf,
}

impl PluginRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_paths(paths: &Paths) -> Self {
        Self::new(paths.registry_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the registry; an absent file is the empty registry.
    pub fn load(&self) -> XopsResult<Registry> {
        Ok(self.load_with_digest()?.0)
    }

    fn load_with_digest(&self) -> XopsResult<(Registry, Option<String>)> {
        match document::read_snapshot(&self.path)? {
            None => Ok((Registry::default(), None)),
            Some(Snapshot { bytes, digest }) => {
                let registry = parse_registry(&self.path, &bytes)?;
                Ok((registry, Some(digest)))
            }
        }
    }

    /// Unconditionally write the full document.
    pub fn save(&self, registry: &Registry) -> XopsResult<()> {
        let json = document::to_pretty_json(registry)?;
        document::write_atomic(&self.path, json.as_bytes(), None)
    }

    /// Read-modify-write. `f` returns its result and whether it changed the
    /// registry; unchanged registries are not rewritten.
    fn update<T>(&self, f: impl FnOnce(&mut Registry) -> XopsResult<(T, bool)>) -> XopsResult<T> {
        let (mut registry, digest) = self.load_with_digest()?;
        let (out, changed) = f(&mut registry)?;
        if changed {
            let json = document::to_pretty_json(&registry)?;
            document::replace_if_unchanged(&self.path, json.as_bytes(), digest.as_deref(), None)?;
        }
        Ok(out)
    }

    pub fn install(&self, manifest: &PluginManifest) -> XopsResult<InstallOutcome> {
        self.update(|registry| {
            if registry.record(manifest, Utc::now()) {
                info!(plugin = %manifest.name, version = %manifest.version, "plugin installed");
                Ok((InstallOutcome::Installed, true))
            } else {
                debug!(plugin = %manifest.name, "plugin already installed");
                Ok((InstallOutcome::AlreadyInstalled, false))
            }
        })
    }

    /// Record several plugins in one write. Returns the names newly recorded,
    /// in input order.
    pub fn install_batch(&self, manifests: &[&PluginManifest]) -> XopsResult<Vec<String>> {
        self.update(|registry| {
            let now = Utc::now();
            let mut added = Vec::new();
            for manifest in manifests {
                if registry.record(manifest, now) {
                    added.push(manifest.name.clone());
                }
            }
            if !added.is_empty() {
                info!(plugins = ?added, "plugins installed");
            }
            let changed = !added.is_empty();
            Ok((added, changed))
        })
    }

    pub fn remove(&self, name: &str) -> XopsResult<RemoveOutcome> {
        self.update(|registry| match registry.plugins.remove(name) {
            Some(_) => {
                info!(plugin = name, "plugin removed");
                Ok((RemoveOutcome::Removed, true))
            }
            None => Ok((RemoveOutcome::NotInstalled, false)),
        })
    }

    pub fn enable(&self, name: &str) -> XopsResult<()> {
        self.set_enabled(name, true)
    }

    pub fn disable(&self, name: &str) -> XopsResult<()> {
        self.set_enabled(name, false)
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> XopsResult<()> {
        self.update(|registry| {
            let entry = registry
                .plugins
                .get_mut(name)
                .ok_or_else(|| XopsError::NotInstalled(name.to_string()))?;
            let changed = entry.enabled != enabled;
            entry.enabled = enabled;
            debug!(plugin = name, enabled, changed, "plugin enabled flag set");
            Ok(((), changed))
        })
    }

    pub fn is_installed(&self, name: &str) -> XopsResult<bool> {
        Ok(self.load()?.plugins.contains_key(name))
    }

    /// False for plugins that are not installed.
    pub fn is_enabled(&self, name: &str) -> XopsResult<bool> {
        Ok(self.load()?.plugins.get(name).is_some_and(|e| e.enabled))
    }

    pub fn list(&self) -> XopsResult<Vec<(String, RegistryEntry)>> {
        Ok(self.load()?.plugins.into_iter().collect())
    }

    pub fn installed_names(&self) -> XopsResult<BTreeSet<String>> {
        Ok(self.load()?.installed_names())
    }

    pub fn enabled_names(&self) -> XopsResult<BTreeSet<String>> {
        Ok(self.load()?.enabled_names())
    }
}

fn parse_registry(path: &Path, bytes: &[u8]) -> XopsResult<Registry> {
    let corrupt = |reason: String| XopsError::CorruptRegistry {
        path: path.to_path_buf(),
        reason,
    };
    let contents = std::str::from_utf8(bytes).map_err(|e| corrupt(format!("not UTF-8: {e}")))?;
    let registry: Registry = serde_json::from_str(contents).map_err(|e| corrupt(e.to_string()))?;
    if registry.version != REGISTRY_VERSION {
        return Err(corrupt(format!(
            "unsupported version {} (expected {})",
            registry.version, REGISTRY_VERSION
        )));
    }
    Ok(registry)
}
