//! Plugin lifecycle: install, remove, enable, disable, list.
//!
//! Each operation validates and resolves fully before touching disk, then
//! records the registry change in one write and resyncs runtime policy.

use super::registry::{PluginRegistry, RegistryEntry, RemoveOutcome};
use super::resolve::resolve;
use crate::catalog::{Catalog, PluginManifest};
use crate::core::error::{XopsError, XopsResult};
use crate::core::fs_tree::TreeCopier;
use crate::core::paths::Paths;
use crate::core::settings::Settings;
use crate::safety::sync_runtime_policy;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Serialize)]
pub struct InstallReport {
    pub requested: String,
    /// Newly installed, dependencies first. Empty means already installed.
    pub installed: Vec<String>,
    pub skills: Vec<String>,
    pub tools: Vec<String>,
    pub updated: Vec<PathBuf>,
}

impl InstallReport {
    pub fn already_installed(&self) -> bool {
        self.installed.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveReport {
    pub plugin: String,
    #[serde(skip)]
    pub outcome: RemoveOutcome,
    pub updated: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginStatus {
    NotInstalled,
    Enabled,
    Disabled,
    /// In the registry but no longer in the catalog.
    Orphaned,
}

impl PluginStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PluginStatus::NotInstalled => "not installed",
            PluginStatus::Enabled => "enabled",
            PluginStatus::Disabled => "disabled",
            PluginStatus::Orphaned => "orphaned",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PluginListing {
    pub name: String,
    pub version: String,
    pub description: String,
    pub status: PluginStatus,
    pub installed: Option<DateTime<Utc>>,
    pub dependencies: Vec<String>,
    pub tools: Vec<String>,
}

pub struct PluginManager<'a> {
    paths: &'a Paths,
    catalog: &'a Catalog,
    settings: &'a Settings,
    copier: &'a dyn TreeCopier,
    registry: PluginRegistry,
}

impl<'a> PluginManager<'a> {
    pub fn new(
        paths: &'a Paths,
        catalog: &'a Catalog,
        settings: &'a Settings,
        copier: &'a dyn TreeCopier,
    ) -> Self {
        Self {
            paths,
            catalog,
            settings,
            copier,
            registry: PluginRegistry::for_paths(paths),
        }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Install `name` and every missing dependency.
    pub fn install(&self, name: &str) -> XopsResult<InstallReport> {
        self.catalog.require_plugin(name)?;
        let installed = self.registry.installed_names()?;
        let order = resolve(name, self.catalog.manifests(), &installed)?;
        if order.is_empty() {
            debug!(plugin = name, "already installed");
            return Ok(InstallReport {
                requested: name.to_string(),
                ..InstallReport::default()
            });
        }

        let manifests: Vec<&PluginManifest> = order
            .iter()
            .map(|n| self.catalog.require_plugin(n))
            .collect::<XopsResult<_>>()?;
        for manifest in &manifests {
            self.copy_skills(manifest)?;
        }
        let recorded = self.registry.install_batch(&manifests)?;
        let updated = sync_runtime_policy(self.paths, self.catalog, self.settings)?;

        let mut report = InstallReport {
            requested: name.to_string(),
            installed: recorded,
            updated,
            ..InstallReport::default()
        };
        for manifest in &manifests {
            report.skills.extend(manifest.skills.iter().cloned());
            report.tools.extend(manifest.tools.iter().cloned());
        }
        info!(plugin = name, installed = ?report.installed, "install complete");
        Ok(report)
    }

    pub fn remove(&self, name: &str) -> XopsResult<RemoveReport> {
        let registry = self.registry.load()?;
        let manifest = self.catalog.plugin(name);
        if manifest.is_none() && !registry.plugins.contains_key(name) {
            return Err(XopsError::UnknownPlugin(name.to_string()));
        }
        if !registry.plugins.contains_key(name) {
            return Ok(RemoveReport {
                plugin: name.to_string(),
                outcome: RemoveOutcome::NotInstalled,
                updated: Vec::new(),
            });
        }

        let dependents: Vec<String> = registry
            .plugins
            .keys()
            .filter(|other| {
                self.catalog
                    .plugin(other)
                    .is_some_and(|m| m.dependencies.iter().any(|d| d == name))
            })
            .cloned()
            .collect();
        if !dependents.is_empty() {
            return Err(XopsError::DependentsInstalled {
                plugin: name.to_string(),
                dependents,
            });
        }

        let outcome = self.registry.remove(name)?;
        if let Some(manifest) = manifest {
            self.remove_skills(manifest)?;
        }
        let updated = sync_runtime_policy(self.paths, self.catalog, self.settings)?;
        Ok(RemoveReport {
            plugin: name.to_string(),
            outcome,
            updated,
        })
    }

    pub fn enable(&self, name: &str) -> XopsResult<Vec<PathBuf>> {
        self.require_known(name)?;
        self.registry.enable(name)?;
        sync_runtime_policy(self.paths, self.catalog, self.settings)
    }

    pub fn disable(&self, name: &str) -> XopsResult<Vec<PathBuf>> {
        self.require_known(name)?;
        self.registry.disable(name)?;
        sync_runtime_policy(self.paths, self.catalog, self.settings)
    }

    /// Catalog plugins in declaration order, then orphaned registry entries.
    pub fn list(&self) -> XopsResult<Vec<PluginListing>> {
        let registry = self.registry.load()?;
        let mut listings: Vec<PluginListing> = self
            .catalog
            .plugins()
            .map(|m| {
                let entry = registry.plugins.get(&m.name);
                let status = match entry {
                    None => PluginStatus::NotInstalled,
                    Some(e) if e.enabled => PluginStatus::Enabled,
                    Some(_) => PluginStatus::Disabled,
                };
                PluginListing {
                    name: m.name.clone(),
                    version: entry.map_or_else(|| m.version.clone(), |e| e.version.clone()),
                    description: m.description.clone(),
                    status,
                    installed: entry.map(|e| e.installed),
                    dependencies: m.dependencies.clone(),
                    tools: m.tools.clone(),
                }
            })
            .collect();

        for (name, entry) in &registry.plugins {
            if self.catalog.plugin(name).is_none() {
                listings.push(orphan_listing(name, entry));
            }
        }
        Ok(listings)
    }

    fn require_known(&self, name: &str) -> XopsResult<()> {
        if self.catalog.plugin(name).is_some() || self.registry.is_installed(name)? {
            Ok(())
        } else {
            Err(XopsError::UnknownPlugin(name.to_string()))
        }
    }

    /// Copy each bundled skill template to the shared skills directory and
    /// into every workspace the plugin serves. Missing templates are skipped.
    fn copy_skills(&self, manifest: &PluginManifest) -> XopsResult<()> {
        for skill in &manifest.skills {
            let Some(src) = self.paths.skill_template(skill).filter(|p| p.is_dir()) else {
                debug!(plugin = %manifest.name, skill = %skill, "no skill template, skipping copy");
                continue;
            };
            self.copier.copy_tree(&src, &self.paths.skill_dir(skill))?;
            for workspace in &manifest.workspaces {
                self.copier
                    .copy_tree(&src, &self.paths.workspace_skill_dir(workspace, skill))?;
            }
        }
        Ok(())
    }

    fn remove_skills(&self, manifest: &PluginManifest) -> XopsResult<()> {
        for skill in &manifest.skills {
            self.copier.remove_tree(&self.paths.skill_dir(skill))?;
            for workspace in &manifest.workspaces {
                self.copier
                    .remove_tree(&self.paths.workspace_skill_dir(workspace, skill))?;
            }
        }
        Ok(())
    }
}

fn orphan_listing(name: &str, entry: &RegistryEntry) -> PluginListing {
    PluginListing {
        name: name.to_string(),
        version: entry.version.clone(),
        description: String::new(),
        status: PluginStatus::Orphaned,
        installed: Some(entry.installed),
        dependencies: Vec::new(),
        tools: Vec::new(),
    }
}
