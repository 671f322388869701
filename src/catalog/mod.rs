//! Read-only catalog of plugin manifests, tool risk tables and presets.
//!
//! The catalog is static data compiled into the binary (see [`assets`]).
//! Everything else treats it as a pure lookup table.

pub mod assets;
pub mod risk;
pub mod tools_md;

use crate::core::error::{XopsError, XopsResult};
use crate::safety::SafetyMode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// A capability bundle: skills, tools and the workspaces that receive them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    pub name: String,
    pub version: String,
    pub description: String,
    pub skills: Vec<String>,
    pub tools: Vec<String>,
    pub workspaces: Vec<String>,
    /// Plugins that must be installed first, visited in declared order.
    pub dependencies: Vec<String>,
    pub required_bins: Vec<String>,
    #[serde(default)]
    pub optional_bins: Vec<String>,
}

/// Four-step risk scale, ordered `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    /// Section header used in generated docs.
    pub fn header(self) -> &'static str {
        match self {
            RiskLevel::Low => "Read-Only Operations",
            RiskLevel::Medium => "Diagnostic Operations",
            RiskLevel::High => "Mutations",
            RiskLevel::Critical => "Destructive Operations",
        }
    }

    /// What the runtime does at this level in standard mode.
    pub fn behavior(self) -> &'static str {
        match self {
            RiskLevel::Low => "Auto-execute without prompting",
            RiskLevel::Medium => "Execute with awareness notification",
            RiskLevel::High => "Require explicit approval before execution",
            RiskLevel::Critical => "Require approval with confirmation prompt",
        }
    }

    pub fn lowered(self) -> Self {
        match self {
            RiskLevel::Low | RiskLevel::Medium => RiskLevel::Low,
            RiskLevel::High => RiskLevel::Medium,
            RiskLevel::Critical => RiskLevel::High,
        }
    }

    pub fn raised(self) -> Self {
        match self {
            RiskLevel::Low => RiskLevel::Medium,
            RiskLevel::Medium => RiskLevel::High,
            RiskLevel::High | RiskLevel::Critical => RiskLevel::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifierEffect {
    Lower,
    Raise,
}

/// A flag that shifts a command's base risk (e.g. `--dry-run`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskModifier {
    pub flag: String,
    pub effect: ModifierEffect,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDefinition {
    pub command: String,
    pub risk: RiskLevel,
    pub description: String,
    pub read_only: bool,
    #[serde(default)]
    pub risk_modifiers: Vec<RiskModifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub default_risk: RiskLevel,
    /// Path-glob patterns (`*/kubectl`) for the runtime's exec allowlist.
    pub binary_patterns: Vec<String>,
    pub commands: Vec<CommandDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetDefinition {
    pub name: String,
    pub label: String,
    pub description: String,
    pub plugins: Vec<String>,
    pub workspaces: Vec<String>,
    pub safety_mode: SafetyMode,
    pub tools: Vec<String>,
    #[serde(default)]
    pub channels: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WorkspaceToolsFile {
    workspaces: BTreeMap<String, WorkspaceTools>,
}

#[derive(Debug, Deserialize)]
struct WorkspaceTools {
    tools: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    plugins: BTreeMap<String, PluginManifest>,
    /// Declaration order, for listings.
    plugin_order: Vec<String>,
    tools: BTreeMap<String, ToolDefinition>,
    tool_order: Vec<String>,
    presets: Vec<PresetDefinition>,
    workspace_tools: BTreeMap<String, Vec<String>>,
}

impl Catalog {
    /// Parse and validate the catalog embedded in the binary.
    pub fn builtin() -> XopsResult<Self> {
        let mut catalog = Catalog::default();
        for (path, src) in assets::PLUGIN_SOURCES {
            catalog.add_plugin(parse_source(path, src)?)?;
        }
        for (path, src) in assets::TOOL_SOURCES {
            catalog.add_tool(parse_source(path, src)?)?;
        }
        for (path, src) in assets::PRESET_SOURCES {
            catalog.add_preset(parse_source(path, src)?)?;
        }
        let (path, src) = assets::WORKSPACE_TOOLS_SOURCE;
        let file: WorkspaceToolsFile = parse_source(path, src)?;
        for (workspace, entry) in file.workspaces {
            catalog.set_workspace_tools(&workspace, entry.tools);
        }
        catalog.validate()?;
        debug!(sources = ?assets::list_sources(), "catalog loaded");
        Ok(catalog)
    }

    /// Build a catalog from in-memory parts (tests, alternative catalogs).
    /// Not validated; call [`Catalog::validate`] if references must hold.
    pub fn from_parts(
        plugins: Vec<PluginManifest>,
        tools: Vec<ToolDefinition>,
        presets: Vec<PresetDefinition>,
    ) -> XopsResult<Self> {
        let mut catalog = Catalog::default();
        for p in plugins {
            catalog.add_plugin(p)?;
        }
        for t in tools {
            catalog.add_tool(t)?;
        }
        for p in presets {
            catalog.add_preset(p)?;
        }
        Ok(catalog)
    }

    fn add_plugin(&mut self, manifest: PluginManifest) -> XopsResult<()> {
        if self.plugins.contains_key(&manifest.name) {
            return Err(XopsError::CorruptCatalog(format!(
                "duplicate plugin '{}'",
                manifest.name
            )));
        }
        self.plugin_order.push(manifest.name.clone());
        self.plugins.insert(manifest.name.clone(), manifest);
        Ok(())
    }

    fn add_tool(&mut self, tool: ToolDefinition) -> XopsResult<()> {
        if self.tools.contains_key(&tool.name) {
            return Err(XopsError::CorruptCatalog(format!(
                "duplicate tool '{}'",
                tool.name
            )));
        }
        self.tool_order.push(tool.name.clone());
        self.tools.insert(tool.name.clone(), tool);
        Ok(())
    }

    fn add_preset(&mut self, preset: PresetDefinition) -> XopsResult<()> {
        if self.presets.iter().any(|p| p.name == preset.name) {
            return Err(XopsError::CorruptCatalog(format!(
                "duplicate preset '{}'",
                preset.name
            )));
        }
        self.presets.push(preset);
        Ok(())
    }

    /// Cross-reference checks: plugin tools, preset plugins and workspace
    /// tools must exist. Plugin dependencies are left to the resolver.
    pub fn validate(&self) -> XopsResult<()> {
        for manifest in self.plugins.values() {
            for tool in &manifest.tools {
                if !self.tools.contains_key(tool) {
                    return Err(XopsError::CorruptCatalog(format!(
                        "plugin '{}' bundles unknown tool '{}'",
                        manifest.name, tool
                    )));
                }
            }
        }
        for preset in &self.presets {
            for plugin in &preset.plugins {
                if !self.plugins.contains_key(plugin) {
                    return Err(XopsError::CorruptCatalog(format!(
                        "preset '{}' references unknown plugin '{}'",
                        preset.name, plugin
                    )));
                }
            }
        }
        for (workspace, tools) in &self.workspace_tools {
            if let Some(tool) = tools.iter().find(|t| !self.tools.contains_key(*t)) {
                return Err(XopsError::CorruptCatalog(format!(
                    "workspace '{}' lists unknown tool '{}'",
                    workspace, tool
                )));
            }
        }
        Ok(())
    }

    pub fn manifests(&self) -> &BTreeMap<String, PluginManifest> {
        &self.plugins
    }

    pub fn plugin(&self, name: &str) -> Option<&PluginManifest> {
        self.plugins.get(name)
    }

    pub fn require_plugin(&self, name: &str) -> XopsResult<&PluginManifest> {
        self.plugin(name)
            .ok_or_else(|| XopsError::UnknownPlugin(name.to_string()))
    }

    /// Plugins in declaration order.
    pub fn plugins(&self) -> impl Iterator<Item = &PluginManifest> {
        self.plugin_order.iter().filter_map(|n| self.plugins.get(n))
    }

    pub fn tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    pub fn require_tool(&self, name: &str) -> XopsResult<&ToolDefinition> {
        self.tool(name)
            .ok_or_else(|| XopsError::UnknownTool(name.to_string()))
    }

    pub fn tools(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tool_order.iter().filter_map(|n| self.tools.get(n))
    }

    pub fn presets(&self) -> &[PresetDefinition] {
        &self.presets
    }

    pub fn preset(&self, name: &str) -> XopsResult<&PresetDefinition> {
        self.presets
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| XopsError::UnknownPreset(name.to_string()))
    }

    /// Tools assigned to a workspace, in catalog tool order.
    pub fn workspace_tools(&self, workspace: &str) -> Vec<&ToolDefinition> {
        let names: BTreeSet<&str> = self
            .workspace_tools
            .get(workspace)
            .map(|v| v.iter().map(String::as_str).collect())
            .unwrap_or_default();
        self.tools().filter(|t| names.contains(t.name.as_str())).collect()
    }

    /// Assign the tools a workspace uses (drives its TOOLS.md).
    pub fn set_workspace_tools(&mut self, workspace: &str, tools: Vec<String>) {
        self.workspace_tools.insert(workspace.to_string(), tools);
    }
}

fn parse_source<T: serde::de::DeserializeOwned>(path: &str, src: &str) -> XopsResult<T> {
    toml::from_str(src).map_err(|e| XopsError::CorruptCatalog(format!("{}: {}", path, e)))
}
