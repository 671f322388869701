use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XopsError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("Unknown plugin: {0}")]
    UnknownPlugin(String),
    #[error("Unknown plugin: {dependency} (required by {plugin})")]
    UnknownDependency { plugin: String, dependency: String },
    #[error("Unknown preset: {0}")]
    UnknownPreset(String),
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid safety mode: {0} (valid options: safe, standard, full)")]
    InvalidSafetyMode(String),
    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),
    #[error("Plugin not installed: {0}")]
    NotInstalled(String),
    #[error("Cannot remove {plugin}: required by {}", dependents.join(", "))]
    DependentsInstalled {
        plugin: String,
        dependents: Vec<String>,
    },
    #[error("Corrupt plugin registry at {}: {reason}", path.display())]
    CorruptRegistry { path: PathBuf, reason: String },
    #[error("Corrupt configuration document at {}: {reason}", path.display())]
    CorruptConfig { path: PathBuf, reason: String },
    #[error("Corrupt catalog: {0}")]
    CorruptCatalog(String),
    #[error("{} was modified by another process; re-run the command", .0.display())]
    ConcurrentModification(PathBuf),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type XopsResult<T> = Result<T, XopsError>;
