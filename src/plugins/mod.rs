//! Plugin subsystem: dependency resolution, the installation registry, the
//! lifecycle manager on top of both, and role presets.

pub mod lifecycle;
pub mod preset;
pub mod registry;
pub mod resolve;

pub use lifecycle::{InstallReport, PluginListing, PluginManager, PluginStatus, RemoveReport};
pub use registry::{InstallOutcome, PluginRegistry, Registry, RegistryEntry, RemoveOutcome};
pub use resolve::resolve;
