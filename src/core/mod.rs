//! Shared primitives for xopsbot.
//!
//! Errors, filesystem layout, operator settings, atomic document writes,
//! timestamps, logging and terminal output helpers live here.

pub mod document;
pub mod error;
pub mod fs_tree;
pub mod logging;
pub mod output;
pub mod paths;
pub mod settings;
pub mod time;
