//! Plugin dependency resolution.
//!
//! Depth-first over the manifest graph with an explicit stack, so very deep
//! chains cannot overflow the call stack. Dependencies are visited in the
//! order the manifest declares them, which fixes the relative order of
//! otherwise unconstrained siblings.

use crate::catalog::PluginManifest;
use crate::core::error::{XopsError, XopsResult};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

struct Frame<'a> {
    name: &'a str,
    deps: &'a [String],
    next: usize,
}

/// Compute the install order for `requested`.
///
/// Plugins already in `installed` are skipped, so the result only names
/// plugins that still need installing, each exactly once, dependencies first.
/// An already-installed `requested` yields an empty list.
pub fn resolve(
    requested: &str,
    catalog: &BTreeMap<String, PluginManifest>,
    installed: &BTreeSet<String>,
) -> XopsResult<Vec<String>> {
    let root = catalog
        .get(requested)
        .ok_or_else(|| XopsError::UnknownPlugin(requested.to_string()))?;
    if installed.contains(requested) {
        debug!(plugin = requested, "already installed, nothing to resolve");
        return Ok(Vec::new());
    }

    let mut order = Vec::new();
    let mut done: HashSet<&str> = HashSet::new();
    let mut on_path: HashSet<&str> = HashSet::new();
    let mut stack = vec![Frame {
        name: root.name.as_str(),
        deps: &root.dependencies,
        next: 0,
    }];
    on_path.insert(root.name.as_str());

    while let Some(frame) = stack.last_mut() {
        if frame.next == frame.deps.len() {
            let name = frame.name;
            stack.pop();
            on_path.remove(name);
            done.insert(name);
            order.push(name.to_string());
            continue;
        }

        let dep = frame.deps[frame.next].as_str();
        frame.next += 1;
        if installed.contains(dep) || done.contains(dep) {
            continue;
        }
        if on_path.contains(dep) {
            return Err(XopsError::CircularDependency(dep.to_string()));
        }
        let manifest = catalog
            .get(dep)
            .ok_or_else(|| XopsError::UnknownDependency {
                plugin: frame.name.to_string(),
                dependency: dep.to_string(),
            })?;
        on_path.insert(manifest.name.as_str());
        stack.push(Frame {
            name: manifest.name.as_str(),
            deps: &manifest.dependencies,
            next: 0,
        });
    }

    debug!(plugin = requested, order = ?order, "resolved install order");
    Ok(order)
}
