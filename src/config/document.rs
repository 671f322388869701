//! Runtime configuration document (`openclaw.json`).
//!
//! The runtime reads relaxed JSON. We read with `json5` and write plain
//! pretty-printed JSON, which is a subset, so the file stays readable by
//! both. Comments and key order in hand-edited files are not preserved.

use crate::core::document;
use crate::core::error::{XopsError, XopsResult};
use serde_json::Value;
use std::path::Path;

/// A loaded configuration plus the digest it was read at.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub value: Value,
    pub digest: String,
}

/// Load the runtime configuration. Absent is `Ok(None)`; anything that is
/// not a relaxed-JSON object is [`XopsError::CorruptConfig`].
pub fn load_runtime_config(path: &Path) -> XopsResult<Option<LoadedConfig>> {
    let Some(snapshot) = document::read_snapshot(path)? else {
        return Ok(None);
    };
    let contents = snapshot.text().map_err(|e| XopsError::CorruptConfig {
        path: path.to_path_buf(),
        reason: format!("not UTF-8: {e}"),
    })?;
    let value = parse_runtime_config(path, contents)?;
    Ok(Some(LoadedConfig {
        value,
        digest: snapshot.digest,
    }))
}

pub fn parse_runtime_config(path: &Path, contents: &str) -> XopsResult<Value> {
    let corrupt = |reason: String| XopsError::CorruptConfig {
        path: path.to_path_buf(),
        reason,
    };
    let value: Value = json5::from_str(contents).map_err(|e| corrupt(e.to_string()))?;
    if !value.is_object() {
        return Err(corrupt("top level is not an object".to_string()));
    }
    check_shared_sections(&value).map_err(corrupt)?;
    Ok(value)
}

/// Sections the merge reads or extends, with the JSON type each must have.
/// Parents come before children so a pointer only resolves through objects.
const SHARED_SECTIONS: &[(&str, &str, bool)] = &[
    ("/agents", "agents", false),
    ("/agents/list", "agents.list", true),
    ("/agents/defaults", "agents.defaults", false),
    ("/agents/defaults/tools", "agents.defaults.tools", false),
    ("/skills", "skills", false),
    ("/skills/load", "skills.load", false),
    ("/skills/load/extraDirs", "skills.load.extraDirs", true),
    ("/channels", "channels", false),
    ("/env", "env", false),
];

fn check_shared_sections(value: &Value) -> Result<(), String> {
    for &(pointer, key, array) in SHARED_SECTIONS {
        match value.pointer(pointer) {
            None => {}
            Some(Value::Array(_)) if array => {}
            Some(Value::Object(_)) if !array => {}
            Some(_) if array => return Err(format!("{key} is not an array")),
            Some(_) => return Err(format!("{key} is not an object")),
        }
    }
    Ok(())
}

/// Write `value` if the file still has `expected` digest (`None`: file must
/// still be absent). Returns whether anything was written.
pub fn save_runtime_config(path: &Path, value: &Value, expected: Option<&str>) -> XopsResult<bool> {
    let json = document::to_pretty_json(value)?;
    document::replace_if_unchanged(path, json.as_bytes(), expected, None)
}
