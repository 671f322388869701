//! Whole-document persistence: atomic replace plus an advisory
//! compare-and-swap check.
//!
//! Every document this crate owns or co-owns (plugin registry, runtime
//! configuration, exec approvals, profiles) is rewritten in full. Writes go
//! to a temp file in the target directory and are renamed into place, so a
//! crash mid-write leaves the previous document intact.
//!
//! Callers that read-modify-write pass the digest they loaded; if the file
//! changed underneath them the write is refused with
//! [`XopsError::ConcurrentModification`]. This narrows, but does not close,
//! the window for two invocations racing on the same file.

use crate::core::error::{XopsError, XopsResult};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Raw bytes of a document as loaded, plus their SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub bytes: Vec<u8>,
    pub digest: String,
}

impl Snapshot {
    /// Contents as UTF-8. Callers map the error to their own corruption kind.
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.bytes)
    }
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Read a document. Absence is `Ok(None)`, not an error.
pub fn read_snapshot(path: &Path) -> XopsResult<Option<Snapshot>> {
    match std::fs::read(path) {
        Ok(bytes) => {
            let digest = digest_bytes(&bytes);
            Ok(Some(Snapshot { bytes, digest }))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(XopsError::IoError(e)),
    }
}

/// Atomically replace `path` with `bytes`, creating parent directories.
///
/// `mode` sets unix permissions on the new file before it becomes visible.
pub fn write_atomic(path: &Path, bytes: &[u8], mode: Option<u32>) -> XopsResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".xopsbot")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    set_mode(tmp.path(), mode)?;
    tmp.persist(path).map_err(|e| XopsError::IoError(e.error))?;

    debug!(path = %path.display(), bytes = bytes.len(), "wrote document");
    Ok(())
}

/// Replace `path` only if it still matches what the caller loaded.
///
/// `expected` is the digest from [`read_snapshot`], or `None` if the caller
/// saw no file. Returns `false` (and writes nothing) when the new bytes are
/// identical to what is on disk.
pub fn replace_if_unchanged(
    path: &Path,
    bytes: &[u8],
    expected: Option<&str>,
    mode: Option<u32>,
) -> XopsResult<bool> {
    let current = read_snapshot(path)?;
    let current_digest = current.as_ref().map(|s| s.digest.as_str());
    if current_digest != expected {
        return Err(XopsError::ConcurrentModification(path.to_path_buf()));
    }
    if current.is_some_and(|s| s.bytes == bytes) {
        debug!(path = %path.display(), "document unchanged, skipping write");
        return Ok(false);
    }
    write_atomic(path, bytes, mode)?;
    Ok(true)
}

/// Pretty JSON with a trailing newline, the on-disk form of every JSON document.
pub fn to_pretty_json<T: serde::Serialize + ?Sized>(value: &T) -> XopsResult<String> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: Option<u32>) -> XopsResult<()> {
    use std::os::unix::fs::PermissionsExt;
    if let Some(mode) = mode {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: Option<u32>) -> XopsResult<()> {
    Ok(())
}
