//! File-tree copy capability used to materialise skill and workspace
//! templates.
//!
//! The plugin lifecycle only needs "copy this directory there" and "remove
//! that directory"; it takes a `&dyn TreeCopier` so tests can observe the
//! calls without touching template assets.

use std::io;
use std::path::Path;

pub trait TreeCopier {
    /// Recursively copy `src` into `dest`, creating `dest` if needed.
    /// Existing files in `dest` are overwritten.
    fn copy_tree(&self, src: &Path, dest: &Path) -> io::Result<()>;

    /// Recursively remove `dir`. Removing a missing directory is a no-op.
    fn remove_tree(&self, dir: &Path) -> io::Result<()>;
}

/// Plain `std::fs` implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsTreeCopier;

impl TreeCopier for FsTreeCopier {
    fn copy_tree(&self, src: &Path, dest: &Path) -> io::Result<()> {
        let mut pending = vec![(src.to_path_buf(), dest.to_path_buf())];
        while let Some((from, to)) = pending.pop() {
            std::fs::create_dir_all(&to)?;
            for entry in std::fs::read_dir(&from)? {
                let entry = entry?;
                let target = to.join(entry.file_name());
                if entry.file_type()?.is_dir() {
                    pending.push((entry.path(), target));
                } else {
                    std::fs::copy(entry.path(), &target)?;
                }
            }
        }
        Ok(())
    }

    fn remove_tree(&self, dir: &Path) -> io::Result<()> {
        match std::fs::remove_dir_all(dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
