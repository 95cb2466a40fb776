//! Working directory owned by a workflow
//!
//! Skill files and code execution write here. The directory is shared by the
//! whole process: two workflows pointed at the same path will trample each
//! other's files.

use convoy_core::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default working directory, relative to the current directory
pub const DEFAULT_WORK_DIR: &str = "work_dir";

/// A prepared working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    /// Make sure `path` exists, emptying it first when `clear` is set
    pub fn prepare(path: impl Into<PathBuf>, clear: bool) -> Result<Self> {
        let path = path.into();
        fs::create_dir_all(&path)?;

        if clear {
            let mut removed = 0;
            for entry in fs::read_dir(&path)? {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    fs::remove_dir_all(entry.path())?;
                } else {
                    fs::remove_file(entry.path())?;
                }
                removed += 1;
            }
            info!(dir = %path.display(), removed, "Cleared work directory");
        }

        Ok(Self { path })
    }

    /// Path of the directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the directory currently holds no entries
    pub fn is_empty(&self) -> Result<bool> {
        Ok(fs::read_dir(&self.path)?.next().is_none())
    }
}

impl AsRef<Path> for WorkDir {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_missing_dir() {
        let root = tempfile::tempdir().unwrap();
        let work_dir = WorkDir::prepare(root.path().join("a/b"), true).unwrap();
        assert!(work_dir.path().is_dir());
        assert!(work_dir.is_empty().unwrap());
    }

    #[test]
    fn test_clear_removes_files_and_dirs() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("old.py"), "x").unwrap();
        fs::create_dir_all(root.path().join("nested/deeper")).unwrap();

        let work_dir = WorkDir::prepare(root.path(), true).unwrap();
        assert!(work_dir.is_empty().unwrap());
        assert!(root.path().is_dir());
    }

    #[test]
    fn test_keep_preserves_contents() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("keep.txt"), "x").unwrap();

        let work_dir = WorkDir::prepare(root.path(), false).unwrap();
        assert!(!work_dir.is_empty().unwrap());
        assert!(root.path().join("keep.txt").exists());
    }
}
