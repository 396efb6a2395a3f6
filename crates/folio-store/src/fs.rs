//! Filesystem backend: one JSON file per document.
//!
//! Writes go through [`write_atomic`]: the bytes are staged into a temp file
//! in the target directory, flushed and `fsync`ed, then renamed over the
//! target. Rename within one directory is atomic on POSIX filesystems, so a
//! reader opening the target sees either the old file or the new one.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, error, warn};

use crate::backend::DocumentBackend;
use crate::error::{StoreError, StoreResult};
use crate::name::DocumentName;

/// Suffix carried by every staged file.
const STAGING_SUFFIX: &str = ".tmp";

/// Returns `true` for file names produced by the staging step.
pub fn is_staging_file(file_name: &str) -> bool {
    file_name.starts_with('.') && file_name.ends_with(STAGING_SUFFIX)
}

fn stage_in(dir: &Path, file_name: &str, bytes: &[u8]) -> io::Result<NamedTempFile> {
    let mut staged = tempfile::Builder::new()
        .prefix(&format!(".{file_name}."))
        .suffix(STAGING_SUFFIX)
        .tempfile_in(dir)?;
    staged.write_all(bytes)?;
    staged.flush()?;
    staged.as_file().sync_all()?;
    Ok(staged)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// Atomically replace `dir/file_name` with `bytes`.
///
/// On error the staged file is removed and the previous contents of the
/// target, if any, are untouched.
pub fn write_atomic(dir: &Path, file_name: &str, bytes: &[u8]) -> io::Result<()> {
    let staged = stage_in(dir, file_name, bytes)?;
    staged.persist(dir.join(file_name)).map_err(|e| e.error)?;
    sync_dir(dir)
}

/// A document write that has been staged and fsynced but not yet renamed
/// into place.
///
/// Dropping a `StagedWrite` discards the staged file.
pub struct StagedWrite {
    document: String,
    dir: PathBuf,
    target: PathBuf,
    file: NamedTempFile,
}

impl StagedWrite {
    /// Path of the staged temp file.
    pub fn staged_path(&self) -> &Path {
        self.file.path()
    }

    /// Rename the staged file over the target.
    pub fn commit(self) -> StoreResult<()> {
        let document = self.document;
        self.file
            .persist(&self.target)
            .map_err(|e| StoreError::io(document.clone(), "rename", e.error))?;
        sync_dir(&self.dir).map_err(|e| StoreError::io(document, "sync-dir", e))
    }

    /// Leave the staged file on disk without renaming it, as a crash between
    /// stage and rename would.
    pub fn abandon(self) -> StoreResult<PathBuf> {
        let document = self.document;
        self.file
            .into_temp_path()
            .keep()
            .map_err(|e| StoreError::io(document, "abandon", e.error))
    }
}

/// Filesystem [`DocumentBackend`]: `<root>/<name>.json`.
#[derive(Debug)]
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    /// Open (or create) a data directory.
    ///
    /// Staged files left behind by an interrupted write are removed; the
    /// documents they were meant to replace still hold their previous
    /// complete version.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        let dir = root.display().to_string();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(dir.clone(), "open", e))?;

        let backend = Self { root };
        let removed = backend.remove_stale_staging()?;
        if removed > 0 {
            warn!(dir = %dir, removed, "removed staged files from interrupted writes");
        }
        debug!(dir = %dir, "document directory opened");
        Ok(backend)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &DocumentName) -> PathBuf {
        self.root.join(name.file_name())
    }

    /// Stage a write without committing it.
    pub fn stage(&self, name: &DocumentName, bytes: &[u8]) -> StoreResult<StagedWrite> {
        let file = stage_in(&self.root, &name.file_name(), bytes)
            .map_err(|e| StoreError::io(name.as_str(), "stage", e))?;
        Ok(StagedWrite {
            document: name.to_string(),
            dir: self.root.clone(),
            target: self.path_for(name),
            file,
        })
    }

    fn remove_stale_staging(&self) -> StoreResult<usize> {
        let dir = self.root.display().to_string();
        let mut removed = 0;
        let entries =
            fs::read_dir(&self.root).map_err(|e| StoreError::io(dir.clone(), "scan", e))?;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(dir.clone(), "scan", e))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if is_staging_file(file_name) {
                fs::remove_file(entry.path())
                    .map_err(|e| StoreError::io(dir.clone(), "cleanup", e))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

impl DocumentBackend for FsBackend {
    fn load(&self, name: &DocumentName) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(self.path_for(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                error!(document = %name, op = "load", error = %e, "document read failed");
                Err(StoreError::io(name.as_str(), "load", e))
            }
        }
    }

    fn save(&self, name: &DocumentName, bytes: &[u8]) -> StoreResult<()> {
        write_atomic(&self.root, &name.file_name(), bytes).map_err(|e| {
            error!(document = %name, op = "save", error = %e, "document write failed");
            StoreError::io(name.as_str(), "save", e)
        })?;
        debug!(document = %name, len = bytes.len(), "document saved");
        Ok(())
    }

    fn remove(&self, name: &DocumentName) -> StoreResult<bool> {
        match fs::remove_file(self.path_for(name)) {
            Ok(()) => {
                sync_dir(&self.root).map_err(|e| StoreError::io(name.as_str(), "sync-dir", e))?;
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => {
                error!(document = %name, op = "remove", error = %e, "document removal failed");
                Err(StoreError::io(name.as_str(), "remove", e))
            }
        }
    }

    fn list(&self) -> StoreResult<Vec<DocumentName>> {
        let dir = self.root.display().to_string();
        let entries =
            fs::read_dir(&self.root).map_err(|e| StoreError::io(dir.clone(), "list", e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(dir.clone(), "list", e))?;
            let file_name = entry.file_name();
            let Some(stem) = file_name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if let Ok(name) = DocumentName::new(stem) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
