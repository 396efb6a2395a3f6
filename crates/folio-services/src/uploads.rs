//! The upload directory: one flat directory of photo files.
//!
//! File writes reuse the document store's stage-then-rename protocol, so a
//! file is either absent or complete. Names are validated before any path is
//! built from them.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use folio_store::fs::is_staging_file;
use folio_store::write_atomic;
use serde::Serialize;
use tracing::{debug, error, warn};
use walkdir::WalkDir;

use crate::error::{ServiceError, ServiceResult};

/// Extensions accepted for photo uploads, lowercase.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "avif"];

const MAX_FILE_NAME_LEN: usize = 255;

/// Per-extension totals in [`StorageStats`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExtensionStats {
    pub count: u64,
    pub bytes: u64,
}

/// Summary of the upload directory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    pub file_count: u64,
    pub total_bytes: u64,
    pub by_extension: BTreeMap<String, ExtensionStats>,
}

/// Reject names that could escape the upload directory or collide with
/// staging files.
pub fn validate_file_name(name: &str) -> ServiceResult<()> {
    let reason = if name.is_empty() {
        Some("must not be empty")
    } else if name.len() > MAX_FILE_NAME_LEN {
        Some("is too long")
    } else if name.contains(['/', '\\']) {
        Some("must not contain path separators")
    } else if name.contains("..") {
        Some("must not contain '..'")
    } else if name.starts_with('.') {
        Some("must not start with '.'")
    } else if name.chars().any(char::is_control) {
        Some("must not contain control characters")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(ServiceError::Validation(format!(
            "file name {name:?} {reason}"
        ))),
        None => Ok(()),
    }
}

/// Lowercased extension of `name`, if it is one of [`ALLOWED_EXTENSIONS`].
pub fn allowed_extension(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Stored photo files under one directory.
#[derive(Debug)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    /// Open (creating if needed) an upload directory, clearing staging files
    /// left by an interrupted write.
    pub fn open(root: impl Into<PathBuf>) -> ServiceResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| ServiceError::upload(root.display().to_string(), "create_dir", e))?;
        let store = Self { root };
        store.remove_stale_staging();
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn remove_stale_staging(&self) {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.root.display(), error = %e, "cannot scan upload directory");
                return;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if is_staging_file(name) {
                warn!(file = name, "removing interrupted upload");
                if let Err(e) = fs::remove_file(entry.path()) {
                    warn!(file = name, error = %e, "failed to remove interrupted upload");
                }
            }
        }
    }

    fn path_of(&self, file: &str) -> ServiceResult<PathBuf> {
        validate_file_name(file)?;
        Ok(self.root.join(file))
    }

    /// Atomically write `file`, replacing any previous content.
    pub fn put(&self, file: &str, bytes: &[u8]) -> ServiceResult<()> {
        validate_file_name(file)?;
        write_atomic(&self.root, file, bytes).map_err(|e| {
            error!(file, op = "write", error = %e, "upload write failed");
            ServiceError::upload(file, "write", e)
        })?;
        debug!(file, len = bytes.len(), "upload stored");
        Ok(())
    }

    /// Delete `file`. Returns `false` if it did not exist.
    pub fn remove(&self, file: &str) -> ServiceResult<bool> {
        let path = self.path_of(file)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(file, "upload removed");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => {
                error!(file, op = "remove", error = %e, "upload removal failed");
                Err(ServiceError::upload(file, "remove", e))
            }
        }
    }

    pub fn exists(&self, file: &str) -> ServiceResult<bool> {
        Ok(self.path_of(file)?.is_file())
    }

    pub fn read(&self, file: &str) -> ServiceResult<Vec<u8>> {
        let path = self.path_of(file)?;
        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ServiceError::NotFound {
                kind: "file",
                id: file.to_string(),
            },
            _ => ServiceError::upload(file, "read", e),
        })
    }

    /// Names of every stored file, sorted. Staging files are skipped.
    pub fn list_files(&self) -> ServiceResult<Vec<String>> {
        let entries = fs::read_dir(&self.root)
            .map_err(|e| ServiceError::upload(self.root.display().to_string(), "list", e))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| ServiceError::upload(self.root.display().to_string(), "list", e))?;
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !is_staging_file(name) {
                    files.push(name.to_string());
                }
            }
        }
        files.sort();
        Ok(files)
    }

    /// Walk the directory and total file sizes by extension.
    ///
    /// Read-only and lock-free: a concurrent upload may or may not be counted.
    pub fn stats(&self) -> ServiceResult<StorageStats> {
        let mut stats = StorageStats::default();
        for entry in WalkDir::new(&self.root).min_depth(1).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // Files can vanish mid-walk; skip rather than fail the summary.
                    warn!(error = %e, "skipping unreadable upload entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if is_staging_file(&name) {
                continue;
            }
            let len = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(e) => {
                    warn!(file = %name, error = %e, "skipping upload without metadata");
                    continue;
                }
            };
            let ext = Path::new(&*name)
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase)
                .unwrap_or_default();
            stats.file_count += 1;
            stats.total_bytes += len;
            let bucket = stats.by_extension.entry(ext).or_default();
            bucket.count += 1;
            bucket.bytes += len;
        }
        Ok(stats)
    }
}
