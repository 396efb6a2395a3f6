//! Detection and cleanup of mismatches between photo entries and files.
//!
//! Two failure windows exist by construction: a file written whose entry was
//! never saved (an orphan file), and an entry whose file was lost outside the
//! service (a missing file). Orphans can be pruned; missing files are only
//! reported.

use std::collections::BTreeSet;
use std::sync::Arc;

use folio_store::{DocumentName, DocumentStore};
use folio_types::{AlbumCollection, AlbumId, PhotoId};
use serde::Serialize;
use tracing::{info, warn};

use crate::album::ALBUMS_DOCUMENT;
use crate::error::ServiceResult;
use crate::uploads::UploadStore;

/// A photo entry whose file is absent from the upload directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MissingFile {
    pub album: AlbumId,
    pub photo: PhotoId,
    pub file: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    /// Stored files no photo entry references.
    pub orphan_files: Vec<String>,
    pub missing_files: Vec<MissingFile>,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.orphan_files.is_empty() && self.missing_files.is_empty()
    }
}

pub struct Reconciler {
    store: Arc<DocumentStore>,
    uploads: Arc<UploadStore>,
    albums: DocumentName,
}

impl Reconciler {
    pub fn new(store: Arc<DocumentStore>, uploads: Arc<UploadStore>) -> Self {
        Self {
            store,
            uploads,
            albums: DocumentName::from_static(ALBUMS_DOCUMENT),
        }
    }

    /// Compare referenced files against the upload directory.
    ///
    /// Runs under the `albums` lock: uploads write their file and entry
    /// under the same lock, so an in-flight upload is never seen as an orphan.
    pub fn scan(&self) -> ServiceResult<ReconciliationReport> {
        let report = self.store.with_lock(&self.albums, || self.scan_locked())?;
        info!(
            orphans = report.orphan_files.len(),
            missing = report.missing_files.len(),
            "reconciliation scan finished"
        );
        Ok(report)
    }

    fn scan_locked(&self) -> ServiceResult<ReconciliationReport> {
        let albums: AlbumCollection = self.store.read_json_or_default(&self.albums)?;
        let on_disk: BTreeSet<String> = self.uploads.list_files()?.into_iter().collect();
        let referenced: BTreeSet<&str> = albums.referenced_files().collect();

        let orphan_files = on_disk
            .iter()
            .filter(|file| !referenced.contains(file.as_str()))
            .cloned()
            .collect();
        let missing_files = albums
            .photos()
            .filter(|(_, photo)| !on_disk.contains(&photo.file))
            .map(|(album, photo)| MissingFile {
                album: album.id.clone(),
                photo: photo.id.clone(),
                file: photo.file.clone(),
            })
            .collect();
        Ok(ReconciliationReport {
            orphan_files,
            missing_files,
        })
    }

    /// Delete every orphan file. Returns the names removed.
    pub fn prune_orphans(&self) -> ServiceResult<Vec<String>> {
        self.store.with_lock(&self.albums, || {
            let report = self.scan_locked()?;
            let mut removed = Vec::with_capacity(report.orphan_files.len());
            for file in report.orphan_files {
                match self.uploads.remove(&file) {
                    Ok(true) => {
                        info!(file = %file, "orphan file pruned");
                        removed.push(file);
                    }
                    Ok(false) => {}
                    Err(e) => warn!(file = %file, error = %e, "orphan file could not be pruned"),
                }
            }
            for missing in &report.missing_files {
                warn!(
                    album = %missing.album,
                    photo = %missing.photo,
                    file = %missing.file,
                    "photo entry has no file"
                );
            }
            Ok(removed)
        })
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("uploads", &self.uploads.root())
            .finish_non_exhaustive()
    }
}
