//! Albums and the photos they own.
//!
//! All album state lives in the `albums` document. Mutations are
//! read-modify-writes of that document under its lock; photo files are
//! written before the entry that references them and deleted after it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use folio_auth::{Clock, PasswordHasher};
use folio_store::{DocumentName, DocumentStore};
use folio_types::{Album, AlbumCollection, AlbumId, Photo, PhotoId};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::clear_main_album;
use crate::error::{ServiceError, ServiceResult};
use crate::patch::{double_option, normalize_text, required_text, MAX_TITLE_LEN};
use crate::uploads::{allowed_extension, UploadStore, ALLOWED_EXTENSIONS};

pub const ALBUMS_DOCUMENT: &str = "albums";

const MAX_DESCRIPTION_LEN: usize = 2000;
const MAX_CAPTION_LEN: usize = 1000;
const MAX_ORIGINAL_NAME_LEN: usize = 255;

/// Request to create an album.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewAlbum {
    /// Requested identifier; allocated when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update of an album. Blank description clears it.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlbumPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Partial update of a photo's metadata. Blank caption clears it.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhotoPatch {
    pub caption: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub captured_at: Option<Option<DateTime<Utc>>>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// An uploaded photo and the metadata known at upload time.
#[derive(Clone, Default)]
pub struct PhotoUpload {
    pub original_name: String,
    pub bytes: Vec<u8>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub captured_at: Option<DateTime<Utc>>,
    pub caption: Option<String>,
}

impl PhotoUpload {
    pub fn new(original_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            original_name: original_name.into(),
            bytes: bytes.into(),
            ..Self::default()
        }
    }
}

impl std::fmt::Debug for PhotoUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoUpload")
            .field("original_name", &self.original_name)
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

/// Album and photo operations over the `albums` document and the upload
/// directory.
pub struct AlbumService {
    store: Arc<DocumentStore>,
    uploads: Arc<UploadStore>,
    hasher: PasswordHasher,
    clock: Arc<dyn Clock>,
    albums: DocumentName,
}

impl AlbumService {
    pub fn new(
        store: Arc<DocumentStore>,
        uploads: Arc<UploadStore>,
        hasher: PasswordHasher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            uploads,
            hasher,
            clock,
            albums: DocumentName::from_static(ALBUMS_DOCUMENT),
        }
    }

    fn collection(&self) -> ServiceResult<AlbumCollection> {
        Ok(self.store.read_json_or_default(&self.albums)?)
    }

    /// Read-modify-write a single album, bumping `updated_at`.
    fn modify<R>(
        &self,
        id: &AlbumId,
        f: impl FnOnce(&mut Album) -> ServiceResult<R>,
    ) -> ServiceResult<R> {
        let now = self.clock.now();
        self.store
            .update_json(&self.albums, |albums: &mut AlbumCollection| {
                let album = albums
                    .get_mut(id)
                    .ok_or_else(|| ServiceError::album_not_found(id))?;
                let result = f(album)?;
                album.updated_at = now;
                Ok(result)
            })
    }

    fn ensure_exists(&self, id: &AlbumId) -> ServiceResult<()> {
        if self.collection()?.contains(id) {
            Ok(())
        } else {
            Err(ServiceError::album_not_found(id))
        }
    }

    pub fn list(&self) -> ServiceResult<Vec<Album>> {
        Ok(self.collection()?.albums)
    }

    pub fn get(&self, id: &AlbumId) -> ServiceResult<Album> {
        self.collection()?
            .albums
            .into_iter()
            .find(|a| &a.id == id)
            .ok_or_else(|| ServiceError::album_not_found(id))
    }

    /// Create an album, allocating the next free id unless one is requested.
    pub fn create(&self, new: NewAlbum) -> ServiceResult<Album> {
        let title = required_text("title", &new.title, MAX_TITLE_LEN)?;
        let description = normalize_text(new.description);
        check_len("description", description.as_deref(), MAX_DESCRIPTION_LEN)?;
        let requested = new
            .id
            .as_deref()
            .map(|raw| raw.trim().parse::<AlbumId>())
            .transpose()
            .map_err(|e| ServiceError::Validation(e.to_string()))?;

        let now = self.clock.now();
        let album = self
            .store
            .update_json(&self.albums, |albums: &mut AlbumCollection| {
                let id = match requested {
                    Some(id) if albums.contains(&id) => {
                        return Err(ServiceError::Conflict(format!("album {id} already exists")));
                    }
                    Some(id) => {
                        albums.reserve_album_id(&id);
                        id
                    }
                    None => albums
                        .allocate_album_id()
                        .map_err(|e| ServiceError::Conflict(e.to_string()))?,
                };
                let mut album = Album::new(id, title, now);
                album.description = description;
                albums.albums.push(album.clone());
                Ok(album)
            })?;
        info!(album = %album.id, title = %album.title, "album created");
        Ok(album)
    }

    pub fn update(&self, id: &AlbumId, patch: AlbumPatch) -> ServiceResult<Album> {
        let title = patch
            .title
            .as_deref()
            .map(|t| required_text("title", t, MAX_TITLE_LEN))
            .transpose()?;
        let description = patch.description.map(|d| normalize_text(Some(d)));
        if let Some(description) = &description {
            check_len("description", description.as_deref(), MAX_DESCRIPTION_LEN)?;
        }

        let album = self.modify(id, |album| {
            if let Some(title) = title {
                album.title = title;
            }
            if let Some(description) = description {
                album.description = description;
            }
            Ok(album.clone())
        })?;
        debug!(album = %id, "album updated");
        Ok(album)
    }

    /// Delete an album and its photo files.
    ///
    /// The site config stops referencing the album before the album is
    /// removed; files go last. A file that cannot be deleted is logged and
    /// left for reconciliation.
    pub fn delete(&self, id: &AlbumId) -> ServiceResult<Album> {
        let now = self.clock.now();
        let removed = self
            .store
            .update_json(&self.albums, |albums: &mut AlbumCollection| {
                if !albums.contains(id) {
                    return Err(ServiceError::album_not_found(id));
                }
                if clear_main_album(&self.store, id, now)? {
                    info!(album = %id, "main album cleared");
                }
                albums
                    .remove(id)
                    .ok_or_else(|| ServiceError::album_not_found(id))
            })?;

        for photo in &removed.photos {
            self.remove_file(&removed.id, photo);
        }
        info!(album = %id, photos = removed.photos.len(), "album deleted");
        Ok(removed)
    }

    fn remove_file(&self, album: &AlbumId, photo: &Photo) {
        match self.uploads.remove(&photo.file) {
            Ok(true) => {}
            Ok(false) => {
                warn!(album = %album, photo = %photo.id, file = %photo.file, "photo file was already missing");
            }
            Err(e) => {
                warn!(
                    album = %album,
                    photo = %photo.id,
                    file = %photo.file,
                    error = %e,
                    "photo file not deleted; orphaned until reconciled"
                );
            }
        }
    }

    /// Store an uploaded photo and append it to the album.
    ///
    /// The file is written before the entry. If the entry cannot be saved
    /// the file is orphaned; this is logged and reconciliation finds it.
    pub fn add_photo(&self, album_id: &AlbumId, upload: PhotoUpload) -> ServiceResult<Photo> {
        let original_name = upload.original_name.trim().to_string();
        if original_name.is_empty() {
            return Err(ServiceError::Validation("original file name is required".into()));
        }
        if original_name.chars().count() > MAX_ORIGINAL_NAME_LEN {
            return Err(ServiceError::Validation("original file name is too long".into()));
        }
        if upload.bytes.is_empty() {
            return Err(ServiceError::Validation("uploaded file is empty".into()));
        }
        let ext = allowed_extension(&original_name).ok_or_else(|| {
            ServiceError::Validation(format!(
                "unsupported file type {original_name:?}; expected one of {}",
                ALLOWED_EXTENSIONS.join(", ")
            ))
        })?;
        let caption = normalize_text(upload.caption);
        check_len("caption", caption.as_deref(), MAX_CAPTION_LEN)?;
        check_dimension("width", upload.width)?;
        check_dimension("height", upload.height)?;
        self.ensure_exists(album_id)?;

        let checksum = blake3::hash(&upload.bytes).to_hex().to_string();
        let size = upload.bytes.len() as u64;
        let now = self.clock.now();
        let mut written: Option<String> = None;

        let result = self
            .store
            .update_json(&self.albums, |albums: &mut AlbumCollection| {
                if !albums.contains(album_id) {
                    return Err(ServiceError::album_not_found(album_id));
                }
                let id = albums
                    .allocate_photo_id()
                    .map_err(|e| ServiceError::Conflict(e.to_string()))?;
                let album = albums
                    .get_mut(album_id)
                    .ok_or_else(|| ServiceError::album_not_found(album_id))?;
                let file = format!("{id}.{ext}");
                self.uploads.put(&file, &upload.bytes)?;
                written = Some(file.clone());

                let photo = Photo {
                    id,
                    file,
                    order: album.photos.len() as u32,
                    original_name,
                    size,
                    checksum,
                    width: upload.width,
                    height: upload.height,
                    captured_at: upload.captured_at,
                    caption,
                    uploaded_at: now,
                };
                album.photos.push(photo.clone());
                album.updated_at = now;
                Ok(photo)
            });

        match result {
            Ok(photo) => {
                info!(album = %album_id, photo = %photo.id, file = %photo.file, size, "photo added");
                Ok(photo)
            }
            Err(e) => {
                if let Some(file) = written {
                    warn!(
                        album = %album_id,
                        file = %file,
                        error = %e,
                        "photo file written but entry not saved; orphaned until reconciled"
                    );
                }
                Err(e)
            }
        }
    }

    /// Remove a photo entry, then its file.
    pub fn remove_photo(&self, album_id: &AlbumId, photo_id: &PhotoId) -> ServiceResult<Photo> {
        let removed = self.modify(album_id, |album| {
            album
                .remove_photo(photo_id)
                .ok_or_else(|| ServiceError::photo_not_found(photo_id))
        })?;
        self.remove_file(album_id, &removed);
        info!(album = %album_id, photo = %photo_id, "photo removed");
        Ok(removed)
    }

    /// Reorder photos. `order` must list every photo of the album once.
    pub fn reorder(&self, album_id: &AlbumId, order: Vec<PhotoId>) -> ServiceResult<Album> {
        let mut seen = HashSet::with_capacity(order.len());
        if let Some(duplicate) = order.iter().find(|id| !seen.insert(*id)) {
            return Err(ServiceError::Validation(format!(
                "photo {duplicate} listed more than once"
            )));
        }

        self.modify(album_id, |album| {
            if let Some(unknown) = order.iter().find(|id| !album.contains_photo(id)) {
                return Err(ServiceError::Validation(format!(
                    "photo {unknown} is not in album {}",
                    album.id
                )));
            }
            if order.len() != album.photos.len() {
                return Err(ServiceError::Validation(format!(
                    "order lists {} of the album's {} photos",
                    order.len(),
                    album.photos.len()
                )));
            }
            let mut by_id: HashMap<PhotoId, Photo> = album
                .photos
                .drain(..)
                .map(|photo| (photo.id.clone(), photo))
                .collect();
            album.photos = order.iter().filter_map(|id| by_id.remove(id)).collect();
            album.renumber();
            Ok(album.clone())
        })
    }

    /// Set or clear the album cover. The photo must belong to the album.
    pub fn set_cover(&self, album_id: &AlbumId, cover: Option<PhotoId>) -> ServiceResult<Album> {
        self.modify(album_id, |album| {
            if let Some(photo) = &cover {
                if !album.contains_photo(photo) {
                    return Err(ServiceError::Validation(format!(
                        "photo {photo} is not in album {}",
                        album.id
                    )));
                }
            }
            album.cover = cover;
            Ok(album.clone())
        })
    }

    /// Protect the album with a visitor password, or make it public again.
    pub fn set_password(&self, album_id: &AlbumId, password: Option<&str>) -> ServiceResult<Album> {
        let hash = match password {
            Some(p) if p.trim().is_empty() => {
                return Err(ServiceError::Validation("album password must not be blank".into()));
            }
            Some(p) => Some(self.hasher.hash(p)?),
            None => None,
        };
        let protected = hash.is_some();
        let album = self.modify(album_id, |album| {
            album.password_hash = hash;
            Ok(album.clone())
        })?;
        info!(album = %album_id, protected, "album access changed");
        Ok(album)
    }

    /// Check a visitor password. Unprotected albums accept anything.
    pub fn verify_password(&self, album_id: &AlbumId, password: &str) -> ServiceResult<bool> {
        let album = self.get(album_id)?;
        Ok(match &album.password_hash {
            Some(hash) => self.hasher.verify(password, hash),
            None => true,
        })
    }

    pub fn update_photo(
        &self,
        album_id: &AlbumId,
        photo_id: &PhotoId,
        patch: PhotoPatch,
    ) -> ServiceResult<Photo> {
        let caption = patch.caption.map(|c| normalize_text(Some(c)));
        if let Some(caption) = &caption {
            check_len("caption", caption.as_deref(), MAX_CAPTION_LEN)?;
        }
        check_dimension("width", patch.width)?;
        check_dimension("height", patch.height)?;

        self.modify(album_id, |album| {
            let photo = album
                .photo_mut(photo_id)
                .ok_or_else(|| ServiceError::photo_not_found(photo_id))?;
            if let Some(caption) = caption {
                photo.caption = caption;
            }
            if let Some(captured_at) = patch.captured_at {
                photo.captured_at = captured_at;
            }
            if let Some(width) = patch.width {
                photo.width = Some(width);
            }
            if let Some(height) = patch.height {
                photo.height = Some(height);
            }
            Ok(photo.clone())
        })
    }
}

impl std::fmt::Debug for AlbumService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlbumService")
            .field("uploads", &self.uploads.root())
            .finish_non_exhaustive()
    }
}

fn check_len(field: &str, value: Option<&str>, max: usize) -> ServiceResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ServiceError::Validation(format!(
            "{field} must be at most {max} characters"
        ))),
        _ => Ok(()),
    }
}

fn check_dimension(field: &str, value: Option<u32>) -> ServiceResult<()> {
    if value == Some(0) {
        return Err(ServiceError::Validation(format!("{field} must be positive")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigService, SiteConfigPatch};
    use folio_auth::{HashParams, ManualClock};
    use std::thread;

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<DocumentStore>,
        uploads: Arc<UploadStore>,
        albums: AlbumService,
        config: ConfigService,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DocumentStore::open_dir(dir.path().join("data")).unwrap());
        let uploads = Arc::new(UploadStore::open(dir.path().join("uploads")).unwrap());
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
        let hasher = PasswordHasher::new(HashParams::minimal()).unwrap();
        Fixture {
            albums: AlbumService::new(
                Arc::clone(&store),
                Arc::clone(&uploads),
                hasher,
                Arc::clone(&clock),
            ),
            config: ConfigService::new(Arc::clone(&store), clock),
            store,
            uploads,
            _dir: dir,
        }
    }

    fn new_album(title: &str) -> NewAlbum {
        NewAlbum {
            title: title.into(),
            ..NewAlbum::default()
        }
    }

    fn a(seq: u64) -> AlbumId {
        AlbumId::from_seq(seq)
    }

    fn p(seq: u64) -> PhotoId {
        PhotoId::from_seq(seq)
    }

    #[test]
    fn coastline_scenario() {
        let f = fixture();
        let album = f.albums.create(new_album("Coastline")).unwrap();
        assert_eq!(album.id, a(1));

        let photo = f
            .albums
            .add_photo(&a(1), PhotoUpload::new("dunes.jpg", b"jpeg-bytes".to_vec()))
            .unwrap();
        assert_eq!(photo.id, p(1));
        assert_eq!(photo.file, "p1.jpg");
        assert_eq!(photo.order, 0);
        assert_eq!(photo.size, 10);
        assert_eq!(photo.checksum, blake3::hash(b"jpeg-bytes").to_hex().to_string());
        assert!(f.uploads.exists("p1.jpg").unwrap());

        let album = f.albums.set_cover(&a(1), Some(p(1))).unwrap();
        assert_eq!(album.cover, Some(p(1)));

        f.albums.remove_photo(&a(1), &p(1)).unwrap();
        let album = f.albums.get(&a(1)).unwrap();
        assert!(album.photos.is_empty());
        assert!(album.cover.is_none());
        assert!(!f.uploads.exists("p1.jpg").unwrap());
    }

    #[test]
    fn photo_ids_are_global_and_orders_dense() {
        let f = fixture();
        f.albums.create(new_album("Coastline")).unwrap();
        f.albums.create(new_album("Forest")).unwrap();
        f.albums.add_photo(&a(1), PhotoUpload::new("a.png", b"1".to_vec())).unwrap();
        let second = f.albums.add_photo(&a(2), PhotoUpload::new("b.WEBP", b"2".to_vec())).unwrap();
        let third = f.albums.add_photo(&a(1), PhotoUpload::new("c.jpeg", b"3".to_vec())).unwrap();
        assert_eq!(second.file, "p2.webp");
        assert_eq!(third.id, p(3));
        assert_eq!(third.order, 1);

        f.albums.remove_photo(&a(1), &p(1)).unwrap();
        let album = f.albums.get(&a(1)).unwrap();
        assert_eq!(album.photos[0].id, p(3));
        album.check_invariants().unwrap();
    }

    #[test]
    fn upload_validation_happens_before_any_write() {
        let f = fixture();
        f.albums.create(new_album("Coastline")).unwrap();
        let rejected = [
            PhotoUpload::new("notes.txt", b"x".to_vec()),
            PhotoUpload::new("empty.jpg", Vec::new()),
            PhotoUpload::new("   ", b"x".to_vec()),
            PhotoUpload {
                width: Some(0),
                ..PhotoUpload::new("zero.jpg", b"x".to_vec())
            },
        ];
        for upload in rejected {
            assert!(matches!(
                f.albums.add_photo(&a(1), upload),
                Err(ServiceError::Validation(_))
            ));
        }
        assert!(matches!(
            f.albums.add_photo(&a(7), PhotoUpload::new("x.jpg", b"x".to_vec())),
            Err(ServiceError::NotFound { kind: "album", .. })
        ));
        assert!(f.uploads.list_files().unwrap().is_empty());
    }

    #[test]
    fn create_validates_and_honours_requested_ids() {
        let f = fixture();
        assert!(matches!(
            f.albums.create(new_album("  ")),
            Err(ServiceError::Validation(_))
        ));
        assert!(f.albums.create(new_album(&"t".repeat(201))).is_err());

        let requested = f
            .albums
            .create(NewAlbum {
                id: Some("A5".into()),
                title: " Harbour ".into(),
                description: Some("Boats at dawn".into()),
            })
            .unwrap();
        assert_eq!(requested.id, a(5));
        assert_eq!(requested.title, "Harbour");

        let conflict = f.albums.create(NewAlbum {
            id: Some("A5".into()),
            title: "Again".into(),
            description: None,
        });
        assert!(matches!(conflict, Err(ServiceError::Conflict(_))));

        let malformed = f.albums.create(NewAlbum {
            id: Some("B1".into()),
            title: "Bad".into(),
            description: None,
        });
        assert!(matches!(malformed, Err(ServiceError::Validation(_))));

        assert_eq!(f.albums.create(new_album("Next")).unwrap().id, a(6));
    }

    #[test]
    fn exhausted_album_ids_leave_the_document_readable() {
        let f = fixture();
        let last = f
            .albums
            .create(NewAlbum {
                id: Some("A999999999999999999".into()),
                ..new_album("Last")
            })
            .unwrap();
        assert_eq!(last.id.seq(), folio_types::id::MAX_SEQ);

        assert!(matches!(
            f.albums.create(new_album("Overflow")),
            Err(ServiceError::Conflict(_))
        ));
        assert_eq!(f.albums.list().unwrap().len(), 1);
    }

    #[test]
    fn removed_photo_ids_and_files_are_never_reused() {
        let f = fixture();
        f.albums.create(new_album("Coastline")).unwrap();
        let first = f.albums.add_photo(&a(1), PhotoUpload::new("a.jpg", b"1".to_vec())).unwrap();
        f.albums.remove_photo(&a(1), &first.id).unwrap();

        let second = f.albums.add_photo(&a(1), PhotoUpload::new("b.jpg", b"2".to_vec())).unwrap();
        assert_eq!(second.id, p(2));
        assert_eq!(second.file, "p2.jpg");

        // A late delete of the first file must not touch the second.
        f.uploads.remove(&first.file).unwrap();
        assert_eq!(f.uploads.read("p2.jpg").unwrap(), b"2");

        f.albums.delete(&a(1)).unwrap();
        f.albums.create(new_album("Again")).unwrap();
        let third = f.albums.add_photo(&a(2), PhotoUpload::new("c.jpg", b"3".to_vec())).unwrap();
        assert_eq!(third.id, p(3));
    }

    #[test]
    fn concurrent_creates_get_distinct_ids() {
        let f = fixture();
        let service = Arc::new(f.albums);
        let handles: Vec<_> = (0..2)
            .map(|i| {
                let service = Arc::clone(&service);
                thread::spawn(move || service.create(new_album(&format!("Album {i}"))).unwrap().id)
            })
            .collect();
        let mut ids: Vec<AlbumId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort();
        assert_eq!(ids, vec![a(1), a(2)]);
        assert_eq!(service.list().unwrap().len(), 2);
    }

    #[test]
    fn concurrent_uploads_are_all_recorded() {
        let f = fixture();
        f.albums.create(new_album("Coastline")).unwrap();
        let service = Arc::new(f.albums);
        let handles: Vec<_> = (0..6)
            .map(|i| {
                let service = Arc::clone(&service);
                thread::spawn(move || {
                    service
                        .add_photo(&a(1), PhotoUpload::new(format!("{i}.jpg"), vec![i as u8 + 1]))
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let album = service.get(&a(1)).unwrap();
        assert_eq!(album.photos.len(), 6);
        album.check_invariants().unwrap();
        assert_eq!(f.uploads.list_files().unwrap().len(), 6);
    }

    #[test]
    fn delete_clears_main_album_and_files() {
        let f = fixture();
        f.albums.create(new_album("Coastline")).unwrap();
        f.albums.add_photo(&a(1), PhotoUpload::new("a.jpg", b"1".to_vec())).unwrap();
        f.albums.add_photo(&a(1), PhotoUpload::new("b.jpg", b"2".to_vec())).unwrap();
        f.config
            .update(SiteConfigPatch {
                main_album: Some(Some(a(1))),
                ..Default::default()
            })
            .unwrap();

        let removed = f.albums.delete(&a(1)).unwrap();
        assert_eq!(removed.photos.len(), 2);
        assert!(f.config.get().unwrap().main_album.is_none());
        assert!(f.albums.list().unwrap().is_empty());
        assert!(f.uploads.list_files().unwrap().is_empty());
        assert!(matches!(
            f.albums.delete(&a(1)),
            Err(ServiceError::NotFound { .. })
        ));
        assert!(f.store.exists(&DocumentName::from_static(ALBUMS_DOCUMENT)).unwrap());
    }

    #[test]
    fn reorder_requires_a_permutation() {
        let f = fixture();
        f.albums.create(new_album("Coastline")).unwrap();
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            f.albums.add_photo(&a(1), PhotoUpload::new(name, b"x".to_vec())).unwrap();
        }

        for bad in [
            vec![p(1), p(2)],
            vec![p(1), p(1), p(2)],
            vec![p(1), p(2), p(9)],
        ] {
            assert!(matches!(
                f.albums.reorder(&a(1), bad),
                Err(ServiceError::Validation(_))
            ));
        }

        let album = f.albums.reorder(&a(1), vec![p(3), p(1), p(2)]).unwrap();
        let ids: Vec<_> = album.photos.iter().map(|ph| ph.id.clone()).collect();
        assert_eq!(ids, [p(3), p(1), p(2)]);
        album.check_invariants().unwrap();
        assert_eq!(f.albums.get(&a(1)).unwrap(), album);
    }

    #[test]
    fn cover_must_belong_to_album() {
        let f = fixture();
        f.albums.create(new_album("Coastline")).unwrap();
        f.albums.create(new_album("Forest")).unwrap();
        f.albums.add_photo(&a(2), PhotoUpload::new("tree.jpg", b"x".to_vec())).unwrap();
        assert!(matches!(
            f.albums.set_cover(&a(1), Some(p(1))),
            Err(ServiceError::Validation(_))
        ));
        assert_eq!(f.albums.set_cover(&a(2), Some(p(1))).unwrap().cover, Some(p(1)));
        assert!(f.albums.set_cover(&a(2), None).unwrap().cover.is_none());
    }

    #[test]
    fn album_password_round_trip() {
        let f = fixture();
        f.albums.create(new_album("Private")).unwrap();
        assert!(f.albums.verify_password(&a(1), "anything").unwrap());

        let album = f.albums.set_password(&a(1), Some("open sesame")).unwrap();
        assert!(album.is_protected());
        assert!(f.albums.verify_password(&a(1), "open sesame").unwrap());
        assert!(!f.albums.verify_password(&a(1), "guess").unwrap());
        assert!(f.albums.set_password(&a(1), Some("  ")).is_err());

        f.albums.set_password(&a(1), None).unwrap();
        assert!(f.albums.verify_password(&a(1), "guess").unwrap());
    }

    #[test]
    fn update_album_and_photo_metadata() {
        let f = fixture();
        f.albums.create(new_album("Coastline")).unwrap();
        f.albums.add_photo(&a(1), PhotoUpload::new("a.jpg", b"x".to_vec())).unwrap();

        let album = f
            .albums
            .update(
                &a(1),
                AlbumPatch {
                    title: Some("Coast".into()),
                    description: Some("Rocks".into()),
                },
            )
            .unwrap();
        assert_eq!(album.title, "Coast");
        assert_eq!(album.description.as_deref(), Some("Rocks"));

        let captured = Utc::now();
        let photo = f
            .albums
            .update_photo(
                &a(1),
                &p(1),
                PhotoPatch {
                    caption: Some("Low tide".into()),
                    captured_at: Some(Some(captured)),
                    width: Some(4000),
                    height: Some(3000),
                },
            )
            .unwrap();
        assert_eq!(photo.caption.as_deref(), Some("Low tide"));
        assert_eq!(photo.captured_at, Some(captured));
        assert_eq!(photo.width, Some(4000));

        let photo = f
            .albums
            .update_photo(
                &a(1),
                &p(1),
                PhotoPatch {
                    caption: Some(String::new()),
                    captured_at: Some(None),
                    ..PhotoPatch::default()
                },
            )
            .unwrap();
        assert!(photo.caption.is_none());
        assert!(photo.captured_at.is_none());
        assert!(matches!(
            f.albums.update_photo(&a(1), &p(5), PhotoPatch::default()),
            Err(ServiceError::NotFound { kind: "photo", .. })
        ));
    }
}
