use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::id::{AlbumId, PhotoId};

/// A photo entry. Owned by exactly one [`Album`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub id: PhotoId,
    /// Stored file name inside the upload directory.
    pub file: String,
    /// Display position; always equal to the photo's index in the album.
    pub order: u32,
    /// File name as supplied by the uploader.
    pub original_name: String,
    /// Size of the stored file in bytes.
    pub size: u64,
    /// BLAKE3 hex digest of the stored bytes.
    pub checksum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// An album: ordered photos plus display metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: AlbumId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub photos: Vec<Photo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<PhotoId>,
    /// Argon2 PHC string for visitor access; `None` means the album is public.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Album {
    /// Create an empty album.
    pub fn new(id: AlbumId, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            photos: Vec::new(),
            cover: None,
            password_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn photo(&self, id: &PhotoId) -> Option<&Photo> {
        self.photos.iter().find(|p| &p.id == id)
    }

    pub fn photo_mut(&mut self, id: &PhotoId) -> Option<&mut Photo> {
        self.photos.iter_mut().find(|p| &p.id == id)
    }

    pub fn contains_photo(&self, id: &PhotoId) -> bool {
        self.photo(id).is_some()
    }

    pub fn is_protected(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Remove a photo, clearing the cover if it pointed at it and
    /// renumbering the remaining photos.
    pub fn remove_photo(&mut self, id: &PhotoId) -> Option<Photo> {
        let index = self.photos.iter().position(|p| &p.id == id)?;
        let removed = self.photos.remove(index);
        if self.cover.as_ref() == Some(id) {
            self.cover = None;
        }
        self.renumber();
        Some(removed)
    }

    /// Rewrite every `order` field to match the photo's position.
    pub fn renumber(&mut self) {
        for (index, photo) in self.photos.iter_mut().enumerate() {
            photo.order = index as u32;
        }
    }

    /// Check the album's structural invariants.
    pub fn check_invariants(&self) -> Result<(), TypeError> {
        for (position, photo) in self.photos.iter().enumerate() {
            if photo.order as usize != position {
                return Err(TypeError::InconsistentOrder { position });
            }
        }
        if let Some(cover) = &self.cover {
            if !self.contains_photo(cover) {
                return Err(TypeError::DanglingCover(cover.to_string()));
            }
        }
        Ok(())
    }
}

/// The `albums` document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumCollection {
    #[serde(default)]
    pub albums: Vec<Album>,
    /// Highest album sequence number ever allocated or requested.
    #[serde(default)]
    pub album_seq: u64,
    /// Highest photo sequence number ever allocated. Photo file names are
    /// derived from photo ids, so this must never move backwards.
    #[serde(default)]
    pub photo_seq: u64,
}

impl AlbumCollection {
    pub fn get(&self, id: &AlbumId) -> Option<&Album> {
        self.albums.iter().find(|a| &a.id == id)
    }

    pub fn get_mut(&mut self, id: &AlbumId) -> Option<&mut Album> {
        self.albums.iter_mut().find(|a| &a.id == id)
    }

    pub fn contains(&self, id: &AlbumId) -> bool {
        self.get(id).is_some()
    }

    pub fn remove(&mut self, id: &AlbumId) -> Option<Album> {
        let index = self.albums.iter().position(|a| &a.id == id)?;
        Some(self.albums.remove(index))
    }

    /// Allocate a fresh album identifier and advance the high-water mark.
    pub fn allocate_album_id(&mut self) -> Result<AlbumId, TypeError> {
        let floor = self
            .albums
            .iter()
            .map(|a| a.id.seq())
            .fold(self.album_seq, u64::max);
        let id = AlbumId::after_seq(floor)?;
        self.album_seq = id.seq();
        Ok(id)
    }

    /// Record a caller-chosen album identifier so allocation skips past it.
    pub fn reserve_album_id(&mut self, id: &AlbumId) {
        self.album_seq = self.album_seq.max(id.seq());
    }

    /// Allocate a photo identifier that no photo, live or deleted, has held.
    pub fn allocate_photo_id(&mut self) -> Result<PhotoId, TypeError> {
        let floor = self.photos().map(|(_, p)| p.id.seq()).fold(self.photo_seq, u64::max);
        let id = PhotoId::after_seq(floor)?;
        self.photo_seq = id.seq();
        Ok(id)
    }

    /// Iterate over every photo together with its owning album.
    pub fn photos(&self) -> impl Iterator<Item = (&Album, &Photo)> {
        self.albums
            .iter()
            .flat_map(|album| album.photos.iter().map(move |photo| (album, photo)))
    }

    /// Every stored file name referenced by a photo entry.
    pub fn referenced_files(&self) -> impl Iterator<Item = &str> {
        self.photos().map(|(_, p)| p.file.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(seq: u64, order: u32) -> Photo {
        Photo {
            id: PhotoId::from_seq(seq),
            file: format!("p{seq}.jpg"),
            order,
            original_name: format!("img{seq}.jpg"),
            size: 10,
            checksum: "00".into(),
            width: None,
            height: None,
            captured_at: None,
            caption: None,
            uploaded_at: Utc::now(),
        }
    }

    fn album_with_photos(n: u64) -> Album {
        let mut album = Album::new(AlbumId::from_seq(1), "Coastline", Utc::now());
        for seq in 1..=n {
            album.photos.push(photo(seq, (seq - 1) as u32));
        }
        album
    }

    #[test]
    fn remove_photo_clears_cover_and_renumbers() {
        let mut album = album_with_photos(3);
        album.cover = Some(PhotoId::from_seq(1));

        let removed = album.remove_photo(&PhotoId::from_seq(1)).unwrap();
        assert_eq!(removed.file, "p1.jpg");
        assert!(album.cover.is_none());
        assert_eq!(album.photos[0].order, 0);
        assert_eq!(album.photos[1].order, 1);
        album.check_invariants().unwrap();
    }

    #[test]
    fn remove_missing_photo_is_none() {
        let mut album = album_with_photos(1);
        assert!(album.remove_photo(&PhotoId::from_seq(9)).is_none());
        assert_eq!(album.photos.len(), 1);
    }

    #[test]
    fn invariants_detect_dangling_cover() {
        let mut album = album_with_photos(1);
        album.cover = Some(PhotoId::from_seq(5));
        assert_eq!(
            album.check_invariants(),
            Err(TypeError::DanglingCover("p5".into()))
        );
    }

    #[test]
    fn invariants_detect_bad_order() {
        let mut album = album_with_photos(2);
        album.photos[1].order = 7;
        assert_eq!(
            album.check_invariants(),
            Err(TypeError::InconsistentOrder { position: 1 })
        );
    }

    #[test]
    fn collection_allocates_ids_past_existing() {
        let mut collection = AlbumCollection::default();
        assert_eq!(collection.allocate_album_id().unwrap().as_str(), "A1");
        assert_eq!(collection.allocate_photo_id().unwrap().as_str(), "p1");

        collection.albums.push(album_with_photos(2));
        let mut second = Album::new(AlbumId::from_seq(4), "Forest", Utc::now());
        second.photos.push(photo(9, 0));
        collection.albums.push(second);

        assert_eq!(collection.allocate_album_id().unwrap().as_str(), "A5");
        assert_eq!(collection.allocate_photo_id().unwrap().as_str(), "p10");
        assert_eq!(collection.referenced_files().count(), 3);
    }

    #[test]
    fn deleted_ids_are_not_reallocated() {
        let mut collection = AlbumCollection::default();
        collection.albums.push(album_with_photos(3));
        assert_eq!(collection.allocate_photo_id().unwrap().as_str(), "p4");

        collection.albums[0].remove_photo(&PhotoId::from_seq(3));
        collection.albums.clear();
        assert_eq!(collection.allocate_photo_id().unwrap().as_str(), "p5");
        assert_eq!(collection.allocate_album_id().unwrap().as_str(), "A1");
        assert_eq!(collection.allocate_album_id().unwrap().as_str(), "A2");
    }

    #[test]
    fn exhausted_album_ids_are_an_error() {
        let mut collection = AlbumCollection::default();
        collection.reserve_album_id(&AlbumId::from_seq(crate::id::MAX_SEQ));
        assert_eq!(
            collection.allocate_album_id(),
            Err(TypeError::IdsExhausted { kind: "album" })
        );
        assert_eq!(collection.album_seq, crate::id::MAX_SEQ);
    }

    #[test]
    fn document_shape_is_stable() {
        let mut collection = AlbumCollection::default();
        collection.albums.push(album_with_photos(1));
        let value = serde_json::to_value(&collection).unwrap();
        assert_eq!(value["albums"][0]["id"], "A1");
        assert_eq!(value["albums"][0]["photos"][0]["file"], "p1.jpg");
        assert!(value["albums"][0].get("password_hash").is_none());

        let empty: AlbumCollection = serde_json::from_str("{}").unwrap();
        assert!(empty.albums.is_empty());
        assert_eq!(empty.photo_seq, 0);
    }
}
