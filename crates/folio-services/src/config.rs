//! The `site_config` singleton.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use folio_auth::Clock;
use folio_store::{DocumentName, DocumentStore};
use folio_types::{AlbumCollection, AlbumId, SiteConfig};
use serde::Deserialize;
use tracing::info;

use crate::album::ALBUMS_DOCUMENT;
use crate::error::{ServiceError, ServiceResult};
use crate::patch::{double_option, normalize_text, required_text, MAX_TITLE_LEN};

pub const CONFIG_DOCUMENT: &str = "site_config";

const MAX_TAGLINE_LEN: usize = 500;
const MAX_EMAIL_LEN: usize = 254;

/// Partial update of [`SiteConfig`]. Absent fields are left unchanged.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfigPatch {
    pub title: Option<String>,
    /// Blank clears the tagline.
    pub tagline: Option<String>,
    /// Blank clears the address.
    pub contact_email: Option<String>,
    /// `null` clears the main album.
    #[serde(default, deserialize_with = "double_option")]
    pub main_album: Option<Option<AlbumId>>,
}

/// Reads and updates the site configuration.
pub struct ConfigService {
    store: Arc<DocumentStore>,
    clock: Arc<dyn Clock>,
    config: DocumentName,
    albums: DocumentName,
}

impl ConfigService {
    pub fn new(store: Arc<DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            config: DocumentName::from_static(CONFIG_DOCUMENT),
            albums: DocumentName::from_static(ALBUMS_DOCUMENT),
        }
    }

    /// The current configuration; defaults if none was ever saved.
    pub fn get(&self) -> ServiceResult<SiteConfig> {
        Ok(self.store.read_json_or_default(&self.config)?)
    }

    /// Apply `patch` and return the stored result.
    ///
    /// A `main_album` must name an existing album. The check and the write
    /// happen under the `albums` lock so the album cannot be deleted between
    /// them.
    pub fn update(&self, patch: SiteConfigPatch) -> ServiceResult<SiteConfig> {
        let title = patch
            .title
            .as_deref()
            .map(|t| required_text("title", t, MAX_TITLE_LEN))
            .transpose()?;
        let tagline = patch.tagline.map(|t| normalize_text(Some(t)));
        if let Some(Some(tagline)) = &tagline {
            if tagline.chars().count() > MAX_TAGLINE_LEN {
                return Err(ServiceError::Validation(format!(
                    "tagline must be at most {MAX_TAGLINE_LEN} characters"
                )));
            }
        }
        let contact_email = patch.contact_email.map(|e| normalize_text(Some(e)));
        if let Some(Some(email)) = &contact_email {
            validate_email(email)?;
        }

        let now = self.clock.now();
        self.store.with_lock(&self.albums, || {
            if let Some(Some(id)) = &patch.main_album {
                let albums: AlbumCollection = self.store.read_json_or_default(&self.albums)?;
                if !albums.contains(id) {
                    return Err(ServiceError::Validation(format!(
                        "main_album {id} does not name an existing album"
                    )));
                }
            }
            let updated = self.store.update_json(&self.config, |config: &mut SiteConfig| {
                if let Some(title) = title {
                    config.title = title;
                }
                if let Some(tagline) = tagline {
                    config.tagline = tagline;
                }
                if let Some(email) = contact_email {
                    config.contact_email = email;
                }
                if let Some(main_album) = patch.main_album {
                    config.main_album = main_album;
                }
                config.updated_at = Some(now);
                Ok::<_, ServiceError>(config.clone())
            })?;
            info!(main_album = ?updated.main_album, "site config updated");
            Ok(updated)
        })
    }
}

/// Clear `main_album` if it names `album`. Returns whether it did.
///
/// Callers that are removing the album hold the `albums` lock.
pub(crate) fn clear_main_album(
    store: &DocumentStore,
    album: &AlbumId,
    now: DateTime<Utc>,
) -> ServiceResult<bool> {
    let config = DocumentName::from_static(CONFIG_DOCUMENT);
    if !store.exists(&config)? {
        return Ok(false);
    }
    store.update_json(&config, |config: &mut SiteConfig| {
        if config.main_album.as_ref() != Some(album) {
            return Ok::<_, ServiceError>(false);
        }
        config.main_album = None;
        config.updated_at = Some(now);
        Ok(true)
    })
}

fn validate_email(email: &str) -> ServiceResult<()> {
    let well_formed = email.len() <= MAX_EMAIL_LEN
        && !email.chars().any(char::is_whitespace)
        && matches!(email.split_once('@'), Some((local, domain)) if !local.is_empty() && !domain.is_empty());
    if well_formed {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!(
            "contact_email {email:?} is not an email address"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_auth::ManualClock;
    use folio_types::Album;

    fn service() -> (Arc<DocumentStore>, ConfigService) {
        let store = Arc::new(DocumentStore::in_memory());
        let service = ConfigService::new(Arc::clone(&store), Arc::new(ManualClock::default()));
        (store, service)
    }

    fn seed_album(store: &DocumentStore, seq: u64) {
        let name = DocumentName::from_static(ALBUMS_DOCUMENT);
        store
            .update_json(&name, |albums: &mut AlbumCollection| {
                albums
                    .albums
                    .push(Album::new(AlbumId::from_seq(seq), "Coastline", Utc::now()));
                Ok::<_, ServiceError>(())
            })
            .unwrap();
    }

    #[test]
    fn get_defaults_when_absent() {
        let (_, service) = service();
        assert_eq!(service.get().unwrap(), SiteConfig::default());
    }

    #[test]
    fn main_album_must_exist() {
        let (store, service) = service();
        let err = service
            .update(SiteConfigPatch {
                main_album: Some(Some(AlbumId::from_seq(1))),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(!store.exists(&DocumentName::from_static(CONFIG_DOCUMENT)).unwrap());

        seed_album(&store, 1);
        let updated = service
            .update(SiteConfigPatch {
                main_album: Some(Some(AlbumId::from_seq(1))),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(updated.main_album, Some(AlbumId::from_seq(1)));
        assert_eq!(service.get().unwrap(), updated);

        let cleared = service
            .update(SiteConfigPatch {
                main_album: Some(None),
                ..Default::default()
            })
            .unwrap();
        assert!(cleared.main_album.is_none());
    }

    #[test]
    fn text_fields_validated_and_cleared() {
        let (_, service) = service();
        assert!(service
            .update(SiteConfigPatch {
                title: Some("  ".into()),
                ..Default::default()
            })
            .is_err());
        assert!(service
            .update(SiteConfigPatch {
                contact_email: Some("not-an-email".into()),
                ..Default::default()
            })
            .is_err());

        let updated = service
            .update(SiteConfigPatch {
                title: Some(" Shorelines ".into()),
                tagline: Some("Light on water".into()),
                contact_email: Some("studio@example.com".into()),
                main_album: None,
            })
            .unwrap();
        assert_eq!(updated.title, "Shorelines");
        assert_eq!(updated.contact_email.as_deref(), Some("studio@example.com"));

        let cleared = service
            .update(SiteConfigPatch {
                tagline: Some(String::new()),
                ..Default::default()
            })
            .unwrap();
        assert!(cleared.tagline.is_none());
        assert_eq!(cleared.title, "Shorelines");
    }

    #[test]
    fn clear_main_album_only_touches_matching_album() {
        let (store, service) = service();
        seed_album(&store, 1);
        seed_album(&store, 2);
        service
            .update(SiteConfigPatch {
                main_album: Some(Some(AlbumId::from_seq(1))),
                ..Default::default()
            })
            .unwrap();

        assert!(!clear_main_album(&store, &AlbumId::from_seq(2), Utc::now()).unwrap());
        assert!(clear_main_album(&store, &AlbumId::from_seq(1), Utc::now()).unwrap());
        assert!(service.get().unwrap().main_album.is_none());
    }

    #[test]
    fn patch_deserializes_null_main_album() {
        let patch: SiteConfigPatch = serde_json::from_str(r#"{"main_album":null}"#).unwrap();
        assert_eq!(patch.main_album, Some(None));
        let patch: SiteConfigPatch = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert!(patch.main_album.is_none());
    }
}
