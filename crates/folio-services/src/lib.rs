//! Domain services for Folio.
//!
//! Services own the rules that keep the `albums` and `site_config` documents
//! consistent with each other and with the upload directory. Each operation
//! validates its input before touching storage, then performs its writes in
//! a fixed order so that a partial failure leaves at worst an orphaned file,
//! never a dangling reference.
//!
//! Lock order across documents is `albums` then `site_config`.

pub mod album;
pub mod config;
pub mod error;
pub mod patch;
pub mod reconcile;
pub mod uploads;

pub use album::{AlbumPatch, AlbumService, NewAlbum, PhotoPatch, PhotoUpload, ALBUMS_DOCUMENT};
pub use config::{ConfigService, SiteConfigPatch, CONFIG_DOCUMENT};
pub use error::{ServiceError, ServiceResult};
pub use reconcile::{MissingFile, ReconciliationReport, Reconciler};
pub use uploads::{ExtensionStats, StorageStats, UploadStore, ALLOWED_EXTENSIONS};
