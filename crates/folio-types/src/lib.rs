//! Foundation types for Folio.
//!
//! This crate provides the identifiers and persisted records shared by every
//! other Folio crate. The records here are the serialization contract of the
//! JSON documents on disk: changing a field name changes the file format.
//!
//! # Key Types
//!
//! - [`AlbumId`] / [`PhotoId`]: sequential identifiers (`A1`, `p7`)
//! - [`Album`] / [`Photo`]: an album and the photos it exclusively owns
//! - [`AlbumCollection`]: the `albums` document
//! - [`SiteConfig`]: the `site_config` singleton
//! - [`AdminCredential`]: the `admin_config` singleton
//! - [`ErrorCode`]: stable error categories surfaced to callers

pub mod album;
pub mod config;
pub mod credential;
pub mod error;
pub mod id;

pub use album::{Album, AlbumCollection, Photo};
pub use config::SiteConfig;
pub use credential::AdminCredential;
pub use error::{ErrorCode, TypeError};
pub use id::{AlbumId, PhotoId};
