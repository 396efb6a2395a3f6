//! JSON document store for Folio.
//!
//! Every piece of persisted state lives in a named JSON document, one file
//! per document under a data directory. This crate guarantees that a
//! document on disk is always either its previous complete version or its
//! new complete version, and that writers to the same document never lose
//! each other's updates.
//!
//! # Layers
//!
//! - [`DocumentBackend`] -- raw, unlocked persistence of whole documents
//!   - [`FsBackend`] -- stage to a temp file, `fsync`, rename over the target
//!   - [`InMemoryBackend`] -- `HashMap`-based backend for tests and embedding
//! - [`DocumentStore`] -- a backend plus a [`LockTable`] holding one mutex per
//!   document name, with typed JSON read-modify-write helpers
//!
//! # Design Rules
//!
//! 1. Rename is the atomicity boundary: readers never take a lock.
//! 2. Writers are serialized per document and parallel across documents.
//! 3. A failed write leaves the previous version untouched.
//! 4. I/O errors are propagated, logged with document and operation, and
//!    never retried.

pub mod backend;
pub mod error;
pub mod fs;
pub mod lock;
pub mod memory;
pub mod name;
pub mod store;

pub use backend::DocumentBackend;
pub use error::{StoreError, StoreResult};
pub use fs::{write_atomic, FsBackend, StagedWrite};
pub use lock::LockTable;
pub use memory::InMemoryBackend;
pub use name::{validate_document_name, DocumentName};
pub use store::DocumentStore;
