//! The [`DocumentBackend`] trait.

use crate::error::StoreResult;
use crate::name::DocumentName;

/// Raw persistence of whole documents.
///
/// Backends do no locking of their own beyond what is needed for memory
/// safety; serialization of writers is the job of
/// [`DocumentStore`](crate::DocumentStore). Implementations must satisfy:
/// - `save` is atomic: a concurrent `load` returns either the previous
///   complete bytes or the new complete bytes.
/// - A failed `save` leaves the previous version in place.
/// - All I/O errors are propagated, never silently ignored.
pub trait DocumentBackend: Send + Sync {
    /// Load a document. Returns `Ok(None)` if it does not exist.
    fn load(&self, name: &DocumentName) -> StoreResult<Option<Vec<u8>>>;

    /// Replace a document's bytes atomically.
    fn save(&self, name: &DocumentName, bytes: &[u8]) -> StoreResult<()>;

    /// Remove a document. Returns `true` if it existed.
    fn remove(&self, name: &DocumentName) -> StoreResult<bool>;

    /// Names of every stored document, sorted.
    fn list(&self) -> StoreResult<Vec<DocumentName>>;

    /// Short backend identifier for logs.
    fn backend_name(&self) -> &'static str;
}
