//! Per-document lock table.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::name::DocumentName;

/// One mutex per document name, created on first use.
///
/// Writers to the same document contend on that document's mutex only;
/// unrelated documents never share a lock. Entries are never evicted: the
/// set of document names is small and fixed by the services that use them.
#[derive(Debug, Default)]
pub struct LockTable {
    locks: Mutex<HashMap<DocumentName, Arc<Mutex<()>>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock handle for a document.
    pub fn handle(&self, name: &DocumentName) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(name.clone()).or_default().clone()
    }

    /// Number of documents that have a lock.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Acquire a document mutex.
///
/// The mutex guards no data, only the ordering of writers, and the document
/// on disk is consistent even if a holder panicked, so poisoning is ignored.
pub(crate) fn acquire(handle: &Mutex<()>) -> MutexGuard<'_, ()> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}
