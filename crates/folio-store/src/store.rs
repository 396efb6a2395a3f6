use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::backend::DocumentBackend;
use crate::error::{StoreError, StoreResult};
use crate::fs::FsBackend;
use crate::lock::{acquire, LockTable};
use crate::memory::InMemoryBackend;
use crate::name::DocumentName;

/// Named JSON documents with per-document write serialization.
///
/// Reads go straight to the backend and rely on its atomic replace. Every
/// mutation (`write`, `update`, `delete`) holds the document's mutex from
/// the lock table, so a read-modify-write never loses a concurrent update.
pub struct DocumentStore {
    backend: Box<dyn DocumentBackend>,
    locks: LockTable,
}

impl DocumentStore {
    pub fn new(backend: impl DocumentBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            locks: LockTable::new(),
        }
    }

    /// A store backed by JSON files in `dir`.
    pub fn open_dir(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        Ok(Self::new(FsBackend::open(dir)?))
    }

    /// A store held entirely in memory.
    pub fn in_memory() -> Self {
        Self::new(InMemoryBackend::new())
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Read the latest complete version of a document.
    pub fn read(&self, name: &DocumentName) -> StoreResult<Vec<u8>> {
        self.backend
            .load(name)?
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    pub fn exists(&self, name: &DocumentName) -> StoreResult<bool> {
        Ok(self.backend.load(name)?.is_some())
    }

    /// Replace a document. Blocks while another writer holds the document.
    pub fn write(&self, name: &DocumentName, bytes: &[u8]) -> StoreResult<()> {
        let handle = self.locks.handle(name);
        let _guard = acquire(&handle);
        self.backend.save(name, bytes)
    }

    /// Delete a document. Returns `true` if it existed.
    pub fn delete(&self, name: &DocumentName) -> StoreResult<bool> {
        let handle = self.locks.handle(name);
        let _guard = acquire(&handle);
        self.backend.remove(name)
    }

    pub fn list(&self) -> StoreResult<Vec<DocumentName>> {
        self.backend.list()
    }

    /// Read-modify-write under the document's lock.
    ///
    /// `f` receives the current bytes (`None` if the document does not
    /// exist) and returns the replacement bytes plus a value handed back to
    /// the caller. If `f` fails nothing is written.
    pub fn update<R, E>(
        &self,
        name: &DocumentName,
        f: impl FnOnce(Option<Vec<u8>>) -> Result<(Vec<u8>, R), E>,
    ) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let handle = self.locks.handle(name);
        let _guard = acquire(&handle);
        let current = self.backend.load(name)?;
        let (bytes, value) = f(current)?;
        self.backend.save(name, &bytes)?;
        debug!(document = %name, len = bytes.len(), "document updated");
        Ok(value)
    }

    /// Run `f` while holding the document's lock, without writing.
    ///
    /// Used by passes that must not interleave with writers, such as
    /// comparing a document against files on disk.
    pub fn with_lock<R>(&self, name: &DocumentName, f: impl FnOnce() -> R) -> R {
        let handle = self.locks.handle(name);
        let _guard = acquire(&handle);
        f()
    }

    // ---- Typed JSON helpers ----

    /// Read and decode a document; `NotFound` if it does not exist.
    pub fn read_json<T: DeserializeOwned>(&self, name: &DocumentName) -> StoreResult<T> {
        let bytes = self.read(name)?;
        decode(name, &bytes)
    }

    /// Read and decode a document, or `T::default()` if it does not exist.
    pub fn read_json_or_default<T>(&self, name: &DocumentName) -> StoreResult<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.backend.load(name)? {
            Some(bytes) => decode(name, &bytes),
            None => Ok(T::default()),
        }
    }

    /// Encode and replace a document.
    pub fn write_json<T: Serialize>(&self, name: &DocumentName, value: &T) -> StoreResult<()> {
        let bytes = encode(name, value)?;
        self.write(name, &bytes)
    }

    /// Typed read-modify-write. A missing document starts as `T::default()`.
    pub fn update_json<T, R, E>(
        &self,
        name: &DocumentName,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Result<R, E>
    where
        T: Serialize + DeserializeOwned + Default,
        E: From<StoreError>,
    {
        self.update(name, |current| {
            let mut value: T = match current {
                Some(bytes) => decode(name, &bytes)?,
                None => T::default(),
            };
            let result = f(&mut value)?;
            let bytes = encode(name, &value)?;
            Ok((bytes, result))
        })
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("backend", &self.backend.backend_name())
            .field("locked_documents", &self.locks.len())
            .finish()
    }
}

fn decode<T: DeserializeOwned>(name: &DocumentName, bytes: &[u8]) -> StoreResult<T> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization {
        document: name.to_string(),
        reason: e.to_string(),
    })
}

fn encode<T: Serialize>(name: &DocumentName, value: &T) -> StoreResult<Vec<u8>> {
    serde_json::to_vec_pretty(value).map_err(|e| StoreError::Serialization {
        document: name.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::Deserialize;
    use std::sync::Arc;
    use std::thread;

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    struct Counter {
        value: u64,
        history: Vec<u64>,
    }

    fn name(s: &str) -> DocumentName {
        DocumentName::new(s).unwrap()
    }

    fn fs_store() -> (tempfile::TempDir, DocumentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open_dir(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn read_missing_is_not_found() {
        let store = DocumentStore::in_memory();
        let err = store.read(&name("albums")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ref n) if n == "albums"));
        assert!(!store.exists(&name("albums")).unwrap());
    }

    #[test]
    fn json_roundtrip_and_default() {
        let (_dir, store) = fs_store();
        let empty: Counter = store.read_json_or_default(&name("counter")).unwrap();
        assert_eq!(empty, Counter::default());

        store
            .write_json(&name("counter"), &Counter { value: 3, history: vec![1, 2, 3] })
            .unwrap();
        let back: Counter = store.read_json(&name("counter")).unwrap();
        assert_eq!(back.value, 3);
    }

    #[test]
    fn corrupt_document_is_serialization_error() {
        let store = DocumentStore::in_memory();
        store.write(&name("counter"), b"{not json").unwrap();
        let err = store.read_json::<Counter>(&name("counter")).unwrap_err();
        assert!(matches!(err, StoreError::Serialization { .. }));
    }

    #[test]
    fn failed_update_writes_nothing() {
        let store = DocumentStore::in_memory();
        store
            .write_json(&name("counter"), &Counter { value: 1, history: vec![] })
            .unwrap();

        let result: Result<(), StoreError> = store.update_json(&name("counter"), |c: &mut Counter| {
            c.value = 99;
            Err(StoreError::NotFound("rejected".into()))
        });
        assert!(result.is_err());
        let back: Counter = store.read_json(&name("counter")).unwrap();
        assert_eq!(back.value, 1);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let (_dir, store) = fs_store();
        let store = Arc::new(store);
        let threads: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..10u64 {
                        store
                            .update_json(&name("counter"), |c: &mut Counter| {
                                c.value += 1;
                                c.history.push(t * 100 + i);
                                Ok::<_, StoreError>(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let counter: Counter = store.read_json(&name("counter")).unwrap();
        assert_eq!(counter.value, 80);
        assert_eq!(counter.history.len(), 80);
    }

    #[test]
    fn readers_never_see_partial_documents() {
        let (_dir, store) = fs_store();
        let store = Arc::new(store);
        let doc = name("counter");
        store.write_json(&doc, &Counter::default()).unwrap();

        let writer = {
            let store = Arc::clone(&store);
            let doc = doc.clone();
            thread::spawn(move || {
                for i in 0..50u64 {
                    let value = Counter { value: i, history: (0..i * 20).collect() };
                    store.write_json(&doc, &value).unwrap();
                }
            })
        };
        let reader = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..200 {
                    let counter: Counter = store.read_json(&doc).unwrap();
                    assert_eq!(counter.history.len() as u64, counter.value * 20);
                }
            })
        };
        writer.join().unwrap();
        reader.join().unwrap();
    }

    #[test]
    fn different_documents_write_independently() {
        let store = Arc::new(DocumentStore::in_memory());
        let held = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store.with_lock(&name("albums"), || {
                    thread::sleep(std::time::Duration::from_millis(50));
                })
            })
        };
        // Not blocked by the held albums lock.
        store.write(&name("site_config"), b"{}").unwrap();
        held.join().unwrap();
        assert!(store.exists(&name("site_config")).unwrap());
    }

    #[test]
    fn delete_and_list() {
        let store = DocumentStore::in_memory();
        store.write(&name("albums"), b"{}").unwrap();
        assert_eq!(store.list().unwrap(), vec![name("albums")]);
        assert!(store.delete(&name("albums")).unwrap());
        assert!(!store.delete(&name("albums")).unwrap());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn concurrent_writes_leave_one_complete_payload(
            payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..2048), 2..6)
        ) {
            let (_dir, store) = fs_store();
            let store = Arc::new(store);
            let handles: Vec<_> = payloads
                .iter()
                .cloned()
                .map(|payload| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || store.write(&name("blob"), &payload).unwrap())
                })
                .collect();
            for h in handles {
                h.join().unwrap();
            }
            let stored = store.read(&name("blob")).unwrap();
            prop_assert!(payloads.contains(&stored));
        }
    }
}
