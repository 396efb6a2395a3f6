use std::collections::HashMap;
use std::sync::RwLock;

use crate::backend::DocumentBackend;
use crate::error::StoreResult;
use crate::name::DocumentName;

/// In-memory, HashMap-based document backend.
///
/// Intended for tests and embedding. Each save replaces the whole byte
/// vector under the write lock, so loads never observe partial content.
pub struct InMemoryBackend {
    documents: RwLock<HashMap<DocumentName, Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> usize {
        self.documents.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentBackend for InMemoryBackend {
    fn load(&self, name: &DocumentName) -> StoreResult<Option<Vec<u8>>> {
        let map = self.documents.read().expect("lock poisoned");
        Ok(map.get(name).cloned())
    }

    fn save(&self, name: &DocumentName, bytes: &[u8]) -> StoreResult<()> {
        let mut map = self.documents.write().expect("lock poisoned");
        map.insert(name.clone(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, name: &DocumentName) -> StoreResult<bool> {
        let mut map = self.documents.write().expect("lock poisoned");
        Ok(map.remove(name).is_some())
    }

    fn list(&self) -> StoreResult<Vec<DocumentName>> {
        let map = self.documents.read().expect("lock poisoned");
        let mut names: Vec<DocumentName> = map.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("document_count", &self.len())
            .finish()
    }
}
