//! In-memory document store, used for dry runs and tests.

use async_trait::async_trait;
use std::sync::Mutex;
use tracing::debug;

use crate::errors::WriteError;
use crate::store::{DocumentId, DocumentStore, Fields, auto_id};

/// One document captured by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub collection: String,
    pub id: DocumentId,
    pub fields: Fields,
}

/// Keeps every created document in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<Vec<StoredDocument>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All documents created so far, in insertion order.
    pub fn documents(&self) -> Vec<StoredDocument> {
        self.lock().clone()
    }

    /// Documents of a single collection, in insertion order.
    pub fn collection(&self, name: &str) -> Vec<StoredDocument> {
        self.lock()
            .iter()
            .filter(|doc| doc.collection == name)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<StoredDocument>> {
        // A poisoned lock still holds a consistent Vec.
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_record(
        &self,
        collection: &str,
        fields: &Fields,
    ) -> Result<DocumentId, WriteError> {
        let id = auto_id(&mut rand::thread_rng());
        debug!(collection, id = %id, "stored document in memory");
        self.lock().push(StoredDocument {
            collection: collection.to_string(),
            id: id.clone(),
            fields: fields.clone(),
        });
        Ok(id)
    }
}
