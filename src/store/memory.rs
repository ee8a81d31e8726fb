use std::collections::{BTreeMap, HashMap};

use tokio::sync::RwLock;
use tracing::trace;

use super::{Document, DocumentStore, StoreError};

/// Process-local [`DocumentStore`]. Contents live as long as the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `collection`.
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        document: Document,
        merge: bool,
    ) -> Result<(), StoreError> {
        trace!(collection, id, merge, "set document");
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if merge {
            if let Some(existing) = docs.get_mut(id) {
                existing.extend(document);
                return Ok(());
            }
        }
        docs.insert(id.to_string(), document);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        trace!(collection, id, "delete document");
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(collection)
            .is_some_and(|docs| docs.remove(id).is_some()))
    }

    async fn query<P>(
        &self,
        collection: &str,
        predicate: P,
    ) -> Result<Vec<(String, Document)>, StoreError>
    where
        P: Fn(&Document) -> bool + Send,
    {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .into_iter()
            .flatten()
            .filter(|(_, doc)| predicate(*doc))
            .map(|(id, doc)| (id.clone(), doc.clone()))
            .collect())
    }
}
