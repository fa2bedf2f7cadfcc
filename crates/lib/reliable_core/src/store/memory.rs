//! In-memory document store.
//!
//! Used by tests and by `--in-memory` server runs. Documents live in
//! insertion order per collection behind a single `RwLock`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    Collection, DeleteAck, DocumentStore, Filter, InsertAck, StoreResult, UpdateAck, upsert_seed,
};
use crate::models::document::{Document, DocumentId, Fields, merge};

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `collection`.
    pub async fn len(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .await
            .get(&collection)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        collection: Collection,
        filter: Option<&Filter>,
    ) -> StoreResult<Vec<Document>> {
        let guard = self.collections.read().await;
        let docs = guard.get(&collection).map(Vec::as_slice).unwrap_or_default();
        Ok(docs
            .iter()
            .filter(|doc| filter.is_none_or(|f| f.matches(doc)))
            .cloned()
            .collect())
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> StoreResult<Option<Document>> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&collection)
            .and_then(|docs| docs.iter().find(|doc| filter.matches(doc)))
            .cloned())
    }

    async fn find_by_id(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> StoreResult<Option<Document>> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&collection)
            .and_then(|docs| docs.iter().find(|doc| doc.id == id))
            .cloned())
    }

    async fn insert_one(&self, collection: Collection, fields: Fields) -> StoreResult<InsertAck> {
        let id = DocumentId::generate();
        self.collections
            .write()
            .await
            .entry(collection)
            .or_default()
            .push(Document::new(id, fields));
        Ok(InsertAck {
            acknowledged: true,
            inserted_id: id,
        })
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        set: Fields,
        upsert: bool,
    ) -> StoreResult<UpdateAck> {
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection).or_default();
        if let Some(doc) = docs.iter_mut().find(|doc| filter.matches(doc)) {
            let modified = merge(&mut doc.fields, &set);
            return Ok(UpdateAck::matched(modified));
        }
        if !upsert {
            return Ok(UpdateAck::unmatched());
        }
        let id = DocumentId::generate();
        docs.push(Document::new(id, upsert_seed(filter, &set)));
        Ok(UpdateAck::upserted(id))
    }

    async fn delete_by_id(&self, collection: Collection, id: DocumentId) -> StoreResult<DeleteAck> {
        let mut guard = self.collections.write().await;
        let deleted_count = match guard.get_mut(&collection) {
            Some(docs) => match docs.iter().position(|doc| doc.id == id) {
                Some(idx) => {
                    docs.remove(idx);
                    1
                }
                None => 0,
            },
            None => 0,
        };
        Ok(DeleteAck {
            acknowledged: true,
            deleted_count,
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
