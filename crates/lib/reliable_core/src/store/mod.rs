//! Resource store gateway.
//!
//! A thin accessor over the four document collections. Backends implement
//! [`DocumentStore`]; handlers go through [`StoreGateway`], which hands out a
//! per-collection [`CollectionRef`].
//!
//! Queries are either unfiltered or a single-field equality [`Filter`].

pub mod memory;
pub mod postgres;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::document::{Document, DocumentId, Fields, InvalidIdentifier};

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

/// The logical collections in the `reliable_parts` namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Parts,
    Orders,
    Users,
    Reviews,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Parts,
        Collection::Orders,
        Collection::Users,
        Collection::Reviews,
    ];

    /// Collection (and table) name.
    pub fn name(self) -> &'static str {
        match self {
            Collection::Parts => "parts",
            Collection::Orders => "orders",
            Collection::Users => "users",
            Collection::Reviews => "reviews",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Single-field equality filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        doc.fields.get(&self.field) == Some(&self.value)
    }
}

/// Store gateway errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    InvalidIdentifier(#[from] InvalidIdentifier),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(e.to_string()),
            _ => StoreError::Backend(e.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Acknowledgment of a single-document insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertAck {
    pub acknowledged: bool,
    pub inserted_id: DocumentId,
}

/// Acknowledgment of a single-document update or upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAck {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<DocumentId>,
    pub upserted_count: u64,
}

impl UpdateAck {
    pub fn matched(modified: bool) -> Self {
        Self {
            acknowledged: true,
            matched_count: 1,
            modified_count: u64::from(modified),
            upserted_id: None,
            upserted_count: 0,
        }
    }

    pub fn upserted(id: DocumentId) -> Self {
        Self {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some(id),
            upserted_count: 1,
        }
    }

    pub fn unmatched() -> Self {
        Self {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_id: None,
            upserted_count: 0,
        }
    }
}

/// Acknowledgment of a single-document delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAck {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

/// Document store backend.
///
/// Every operation touches at most one document except `find`. Atomicity is
/// per document only.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents in `collection` matching `filter`, in insertion order.
    async fn find(&self, collection: Collection, filter: Option<&Filter>)
    -> StoreResult<Vec<Document>>;

    /// First document matching `filter`.
    async fn find_one(&self, collection: Collection, filter: &Filter)
    -> StoreResult<Option<Document>>;

    async fn find_by_id(&self, collection: Collection, id: DocumentId)
    -> StoreResult<Option<Document>>;

    /// Insert a document with a freshly assigned identifier.
    async fn insert_one(&self, collection: Collection, fields: Fields) -> StoreResult<InsertAck>;

    /// Apply `set` to the first document matching `filter`.
    ///
    /// With `upsert`, a missing document is created from the filter field
    /// plus `set`.
    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        set: Fields,
        upsert: bool,
    ) -> StoreResult<UpdateAck>;

    async fn delete_by_id(&self, collection: Collection, id: DocumentId) -> StoreResult<DeleteAck>;

    /// Connectivity check.
    async fn ping(&self) -> StoreResult<()>;
}

/// Injected handle to the document store, cheap to clone.
#[derive(Clone)]
pub struct StoreGateway {
    backend: Arc<dyn DocumentStore>,
}

impl StoreGateway {
    pub fn new(backend: Arc<dyn DocumentStore>) -> Self {
        Self { backend }
    }

    /// Gateway over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn collection(&self, collection: Collection) -> CollectionRef<'_> {
        CollectionRef {
            backend: self.backend.as_ref(),
            collection,
        }
    }

    pub fn parts(&self) -> CollectionRef<'_> {
        self.collection(Collection::Parts)
    }

    pub fn orders(&self) -> CollectionRef<'_> {
        self.collection(Collection::Orders)
    }

    pub fn users(&self) -> CollectionRef<'_> {
        self.collection(Collection::Users)
    }

    pub fn reviews(&self) -> CollectionRef<'_> {
        self.collection(Collection::Reviews)
    }

    pub async fn ping(&self) -> StoreResult<()> {
        self.backend.ping().await
    }
}

impl fmt::Debug for StoreGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreGateway").finish_non_exhaustive()
    }
}

/// Operations bound to one collection.
#[derive(Clone, Copy)]
pub struct CollectionRef<'a> {
    backend: &'a dyn DocumentStore,
    collection: Collection,
}

impl CollectionRef<'_> {
    pub async fn find_all(&self) -> StoreResult<Vec<Document>> {
        self.backend.find(self.collection, None).await
    }

    pub async fn find(&self, filter: &Filter) -> StoreResult<Vec<Document>> {
        self.backend.find(self.collection, Some(filter)).await
    }

    pub async fn find_one(&self, filter: &Filter) -> StoreResult<Option<Document>> {
        self.backend.find_one(self.collection, filter).await
    }

    /// Look up by a raw identifier string.
    ///
    /// Fails with `InvalidIdentifier` when `raw` is malformed and `NotFound`
    /// when no document carries it.
    pub async fn get(&self, raw: &str) -> StoreResult<Document> {
        let id: DocumentId = raw.parse()?;
        self.backend
            .find_by_id(self.collection, id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("{} {id}", self.collection)))
    }

    pub async fn insert_one(&self, fields: Fields) -> StoreResult<InsertAck> {
        self.backend.insert_one(self.collection, fields).await
    }

    pub async fn update_one(&self, filter: &Filter, set: Fields) -> StoreResult<UpdateAck> {
        self.backend
            .update_one(self.collection, filter, set, false)
            .await
    }

    pub async fn upsert_one(&self, filter: &Filter, set: Fields) -> StoreResult<UpdateAck> {
        self.backend
            .update_one(self.collection, filter, set, true)
            .await
    }

    /// Delete by a raw identifier string. A well-formed but unknown
    /// identifier deletes nothing.
    pub async fn delete(&self, raw: &str) -> StoreResult<DeleteAck> {
        let id: DocumentId = raw.parse()?;
        self.backend.delete_by_id(self.collection, id).await
    }
}

/// Build the document created by an upsert that matched nothing.
pub(crate) fn upsert_seed(filter: &Filter, set: &Fields) -> Fields {
    let mut fields = Fields::new();
    fields.insert(filter.field.clone(), filter.value.clone());
    crate::models::document::merge(&mut fields, set);
    fields
}
