//! Schema-less document model shared by every collection.
//!
//! A document is a store-assigned identifier plus an arbitrary JSON object.
//! On the wire the identifier is flattened into the object under `_id`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Arbitrary document attributes.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Reserved key carrying the document identifier.
pub const ID_FIELD: &str = "_id";

/// A string that does not parse as a document identifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid identifier: {0}")]
pub struct InvalidIdentifier(pub String);

/// Opaque, store-assigned document identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Allocate a new identifier. UUIDv7 keeps ids in creation order for
    /// stores that sort by primary key.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for DocumentId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for DocumentId {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| InvalidIdentifier(s.to_string()))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Document {
    pub fn new(id: DocumentId, fields: Fields) -> Self {
        Self {
            id,
            fields: sanitize(fields),
        }
    }
}

/// Strip the reserved `_id` key; identifiers are never client-assigned.
pub fn sanitize(mut fields: Fields) -> Fields {
    fields.remove(ID_FIELD);
    fields
}

/// Apply `set` onto `target` key by key (`$set` semantics).
///
/// Returns whether any value changed.
pub fn merge(target: &mut Fields, set: &Fields) -> bool {
    let mut changed = false;
    for (key, value) in set {
        if key == ID_FIELD {
            continue;
        }
        if target.get(key) != Some(value) {
            target.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    changed
}
