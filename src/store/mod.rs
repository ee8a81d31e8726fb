//! Document store boundary.
//!
//! Persistence is an external collaborator reached through [`DocumentStore`]:
//! collections of JSON documents addressed by string ids. Typed records cross
//! this boundary through [`encode`] and [`decode`], which reject documents that
//! do not fit the record shape.

use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

mod memory;
pub use memory::MemoryStore;

/// A stored document: a JSON object.
pub type Document = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection}/{id}: malformed document: {reason}")]
    Malformed {
        collection: String,
        id: String,
        reason: String,
    },

    #[error("failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),
}

impl StoreError {
    pub fn malformed(collection: &str, id: &str, reason: impl ToString) -> Self {
        StoreError::Malformed {
            collection: collection.to_string(),
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Asynchronous key-value access to document collections.
pub trait DocumentStore: Send + Sync {
    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<Document>, StoreError>> + Send;

    /// Write `document`. With `merge`, top-level fields are merged into an existing
    /// document instead of replacing it.
    fn set(
        &self,
        collection: &str,
        id: &str,
        document: Document,
        merge: bool,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove a document. Returns whether it existed.
    fn delete(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Every `(id, document)` of `collection` matching `predicate`, ordered by id.
    fn query<P>(
        &self,
        collection: &str,
        predicate: P,
    ) -> impl Future<Output = Result<Vec<(String, Document)>, StoreError>> + Send
    where
        P: Fn(&Document) -> bool + Send;

    /// Store `document` under a freshly generated id and return the id.
    fn add(
        &self,
        collection: &str,
        document: Document,
    ) -> impl Future<Output = Result<String, StoreError>> + Send {
        async move {
            let id = Uuid::new_v4().to_string();
            self.set(collection, &id, document, false).await?;
            Ok(id)
        }
    }
}

/// Predicate matching documents whose `field` equals `value`.
pub fn field_eq(field: &str, value: impl Into<Value>) -> impl Fn(&Document) -> bool + Send {
    let field = field.to_string();
    let value = value.into();
    move |doc: &Document| doc.get(&field) == Some(&value)
}

/// Serialize a record into a document. The record must serialize to a JSON object.
pub fn encode<T: Serialize>(record: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(record).map_err(StoreError::Encode)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Encode(serde::ser::Error::custom(format!(
            "expected an object, encoded {other}"
        )))),
    }
}

/// Deserialize a document into a record, reporting mismatches as [`StoreError::Malformed`].
pub fn decode<T: DeserializeOwned>(
    collection: &str,
    id: &str,
    document: Document,
) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(document))
        .map_err(|e| StoreError::malformed(collection, id, e))
}
