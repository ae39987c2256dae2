//! # Document Store Clients
//!
//! Collection/document stores backing
//! [`DirectRemoteStorage`](super::DirectRemoteStorage). Documents are maps
//! of typed [`Field`] values, the shape Firestore stores natively.

mod firestore;
mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};

use super::errors::RemoteResult;

pub use firestore::{FirestoreConfig, FirestoreDocumentStore};
pub use memory::MemoryDocumentStore;

/// A document: field name to value
pub type Document = BTreeMap<String, Field>;

/// Typed document value
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Array(Vec<Field>),
    Map(BTreeMap<String, Field>),
}

impl Field {
    /// Converts a JSON value. Numbers that fit `i64` become integers, all
    /// others doubles.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Field::Null,
            Value::Bool(b) => Field::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Field::Integer(i),
                None => Field::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Field::String(s),
            Value::Array(items) => Field::Array(items.into_iter().map(Field::from_json).collect()),
            Value::Object(map) => Field::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Field::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Converts back to JSON. Timestamps become RFC 3339 strings and
    /// non-finite doubles become `null`.
    pub fn into_json(self) -> Value {
        match self {
            Field::Null => Value::Null,
            Field::Bool(b) => Value::Bool(b),
            Field::Integer(i) => Value::Number(i.into()),
            Field::Double(d) => Number::from_f64(d).map(Value::Number).unwrap_or(Value::Null),
            Field::String(s) => Value::String(s),
            Field::Timestamp(t) => Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Field::Array(items) => Value::Array(items.into_iter().map(Field::into_json).collect()),
            Field::Map(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, v.into_json()))
                    .collect::<Map<_, _>>(),
            ),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Field::Null => "null",
            Field::Bool(_) => "boolean",
            Field::Integer(_) => "integer",
            Field::Double(_) => "double",
            Field::String(_) => "string",
            Field::Timestamp(_) => "timestamp",
            Field::Array(_) => "array",
            Field::Map(_) => "map",
        }
    }
}

/// Backend trait for document storage
#[async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Create or replace `collection/id`
    async fn set(&self, collection: &str, id: &str, document: Document) -> RemoteResult<()>;

    /// Read `collection/id`; `None` when it does not exist
    async fn get(&self, collection: &str, id: &str) -> RemoteResult<Option<Document>>;

    /// Every document of `collection` with its id, ordered by id
    async fn list(&self, collection: &str) -> RemoteResult<Vec<(String, Document)>>;

    /// Delete `collection/id`; returns false when it did not exist
    async fn delete(&self, collection: &str, id: &str) -> RemoteResult<bool>;
}
