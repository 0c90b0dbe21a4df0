//! # Document Store
//!
//! The jukebox persists two kinds of documents: one `users/{uid}` document per
//! device user holding its credentials, and a flat `tracks` collection that
//! ingestion appends to. This module models the backing store as a set of
//! named collections of JSON documents with the handful of primitives the
//! rest of the crate needs:
//!
//! - point reads (`get`)
//! - merge-writes that only touch the given fields (`set_merge`)
//! - updates of existing documents (`update`)
//! - equality queries (`query`)
//! - atomic batch writes capped at [`MAX_BATCH_WRITES`] operations (`commit`)
//!
//! Timestamps that must be consistent across writers come from
//! [`DocumentStore::server_time`], never from callers.
//!
//! Two backends ship with the crate: [`MemoryStore`] for tests and throwaway
//! runs, and [`FileStore`] which keeps one JSON file per collection in the
//! local data directory.

use std::{fmt, io};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::utils;

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Maximum number of mutations one batch write may carry.
pub const MAX_BATCH_WRITES: usize = 500;

pub const USERS: &str = "users";
pub const TRACKS: &str = "tracks";
pub const ACCOUNTS: &str = "accounts";

pub type Document = Map<String, Value>;

#[derive(Debug)]
pub enum StoreError {
    IoError(io::Error),
    SerdeError(serde_json::Error),
    NotFound { collection: String, id: String },
    BatchTooLarge(usize),
    InvalidDocument(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::IoError(e) => write!(f, "store io error: {}", e),
            StoreError::SerdeError(e) => write!(f, "store serialization error: {}", e),
            StoreError::NotFound { collection, id } => {
                write!(f, "document {}/{} not found", collection, id)
            }
            StoreError::BatchTooLarge(n) => write!(
                f,
                "batch of {} writes exceeds the limit of {}",
                n, MAX_BATCH_WRITES
            ),
            StoreError::InvalidDocument(reason) => write!(f, "invalid document: {}", reason),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::IoError(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::SerdeError(err)
    }
}

/// Equality filter on a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        doc.get(&self.field) == Some(&self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    SetMerge {
        collection: String,
        id: String,
        fields: Document,
    },
}

/// Mutations applied together by [`DocumentStore::commit`].
#[derive(Debug, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a create-or-merge of a new document with a generated id.
    pub fn create(&mut self, collection: &str, fields: Document) -> String {
        let id = utils::generate_document_id();
        self.set_merge(collection, &id, fields);
        id
    }

    pub fn set_merge(&mut self, collection: &str, id: &str, fields: Document) {
        self.ops.push(WriteOp::SetMerge {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Writes `fields` into the document, creating it if needed. Nested
    /// objects are merged key by key; everything else is replaced.
    async fn set_merge(&self, collection: &str, id: &str, fields: Document)
    -> Result<(), StoreError>;

    /// Like `set_merge` but fails with `NotFound` when the document is absent.
    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError>;

    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, StoreError>;

    /// Applies every operation of the batch or none of them. Backends may
    /// refuse batches they cannot apply that way: `FileStore` only takes
    /// batches confined to one collection.
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    fn server_time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deep merge of `fields` into `target`.
pub fn merge_into(target: &mut Document, fields: Document) {
    for (key, value) in fields {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_into(existing, incoming);
            }
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

pub fn to_document<T: serde::Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidDocument(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

pub fn from_document<T: serde::de::DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

pub(crate) fn check_batch(batch: &WriteBatch) -> Result<(), StoreError> {
    if batch.len() > MAX_BATCH_WRITES {
        return Err(StoreError::BatchTooLarge(batch.len()));
    }
    Ok(())
}
