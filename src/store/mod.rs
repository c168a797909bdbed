//! Durable store contract consumed by the pipeline
//!
//! Backends persist schemaless JSON documents into named collections.
//! From the pipeline's point of view a store is append-only: documents
//! are written once and read back, never updated.

use crate::error::Result;
use crate::types::EventRecord;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Collection holding persisted event records
pub const LOG_COLLECTION: &str = "log";

/// Append/read persistence backend
///
/// Both operations fail with `SentinelError::StorageUnavailable` when the
/// backing store cannot be reached.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Append one document to a collection
    async fn append(&self, collection: &str, document: &Value) -> Result<()>;

    /// Read documents whose top-level fields equal every entry in `filter`
    ///
    /// Returns at most `limit` of the most recent matches, oldest first.
    /// An empty filter matches everything; no matches is an empty `Vec`.
    async fn query(
        &self,
        collection: &str,
        filter: &Map<String, Value>,
        limit: usize,
    ) -> Result<Vec<Value>>;

    /// Backend name (e.g., "memory", "file")
    fn name(&self) -> &str;
}

/// Check a document against an equality filter
pub(crate) fn matches(document: &Value, filter: &Map<String, Value>) -> bool {
    filter
        .iter()
        .all(|(key, expected)| document.get(key) == Some(expected))
}

/// Keep the last `limit` items, preserving order
pub(crate) fn tail(mut items: Vec<Value>, limit: usize) -> Vec<Value> {
    if items.len() > limit {
        items.drain(..items.len() - limit);
    }
    items
}

/// Typed view of the event log collection
#[derive(Clone)]
pub struct LogStore {
    store: Arc<dyn DurableStore>,
}

impl LogStore {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self { store }
    }

    /// Persist one event record
    pub async fn append(&self, record: &EventRecord) -> Result<()> {
        let document = record.to_document()?;
        self.store.append(LOG_COLLECTION, &document).await
    }

    /// Most recent records, oldest first
    ///
    /// Documents that no longer decode as records are skipped.
    pub async fn recent(&self, limit: usize) -> Result<Vec<EventRecord>> {
        let documents = self.store.query(LOG_COLLECTION, &Map::new(), limit).await?;
        let records = documents
            .into_iter()
            .filter_map(|doc| match EventRecord::from_document(doc) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable log document");
                    None
                }
            })
            .collect();
        Ok(records)
    }

    /// Underlying backend
    pub fn inner(&self) -> &Arc<dyn DurableStore> {
        &self.store
    }
}
