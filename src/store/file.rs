//! JSON-lines file store
//!
//! Each collection is one `<collection>.jsonl` file under a base
//! directory. Writes only ever append a line.

use super::{matches, tail, DurableStore};
use crate::error::{Result, SentinelError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Append-only JSONL store rooted at a directory
pub struct FileStore {
    dir: PathBuf,

    /// Serializes appends so lines never interleave
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a file store rooted at `dir` (created on first append)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Get the base directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn collection_path(&self, collection: &str) -> Result<PathBuf> {
        let valid = !collection.is_empty()
            && collection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(SentinelError::storage(collection, "invalid collection name"));
        }
        Ok(self.dir.join(format!("{collection}.jsonl")))
    }
}

#[async_trait]
impl DurableStore for FileStore {
    async fn append(&self, collection: &str, document: &Value) -> Result<()> {
        let path = self.collection_path(collection)?;
        let mut line = serde_json::to_string(document)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| SentinelError::storage(collection, e))?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| SentinelError::storage(collection, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| SentinelError::storage(collection, e))?;
        file.flush()
            .await
            .map_err(|e| SentinelError::storage(collection, e))?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        filter: &Map<String, Value>,
        limit: usize,
    ) -> Result<Vec<Value>> {
        let path = self.collection_path(collection)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SentinelError::storage(collection, e)),
        };

        let mut found = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(line) {
                Ok(doc) if matches(&doc, filter) => found.push(doc),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        line = lineno + 1,
                        error = %e,
                        "Skipping corrupt store line"
                    );
                }
            }
        }

        Ok(tail(found, limit))
    }

    fn name(&self) -> &str {
        "file"
    }
}
