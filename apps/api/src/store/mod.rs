//! Record Store Adapter — the narrow interface the pipeline uses to persist
//! analysis records and uploaded files.
//!
//! The pipeline never talks to Redis or S3 directly; it sees only this trait,
//! so runs are independently testable against an in-memory implementation.
//! Deletion is "ensure absent": deleting a key or file that does not exist
//! succeeds.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::warn;

use crate::models::record::AnalysisRecord;

pub mod redis_s3;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key-value operation failed: {0}")]
    Kv(String),

    #[error("file operation failed: {0}")]
    File(String),

    #[error("stored record is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Storage operations the orchestrator depends on. Each operation is atomic
/// per key; no transactional guarantee spans multiple keys or files.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn put(&self, key: &str, record: &AnalysisRecord) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<AnalysisRecord>, StoreError>;

    /// Returns all records whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<AnalysisRecord>, StoreError>;

    /// Idempotent: deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Removes every key under `prefix`. Idempotent.
    async fn delete_all(&self, prefix: &str) -> Result<(), StoreError>;

    /// Stores a binary blob and returns the path it can later be deleted by.
    async fn upload_file(&self, name: &str, bytes: Bytes) -> Result<String, StoreError>;

    /// Idempotent: deleting an absent file is not an error.
    async fn delete_file(&self, path: &str) -> Result<(), StoreError>;
}

/// Delete-if-present policy for files: a failed deletion is downgraded to a
/// warning. Used by the delete and wipe paths, where a missing or stuck file
/// must never block removal of the record key.
pub async fn ensure_file_absent(store: &dyn RecordStore, path: &str) {
    if let Err(e) = store.delete_file(path).await {
        warn!("Could not delete file '{path}' (leaving it behind): {e}");
    }
}
