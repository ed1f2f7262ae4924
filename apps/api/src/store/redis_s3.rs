//! Production `RecordStore`: analysis records in Redis, uploaded blobs in
//! S3 / MinIO.
//!
//! Records are stored as JSON strings under `resume:{id}` keys and listed
//! with `SCAN MATCH` (never `KEYS`, which blocks the server). Blobs go under
//! an `uploads/` key space with a generated UUID segment so two uploads of
//! the same filename never collide.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use redis::AsyncCommands;
use tracing::debug;
use uuid::Uuid;

use crate::models::record::AnalysisRecord;
use crate::store::{RecordStore, StoreError};

pub struct RedisS3Store {
    redis: redis::Client,
    s3: aws_sdk_s3::Client,
    bucket: String,
}

impl RedisS3Store {
    pub fn new(redis: redis::Client, s3: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { redis, s3, bucket }
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        self.redis
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Kv(e.to_string()))
    }

    async fn scan_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut con = self.conn().await?;
        let mut keys = Vec::new();
        let mut iter: redis::AsyncIter<String> = con
            .scan_match(format!("{prefix}*"))
            .await
            .map_err(|e| StoreError::Kv(e.to_string()))?;
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        Ok(keys)
    }
}

#[async_trait]
impl RecordStore for RedisS3Store {
    async fn put(&self, key: &str, record: &AnalysisRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        let mut con = self.conn().await?;
        con.set::<_, _, ()>(key, json)
            .await
            .map_err(|e| StoreError::Kv(e.to_string()))
    }

    async fn get(&self, key: &str) -> Result<Option<AnalysisRecord>, StoreError> {
        let mut con = self.conn().await?;
        let value: Option<String> = con
            .get(key)
            .await
            .map_err(|e| StoreError::Kv(e.to_string()))?;
        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<AnalysisRecord>, StoreError> {
        let keys = self.scan_keys(prefix).await?;
        let mut con = self.conn().await?;
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            // A key may vanish between SCAN and GET; skip it.
            let value: Option<String> = con
                .get(&key)
                .await
                .map_err(|e| StoreError::Kv(e.to_string()))?;
            if let Some(json) = value {
                records.push(serde_json::from_str(&json)?);
            }
        }
        Ok(records)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut con = self.conn().await?;
        // DEL of a missing key returns 0, which is fine — ensure absent.
        con.del::<_, ()>(key)
            .await
            .map_err(|e| StoreError::Kv(e.to_string()))
    }

    async fn delete_all(&self, prefix: &str) -> Result<(), StoreError> {
        let keys = self.scan_keys(prefix).await?;
        if keys.is_empty() {
            return Ok(());
        }
        debug!("Deleting {} keys under '{prefix}'", keys.len());
        let mut con = self.conn().await?;
        con.del::<_, ()>(keys)
            .await
            .map_err(|e| StoreError::Kv(e.to_string()))
    }

    async fn upload_file(&self, name: &str, bytes: Bytes) -> Result<String, StoreError> {
        let key = format!("uploads/{}/{}", Uuid::new_v4(), sanitize_filename(name));
        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StoreError::File(e.to_string()))?;
        debug!("Uploaded blob to s3://{}/{key}", self.bucket);
        Ok(key)
    }

    async fn delete_file(&self, path: &str) -> Result<(), StoreError> {
        // S3 DeleteObject on a missing key succeeds, matching the
        // ensure-absent contract.
        self.s3
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| StoreError::File(e.to_string()))?;
        Ok(())
    }
}

/// Keeps uploaded filenames to a conservative character set for S3 keys.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
