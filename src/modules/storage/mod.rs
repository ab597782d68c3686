//! Storage module for file management
//!
//! Defines the object-store capability the file lifecycle manager depends on,
//! with a MinIO/S3-compatible backend and an in-memory backend.

mod memory_store;
mod minio_client;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

pub use memory_store::MemoryObjectStore;
pub use minio_client::MinIOClient;

/// Attributes of a stored object, as reported by the store itself
#[derive(Debug, Clone)]
pub struct ObjectAttributes {
    pub key: String,
    pub content_type: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Opaque version token, changes on every write
    pub generation: String,
    /// User metadata, keys lowercased
    pub metadata: HashMap<String, String>,
}

/// Precondition attached to a write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCondition {
    /// Create-if-absent
    DoesNotExist,
    /// Overwrite only the given version
    GenerationMatch(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object `{0}` not found")]
    NotFound(String),

    #[error("precondition failed for object `{0}`")]
    PreconditionFailed(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Remote blob storage addressed by string keys
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn head_object(&self, key: &str) -> Result<ObjectAttributes, StoreError>;

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    async fn put_object(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
        metadata: &HashMap<String, String>,
        condition: WriteCondition,
    ) -> Result<(), StoreError>;

    /// Delete `key` only if its current generation is `generation`
    async fn delete_object(&self, key: &str, generation: &str) -> Result<(), StoreError>;

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Time-limited GET URL, valid for `expires_in_secs` from now
    async fn presign_get(&self, key: &str, expires_in_secs: u32) -> Result<String, StoreError>;
}
