//! In-memory object store
//!
//! Backs local development (`STORAGE_BACKEND=memory`) and tests. Honors the
//! same conditional write/delete contract as the S3 backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use super::{ObjectAttributes, ObjectStore, StoreError, WriteCondition};

struct StoredObject {
    data: Vec<u8>,
    content_type: String,
    metadata: HashMap<String, String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    generation: u64,
}

pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, StoredObject>>,
    next_generation: AtomicU64,
    /// Base used when minting signed URLs
    base_url: String,
}

impl MemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
            base_url: base_url.into(),
        }
    }

    fn generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn head_object(&self, key: &str) -> Result<ObjectAttributes, StoreError> {
        let objects = self.objects.read().await;
        let object = objects
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        Ok(ObjectAttributes {
            key: key.to_string(),
            content_type: object.content_type.clone(),
            size: object.data.len() as u64,
            created_at: object.created_at,
            updated_at: object.updated_at,
            generation: object.generation.to_string(),
            metadata: object.metadata.clone(),
        })
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let objects = self.objects.read().await;
        objects
            .get(key)
            .map(|object| object.data.clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn put_object(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
        metadata: &HashMap<String, String>,
        condition: WriteCondition,
    ) -> Result<(), StoreError> {
        let mut objects = self.objects.write().await;
        let now = Utc::now();

        let created_at = match (&condition, objects.get(key)) {
            (WriteCondition::DoesNotExist, None) => now,
            (WriteCondition::GenerationMatch(expected), Some(current))
                if current.generation.to_string() == *expected =>
            {
                current.created_at
            }
            _ => return Err(StoreError::PreconditionFailed(key.to_string())),
        };

        let object = StoredObject {
            data: data.to_vec(),
            content_type: content_type.to_string(),
            metadata: metadata
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.clone()))
                .collect(),
            created_at,
            updated_at: now,
            generation: self.generation(),
        };
        objects.insert(key.to_string(), object);
        Ok(())
    }

    async fn delete_object(&self, key: &str, generation: &str) -> Result<(), StoreError> {
        let mut objects = self.objects.write().await;
        match objects.get(key) {
            None => Err(StoreError::NotFound(key.to_string())),
            Some(current) if current.generation.to_string() != generation => {
                Err(StoreError::PreconditionFailed(key.to_string()))
            }
            Some(_) => {
                objects.remove(key);
                Ok(())
            }
        }
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let objects = self.objects.read().await;
        let mut keys: Vec<String> = objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn presign_get(&self, key: &str, expires_in_secs: u32) -> Result<String, StoreError> {
        let expires_at = Utc::now().timestamp() + i64::from(expires_in_secs);
        Ok(format!(
            "{}/{}?X-Expires={}",
            self.base_url.trim_end_matches('/'),
            key,
            expires_at
        ))
    }
}
