//! MinIO/S3-compatible storage client
//!
//! Implements [`ObjectStore`] on top of the rust-s3 crate. Conditional writes
//! and deletes are expressed with `If-None-Match` / `If-Match` headers and the
//! object ETag serves as the generation token.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, BucketConfiguration, Region};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::{ObjectAttributes, ObjectStore, StoreError, WriteCondition};
use crate::core::config::StorageConfig;

const USER_METADATA_PREFIX: &str = "x-amz-meta-";

/// MinIO/S3-compatible storage client
pub struct MinIOClient {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    endpoint: String,
}

impl MinIOClient {
    /// Create a new MinIO client from configuration and make sure the bucket exists
    pub async fn new(config: &StorageConfig) -> Result<Self, StoreError> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StoreError::Backend(format!("Failed to create credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| StoreError::Backend(format!("Failed to create bucket handle: {}", e)))?;

        // Use path-style URLs for MinIO (http://endpoint/bucket instead of http://bucket.endpoint)
        bucket.set_path_style();

        let client = Self {
            bucket,
            region,
            credentials,
            endpoint: config.endpoint.clone(),
        };

        client.ensure_bucket_exists().await;

        info!(
            "MinIO client initialized for endpoint: {}, bucket: {}",
            client.endpoint,
            client.bucket.name()
        );

        Ok(client)
    }

    /// Ensure the bucket exists, create if not
    async fn ensure_bucket_exists(&self) {
        let result = Bucket::create_with_path_style(
            &self.bucket.name(),
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await;

        match result {
            Ok(_) => info!("Bucket '{}' created successfully", self.bucket.name()),
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("BucketAlreadyOwnedByYou")
                    || error_str.contains("BucketAlreadyExists")
                    || error_str.contains("already own it")
                {
                    debug!("Bucket '{}' already exists", self.bucket.name());
                } else {
                    warn!(
                        "Could not create bucket '{}': {}. Assuming it exists.",
                        self.bucket.name(),
                        e
                    );
                }
            }
        }
    }

    /// Per-request bucket handle carrying extra headers (conditions, user metadata)
    fn bucket_with_headers(&self, headers: &[(String, String)]) -> Bucket {
        let mut bucket = self.bucket.as_ref().clone();
        for (name, value) in headers {
            bucket.add_header(name, value);
        }
        bucket
    }

    /// Map a non-success status (or a failed request) to a store error
    fn check_status(key: &str, status: u16, action: &str) -> Result<(), StoreError> {
        match status {
            200..=299 => Ok(()),
            404 => Err(StoreError::NotFound(key.to_string())),
            409 | 412 => Err(StoreError::PreconditionFailed(key.to_string())),
            _ => Err(StoreError::Backend(format!(
                "Failed to {} '{}': HTTP {}",
                action, key, status
            ))),
        }
    }

    fn map_error(key: &str, err: S3Error, action: &str) -> StoreError {
        match err {
            S3Error::HttpFailWithBody(status, body) => match Self::check_status(key, status, action)
            {
                Err(StoreError::Backend(msg)) => StoreError::Backend(format!("{} - {}", msg, body)),
                Err(other) => other,
                Ok(()) => StoreError::Backend(format!("Failed to {} '{}': {}", action, key, body)),
            },
            other => StoreError::Backend(format!("Failed to {} '{}': {}", action, key, other)),
        }
    }

    fn parse_last_modified(value: Option<&str>) -> DateTime<Utc> {
        value
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now)
    }
}

#[async_trait]
impl ObjectStore for MinIOClient {
    async fn head_object(&self, key: &str) -> Result<ObjectAttributes, StoreError> {
        let (head, status) = self
            .bucket
            .head_object(key)
            .await
            .map_err(|e| Self::map_error(key, e, "head object"))?;
        Self::check_status(key, status, "head object")?;

        // S3 keeps no separate creation time; last-modified stands in for both
        let modified = Self::parse_last_modified(head.last_modified.as_deref());
        let metadata = head
            .metadata
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| {
                let k = k.to_lowercase();
                let k = k.strip_prefix(USER_METADATA_PREFIX).unwrap_or(&k).to_string();
                (k, v)
            })
            .collect();

        Ok(ObjectAttributes {
            key: key.to_string(),
            content_type: head.content_type.unwrap_or_default(),
            size: head.content_length.unwrap_or(0).max(0) as u64,
            created_at: modified,
            updated_at: modified,
            generation: head.e_tag.unwrap_or_default(),
            metadata,
        })
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let response = self
            .bucket
            .get_object(key)
            .await
            .map_err(|e| Self::map_error(key, e, "download"))?;
        Self::check_status(key, response.status_code(), "download")?;

        debug!("Downloaded '{}' from bucket '{}'", key, self.bucket.name());
        Ok(response.to_vec())
    }

    async fn put_object(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
        metadata: &HashMap<String, String>,
        condition: WriteCondition,
    ) -> Result<(), StoreError> {
        let mut headers: Vec<(String, String)> = metadata
            .iter()
            .map(|(k, v)| (format!("{}{}", USER_METADATA_PREFIX, k), v.clone()))
            .collect();
        match condition {
            WriteCondition::DoesNotExist => headers.push(("If-None-Match".into(), "*".into())),
            WriteCondition::GenerationMatch(generation) => {
                headers.push(("If-Match".into(), generation))
            }
        }

        let response = self
            .bucket_with_headers(&headers)
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(|e| Self::map_error(key, e, "upload"))?;
        Self::check_status(key, response.status_code(), "upload")?;

        debug!("Uploaded '{}' to bucket '{}'", key, self.bucket.name());
        Ok(())
    }

    async fn delete_object(&self, key: &str, generation: &str) -> Result<(), StoreError> {
        let headers = [("If-Match".to_string(), generation.to_string())];
        let response = self
            .bucket_with_headers(&headers)
            .delete_object(key)
            .await
            .map_err(|e| Self::map_error(key, e, "delete"))?;
        Self::check_status(key, response.status_code(), "delete")?;

        debug!("Deleted '{}' from bucket '{}'", key, self.bucket.name());
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let pages = self
            .bucket
            .list(prefix.to_string(), None)
            .await
            .map_err(|e| Self::map_error(prefix, e, "list"))?;

        Ok(pages
            .into_iter()
            .flat_map(|page| page.contents.into_iter().map(|object| object.key))
            .collect())
    }

    async fn presign_get(&self, key: &str, expires_in_secs: u32) -> Result<String, StoreError> {
        self.bucket
            .presign_get(key, expires_in_secs, None)
            .await
            .map_err(|e| {
                StoreError::Backend(format!(
                    "Failed to generate presigned URL for '{}': {}",
                    key, e
                ))
            })
    }
}
