use chrono::Utc;
use futures::{future, stream, StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::expiry_policy::{validate_expiry, ExpiryPolicyError};
use crate::features::auth::guest;
use crate::features::files::models::{
    is_content_type_accepted, metadata, object_path, FileRecord, LifecycleMetadata,
    MetadataError, ObjectPathError,
};
use crate::modules::storage::{ObjectAttributes, ObjectStore, StoreError, WriteCondition};
use crate::shared::validation::FILE_NAME_REGEX;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("file `{0}` not found")]
    NotFound(String),

    #[error("file `{0}` not found or not public")]
    NotPublic(String),

    #[error("file `{0}` already exists")]
    AlreadyExists(String),

    #[error("file `{0}` was modified concurrently")]
    ModifiedConcurrently(String),

    #[error("file body is empty")]
    EmptyBody,

    #[error("invalid file name `{0}`")]
    InvalidFileName(String),

    #[error("unsupported content type `{0}`")]
    UnsupportedContentType(String),

    #[error(transparent)]
    InvalidMetadata(#[from] MetadataError),

    #[error(transparent)]
    ExpiryPolicy(#[from] ExpiryPolicyError),

    #[error("content type `{requested}` does not match original `{original}`")]
    MismatchContentType { original: String, requested: String },

    #[error("no files to delete under `{0}`")]
    EmptyData(String),

    #[error(transparent)]
    InvalidPath(#[from] ObjectPathError),

    #[error("stored metadata of `{key}` is corrupt: {source}")]
    CorruptMetadata { key: String, source: MetadataError },

    #[error("storage operation timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for FileError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => FileError::NotFound(key),
            StoreError::PreconditionFailed(key) => FileError::ModifiedConcurrently(key),
            other => FileError::Store(other),
        }
    }
}

/// Body and headers of an upload or update request
#[derive(Debug, Clone, Copy)]
pub struct FilePayload<'a> {
    pub content_type: Option<&'a str>,
    /// Request headers carrying the lifecycle metadata
    pub headers: &'a HashMap<String, String>,
    pub body: &'a [u8],
}

/// Optional listing predicate; `limit` applies after filtering
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    /// Exact byte size
    pub size: Option<u64>,
    /// Substring of the filename
    pub name: Option<String>,
    /// Substring of the content type
    pub content_type: Option<String>,
    pub limit: Option<usize>,
}

impl FileFilter {
    fn matches(&self, record: &FileRecord) -> bool {
        if let Some(size) = self.size.filter(|s| *s > 0) {
            if record.size != size {
                return false;
            }
        }

        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            let filename = object_path::split(&record.name)
                .map(|(_, filename)| filename)
                .unwrap_or(&record.name);
            if !filename.contains(name) {
                return false;
            }
        }

        if let Some(content_type) = self.content_type.as_deref().filter(|t| !t.is_empty()) {
            if !record.content_type.contains(content_type) {
                return false;
            }
        }

        true
    }

    fn apply(&self, records: Vec<FileRecord>) -> Vec<FileRecord> {
        let matching = records.into_iter().filter(|r| self.matches(r));
        match self.limit.filter(|l| *l > 0) {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }
}

/// File lifecycle manager
///
/// Every operation is bounded by the service deadline; bulk operations fan
/// out over at most `max_concurrency` store calls at a time.
#[derive(Clone)]
pub struct FileService {
    store: Arc<dyn ObjectStore>,
    public_base_url: String,
    timeout: Duration,
    max_concurrency: usize,
}

impl FileService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        public_base_url: impl Into<String>,
        timeout: Duration,
        max_concurrency: usize,
    ) -> Self {
        Self {
            store,
            public_base_url: public_base_url.into(),
            timeout,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Handle sharing the same store with a different deadline
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }

    /// Strip the owner from `name` and point public files at their public route
    pub fn format(&self, record: FileRecord) -> FileRecord {
        object_path::format_record(record, &self.public_base_url)
    }

    async fn run<T>(
        &self,
        operation: impl Future<Output = Result<T, FileError>>,
    ) -> Result<T, FileError> {
        tokio::time::timeout(self.timeout, operation)
            .await
            .map_err(|_| FileError::Timeout(self.timeout))?
    }

    async fn attributes(
        &self,
        key: &str,
    ) -> Result<(ObjectAttributes, LifecycleMetadata), FileError> {
        let attrs = self.store.head_object(key).await?;
        let lifecycle =
            metadata::decode(&attrs.metadata).map_err(|source| FileError::CorruptMetadata {
                key: key.to_string(),
                source,
            })?;
        Ok((attrs, lifecycle))
    }

    /// Attributes plus a signed URL minted from now
    async fn fetch(&self, key: &str) -> Result<FileRecord, FileError> {
        let (attrs, lifecycle) = self.attributes(key).await?;
        let expires_in = u32::try_from(lifecycle.private_url_expires).unwrap_or(u32::MAX);
        let url = self.store.presign_get(key, expires_in).await?;

        debug!("Fetched '{}' ({} bytes)", key, attrs.size);

        Ok(FileRecord {
            name: attrs.key,
            url,
            content_type: attrs.content_type,
            lifecycle,
            uploaded_at: attrs.created_at.timestamp_millis(),
            updated_at: attrs.updated_at.timestamp_millis(),
            size: attrs.size,
        })
    }

    pub async fn get_file(&self, owner: &str, filename: &str) -> Result<FileRecord, FileError> {
        let key = object_path::join(owner, filename)?;
        self.run(self.fetch(&key)).await
    }

    /// List every file of `owner`, fetching each one and applying `filter`
    ///
    /// Any fetch failure aborts the whole listing.
    pub async fn list_files(
        &self,
        owner: &str,
        filter: &FileFilter,
    ) -> Result<Vec<FileRecord>, FileError> {
        self.run(async {
            let keys = self.owner_keys(owner).await?;
            let records: Vec<FileRecord> = stream::iter(keys)
                .map(|key| async move { self.fetch(&key).await })
                .buffered(self.max_concurrency)
                .try_collect()
                .await?;

            Ok(filter.apply(records))
        })
        .await
    }

    pub async fn count_files(&self, owner: &str) -> Result<usize, FileError> {
        self.run(async { Ok(self.owner_keys(owner).await?.len()) })
            .await
    }

    /// Create `owner/filename`; fails if the key already exists
    pub async fn upload_file(
        &self,
        owner: &str,
        filename: &str,
        payload: FilePayload<'_>,
    ) -> Result<FileRecord, FileError> {
        if payload.body.is_empty() {
            return Err(FileError::EmptyBody);
        }

        if !FILE_NAME_REGEX.is_match(filename) {
            return Err(FileError::InvalidFileName(filename.to_string()));
        }

        let content_type = payload.content_type.unwrap_or_default();
        if !is_content_type_accepted(content_type) {
            return Err(FileError::UnsupportedContentType(content_type.to_string()));
        }

        let lifecycle = metadata::decode(payload.headers)?;
        validate_expiry(lifecycle.private_url_expires, lifecycle.auto_delete_at)?;

        let key = object_path::join(owner, filename)?;

        self.run(async {
            self.store
                .put_object(
                    &key,
                    payload.body,
                    content_type,
                    &metadata::encode(&lifecycle),
                    WriteCondition::DoesNotExist,
                )
                .await
                .map_err(|e| match e {
                    StoreError::PreconditionFailed(_) => {
                        FileError::AlreadyExists(filename.to_string())
                    }
                    other => other.into(),
                })?;

            info!(
                "File uploaded: key={}, size={}, public={}",
                key,
                payload.body.len(),
                lifecycle.is_public
            );

            self.fetch(&key).await
        })
        .await
    }

    /// Replace the content and lifecycle of an existing file
    ///
    /// The overwrite only succeeds against the version that was checked, so
    /// a concurrent change surfaces as [`FileError::ModifiedConcurrently`].
    pub async fn update_file(
        &self,
        owner: &str,
        filename: &str,
        payload: FilePayload<'_>,
    ) -> Result<FileRecord, FileError> {
        if payload.body.is_empty() {
            return Err(FileError::EmptyBody);
        }

        let key = object_path::join(owner, filename)?;

        self.run(async {
            let current = self.store.head_object(&key).await?;

            let requested = payload.content_type.unwrap_or_default();
            if requested.is_empty() || !current.content_type.contains(requested) {
                return Err(FileError::MismatchContentType {
                    original: current.content_type,
                    requested: requested.to_string(),
                });
            }

            let lifecycle = metadata::decode(payload.headers)?;
            validate_expiry(lifecycle.private_url_expires, lifecycle.auto_delete_at)?;

            self.store
                .put_object(
                    &key,
                    payload.body,
                    &current.content_type,
                    &metadata::encode(&lifecycle),
                    WriteCondition::GenerationMatch(current.generation.clone()),
                )
                .await?;

            info!("File updated: key={}, size={}", key, payload.body.len());

            self.fetch(&key).await
        })
        .await
    }

    pub async fn delete_file(&self, owner: &str, filename: &str) -> Result<(), FileError> {
        let key = object_path::join(owner, filename)?;
        self.run(async {
            let attrs = self.store.head_object(&key).await?;
            self.store.delete_object(&key, &attrs.generation).await?;
            info!("File deleted: key={}", key);
            Ok(())
        })
        .await
    }

    /// Delete every file of `owner`; an owner with no files is an error
    pub async fn delete_all_files(&self, owner: &str) -> Result<usize, FileError> {
        self.run(async {
            let keys = self.owner_keys(owner).await?;
            if keys.is_empty() {
                return Err(FileError::EmptyData(owner.to_string()));
            }

            let count = keys.len();
            stream::iter(keys.into_iter().map(Ok::<_, FileError>))
                .try_for_each_concurrent(self.max_concurrency, |key| async move {
                    match self.store.head_object(&key).await {
                        Ok(attrs) => match self.store.delete_object(&key, &attrs.generation).await
                        {
                            Ok(()) | Err(StoreError::NotFound(_)) => Ok(()),
                            Err(e) => Err(e.into()),
                        },
                        // Already gone
                        Err(StoreError::NotFound(_)) => Ok(()),
                        Err(e) => Err(e.into()),
                    }
                })
                .await?;

            info!("Deleted all {} files of {}", count, owner);
            Ok(count)
        })
        .await
    }

    /// Public download: absent and private files are indistinguishable
    pub async fn read_public(
        &self,
        owner: &str,
        filename: &str,
    ) -> Result<(FileRecord, Vec<u8>), FileError> {
        let key = object_path::join(owner, filename)?;
        let not_public = || FileError::NotPublic(filename.to_string());

        self.run(async {
            let (attrs, lifecycle) = match self.attributes(&key).await {
                Ok(found) => found,
                Err(FileError::NotFound(_)) => return Err(not_public()),
                Err(e) => return Err(e),
            };
            if !lifecycle.is_public {
                return Err(not_public());
            }

            let data = match self.store.get_object(&key).await {
                Ok(data) => data,
                Err(StoreError::NotFound(_)) => return Err(not_public()),
                Err(e) => return Err(e.into()),
            };

            let record = FileRecord {
                name: attrs.key,
                url: String::new(),
                content_type: attrs.content_type,
                lifecycle,
                uploaded_at: attrs.created_at.timestamp_millis(),
                updated_at: attrs.updated_at.timestamp_millis(),
                size: attrs.size,
            };
            Ok((record, data))
        })
        .await
    }

    /// Best-effort removal of every file of `owner` whose deadline has passed
    ///
    /// Failures are logged and never returned. Returns the number of files removed.
    pub async fn purge_expired(&self, owner: &str) -> usize {
        let now_ms = Utc::now().timestamp_millis();

        let result = self
            .run(async {
                let keys = self.owner_keys(owner).await?;
                let expired: Vec<ObjectAttributes> = stream::iter(keys)
                    .map(|key| async move {
                        match self.attributes(&key).await {
                            Ok((attrs, lifecycle)) if lifecycle.is_expired_at(now_ms) => {
                                Some(attrs)
                            }
                            Ok(_) => None,
                            Err(e) => {
                                warn!("Skipping '{}' during purge: {}", key, e);
                                None
                            }
                        }
                    })
                    .buffer_unordered(self.max_concurrency)
                    .filter_map(future::ready)
                    .collect()
                    .await;

                Ok(self.delete_best_effort(expired).await)
            })
            .await;

        match result {
            Ok(count) => {
                if count > 0 {
                    info!("Purged {} expired files of {}", count, owner);
                }
                count
            }
            Err(e) => {
                warn!("Failed to purge expired files of {}: {}", owner, e);
                0
            }
        }
    }

    /// Best-effort removal of a guest account whose embedded expiry has passed
    ///
    /// Non-guest owners and live guest accounts are left untouched.
    pub async fn purge_anonymous_account(&self, owner: &str) -> usize {
        let Some(expires_at) = guest::username_expires_at(owner) else {
            return 0;
        };
        if expires_at > Utc::now().timestamp_millis() {
            return 0;
        }

        let result = self
            .run(async {
                let keys = self.owner_keys(owner).await?;
                let attrs: Vec<ObjectAttributes> = stream::iter(keys)
                    .map(|key| async move { self.store.head_object(&key).await.ok() })
                    .buffer_unordered(self.max_concurrency)
                    .filter_map(future::ready)
                    .collect()
                    .await;

                Ok(self.delete_best_effort(attrs).await)
            })
            .await;

        match result {
            Ok(count) => {
                if count > 0 {
                    info!("Purged expired guest account {} ({} files)", owner, count);
                }
                count
            }
            Err(e) => {
                warn!("Failed to purge guest account {}: {}", owner, e);
                0
            }
        }
    }

    async fn owner_keys(&self, owner: &str) -> Result<Vec<String>, FileError> {
        let keys = self
            .store
            .list_keys(&object_path::owner_prefix(owner))
            .await?;

        Ok(keys
            .into_iter()
            .filter(|key| match object_path::split(key) {
                Ok(_) => true,
                Err(e) => {
                    warn!("Ignoring listed key: {}", e);
                    false
                }
            })
            .collect())
    }

    async fn delete_best_effort(&self, objects: Vec<ObjectAttributes>) -> usize {
        stream::iter(objects)
            .map(|attrs| async move {
                match self.store.delete_object(&attrs.key, &attrs.generation).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Failed to delete '{}': {}", attrs.key, e);
                        false
                    }
                }
            })
            .buffer_unordered(self.max_concurrency)
            .filter(|deleted| future::ready(*deleted))
            .count()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::storage::MemoryObjectStore;
    use crate::shared::constants::{
        HEADER_AUTO_DELETE_AT, HEADER_IS_PUBLIC, HEADER_PRIVATE_URL_EXPIRES,
    };
    use async_trait::async_trait;
    use tokio_test::assert_ok;

    const BASE_URL: &str = "http://localhost:3000";

    fn service_with(store: Arc<dyn ObjectStore>) -> FileService {
        FileService::new(store, BASE_URL, Duration::from_secs(5), 4)
    }

    fn service() -> (Arc<MemoryObjectStore>, FileService) {
        let store = Arc::new(MemoryObjectStore::new("http://memory.local/bucket"));
        (store.clone(), service_with(store))
    }

    fn lifecycle_headers(auto_delete_in_ms: i64, url_expires: u64, is_public: bool) -> HashMap<String, String> {
        let auto_delete_at = Utc::now().timestamp_millis() + auto_delete_in_ms;
        HashMap::from([
            (HEADER_AUTO_DELETE_AT.to_string(), auto_delete_at.to_string()),
            (HEADER_PRIVATE_URL_EXPIRES.to_string(), url_expires.to_string()),
            (HEADER_IS_PUBLIC.to_string(), is_public.to_string()),
        ])
    }

    fn payload<'a>(
        content_type: &'a str,
        headers: &'a HashMap<String, String>,
        body: &'a [u8],
    ) -> FilePayload<'a> {
        FilePayload {
            content_type: Some(content_type),
            headers,
            body,
        }
    }

    async fn seed_expired(store: &MemoryObjectStore, key: &str) {
        let meta = metadata::encode(&LifecycleMetadata {
            auto_delete_at: Utc::now().timestamp_millis() - 1_000,
            private_url_expires: 10,
            is_public: false,
        });
        store
            .put_object(key, b"old", "text/plain", &meta, WriteCondition::DoesNotExist)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upload_then_get() {
        let (_, service) = service();
        let headers = lifecycle_headers(60_000, 10, true);

        let uploaded = service
            .upload_file("alice", "report.txt", payload("text/plain", &headers, b"hello"))
            .await
            .unwrap();
        assert_eq!(uploaded.name, "alice/report.txt");
        assert_eq!(uploaded.size, 5);
        assert!(uploaded.lifecycle.is_public);

        let fetched = service.get_file("alice", "report.txt").await.unwrap();
        let formatted = service.format(fetched);
        assert_eq!(formatted.name, "report.txt");
        assert!(formatted.url.contains("/alice/public/report.txt"));
    }

    #[tokio::test]
    async fn test_concurrent_uploads_are_exclusive() {
        let (_, service) = service();
        let headers = lifecycle_headers(60_000, 10, false);

        let (first, second) = tokio::join!(
            service.upload_file("alice", "a.txt", payload("text/plain", &headers, b"one")),
            service.upload_file("alice", "a.txt", payload("text/plain", &headers, b"two")),
        );

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(FileError::AlreadyExists(_))))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_upload_checks_in_order() {
        let (_, service) = service();
        let good = lifecycle_headers(60_000, 10, false);

        let empty = service
            .upload_file("alice", "bad", payload("application/x-msdownload", &good, b""))
            .await;
        assert!(matches!(empty, Err(FileError::EmptyBody)));

        let bad_name = service
            .upload_file("alice", "example", payload("application/x-msdownload", &good, b"x"))
            .await;
        assert!(matches!(bad_name, Err(FileError::InvalidFileName(_))));

        let bad_type = service
            .upload_file("alice", "a.exe", payload("application/x-msdownload", &good, b"x"))
            .await;
        assert!(matches!(bad_type, Err(FileError::UnsupportedContentType(_))));

        let no_headers = HashMap::new();
        let bad_meta = service
            .upload_file("alice", "a.txt", payload("text/plain", &no_headers, b"x"))
            .await;
        assert!(matches!(bad_meta, Err(FileError::InvalidMetadata(_))));

        let outliving = lifecycle_headers(5_000, 10, false);
        let bad_policy = service
            .upload_file("alice", "a.txt", payload("text/plain", &outliving, b"x"))
            .await;
        assert!(matches!(
            bad_policy,
            Err(FileError::ExpiryPolicy(ExpiryPolicyError::ExpiryOrder))
        ));
    }

    #[tokio::test]
    async fn test_update_replaces_content() {
        let (_, service) = service();
        let headers = lifecycle_headers(60_000, 10, false);
        service
            .upload_file("alice", "a.txt", payload("text/plain", &headers, b"one"))
            .await
            .unwrap();

        let new_headers = lifecycle_headers(120_000, 20, true);
        let updated = service
            .update_file("alice", "a.txt", payload("text/plain", &new_headers, b"second"))
            .await
            .unwrap();

        assert_eq!(updated.name, "alice/a.txt");
        assert_eq!(updated.size, 6);
        assert_eq!(updated.lifecycle.private_url_expires, 20);
        assert!(updated.lifecycle.is_public);
        assert_eq!(updated.content_type, "text/plain");
    }

    #[tokio::test]
    async fn test_update_rejects_content_type_mismatch() {
        let (_, service) = service();
        let headers = lifecycle_headers(60_000, 10, false);
        service
            .upload_file("alice", "a.txt", payload("text/plain", &headers, b"one"))
            .await
            .unwrap();

        let result = service
            .update_file("alice", "a.txt", payload("text/xml", &headers, b"<a/>"))
            .await;
        assert!(matches!(result, Err(FileError::MismatchContentType { .. })));

        let missing = service
            .update_file("alice", "missing.txt", payload("text/plain", &headers, b"x"))
            .await;
        assert!(matches!(missing, Err(FileError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_filters_and_limit() {
        let (_, service) = service();
        let headers = lifecycle_headers(60_000, 10, false);
        for (name, content_type, body) in [
            ("notes.txt", "text/plain", &b"1234"[..]),
            ("page.html", "text/html", &b"12"[..]),
            ("other.txt", "text/plain", &b"12"[..]),
        ] {
            service
                .upload_file("alice", name, payload(content_type, &headers, body))
                .await
                .unwrap();
        }
        service
            .upload_file("alice2", "notes.txt", payload("text/plain", &headers, b"x"))
            .await
            .unwrap();

        let all = service.list_files("alice", &FileFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let by_type = FileFilter {
            content_type: Some("plain".into()),
            ..Default::default()
        };
        assert_eq!(service.list_files("alice", &by_type).await.unwrap().len(), 2);

        let by_size = FileFilter {
            size: Some(2),
            ..Default::default()
        };
        assert_eq!(service.list_files("alice", &by_size).await.unwrap().len(), 2);

        let by_name = FileFilter {
            name: Some("alice".into()),
            ..Default::default()
        };
        assert!(service.list_files("alice", &by_name).await.unwrap().is_empty());

        let limited = FileFilter {
            content_type: Some("text".into()),
            limit: Some(1),
            ..Default::default()
        };
        assert_eq!(service.list_files("alice", &limited).await.unwrap().len(), 1);

        let nobody = service.list_files("bob", &FileFilter::default()).await.unwrap();
        assert!(nobody.is_empty());
    }

    #[tokio::test]
    async fn test_delete_file() {
        let (_, service) = service();
        let headers = lifecycle_headers(60_000, 10, false);
        service
            .upload_file("alice", "a.txt", payload("text/plain", &headers, b"one"))
            .await
            .unwrap();

        assert_ok!(service.delete_file("alice", "a.txt").await);
        let again = service.delete_file("alice", "a.txt").await;
        assert!(matches!(again, Err(FileError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_all_requires_data() {
        let (store, service) = service();

        let empty = service.delete_all_files("alice").await;
        assert!(matches!(empty, Err(FileError::EmptyData(_))));

        let headers = lifecycle_headers(60_000, 10, false);
        for name in ["a.txt", "b.txt", "c.txt"] {
            service
                .upload_file("alice", name, payload("text/plain", &headers, b"x"))
                .await
                .unwrap();
        }
        service
            .upload_file("alice2", "a.txt", payload("text/plain", &headers, b"x"))
            .await
            .unwrap();

        assert_eq!(service.delete_all_files("alice").await.unwrap(), 3);
        assert!(store.list_keys("alice/").await.unwrap().is_empty());
        assert_eq!(store.list_keys("alice2/").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_purge_expired_removes_only_expired() {
        let (store, service) = service();
        let headers = lifecycle_headers(60_000, 10, false);
        service
            .upload_file("alice", "fresh.txt", payload("text/plain", &headers, b"x"))
            .await
            .unwrap();
        seed_expired(&store, "alice/stale.txt").await;

        assert_eq!(service.purge_expired("alice").await, 1);
        assert_eq!(
            store.list_keys("alice/").await.unwrap(),
            vec!["alice/fresh.txt".to_string()]
        );
    }

    #[tokio::test]
    async fn test_purge_anonymous_account() {
        let (store, service) = service();
        let past = Utc::now().timestamp_millis() - 1_000;
        let expired_guest = guest::username_expiring_at(past);
        seed_expired(&store, &format!("{}/a.txt", expired_guest)).await;
        store
            .put_object(
                &format!("{}/b.txt", expired_guest),
                b"x",
                "text/plain",
                &HashMap::new(),
                WriteCondition::DoesNotExist,
            )
            .await
            .unwrap();

        let future = Utc::now().timestamp_millis() + 60_000;
        let live_guest = guest::username_expiring_at(future);
        seed_expired(&store, &format!("{}/a.txt", live_guest)).await;

        assert_eq!(service.purge_anonymous_account(&expired_guest).await, 2);
        assert_eq!(service.purge_anonymous_account(&live_guest).await, 0);
        assert_eq!(service.purge_anonymous_account("alice").await, 0);
        assert_eq!(store.list_keys(&format!("{}/", live_guest)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_read_public_hides_private_files() {
        let (_, service) = service();
        let private = lifecycle_headers(60_000, 10, false);
        let public = lifecycle_headers(60_000, 10, true);
        service
            .upload_file("alice", "secret.txt", payload("text/plain", &private, b"s"))
            .await
            .unwrap();
        service
            .upload_file("alice", "open.txt", payload("text/plain", &public, b"open"))
            .await
            .unwrap();

        let (record, data) = service.read_public("alice", "open.txt").await.unwrap();
        assert_eq!(data, b"open");
        assert_eq!(record.content_type, "text/plain");

        let hidden = service.read_public("alice", "secret.txt").await;
        assert!(matches!(hidden, Err(FileError::NotPublic(_))));
        let absent = service.read_public("alice", "nothing.txt").await;
        assert!(matches!(absent, Err(FileError::NotPublic(_))));
    }

    struct SlowStore(MemoryObjectStore);

    #[async_trait]
    impl ObjectStore for SlowStore {
        async fn head_object(&self, key: &str) -> Result<ObjectAttributes, StoreError> {
            self.0.head_object(key).await
        }

        async fn get_object(&self, key: &str) -> Result<Vec<u8>, StoreError> {
            self.0.get_object(key).await
        }

        async fn put_object(
            &self,
            key: &str,
            data: &[u8],
            content_type: &str,
            metadata: &HashMap<String, String>,
            condition: WriteCondition,
        ) -> Result<(), StoreError> {
            self.0
                .put_object(key, data, content_type, metadata, condition)
                .await
        }

        async fn delete_object(&self, key: &str, generation: &str) -> Result<(), StoreError> {
            self.0.delete_object(key, generation).await
        }

        async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            self.0.list_keys(prefix).await
        }

        async fn presign_get(&self, key: &str, expires_in_secs: u32) -> Result<String, StoreError> {
            self.0.presign_get(key, expires_in_secs).await
        }
    }

    #[tokio::test]
    async fn test_operations_time_out() {
        let store = Arc::new(SlowStore(MemoryObjectStore::new("http://memory.local")));
        let service = service_with(store).with_timeout(Duration::from_millis(20));

        let result = service.list_files("alice", &FileFilter::default()).await;
        assert!(matches!(result, Err(FileError::Timeout(_))));

        // Best-effort purge swallows the timeout
        assert_eq!(service.purge_expired("alice").await, 0);
    }

    /// Memory store with injected failures on chosen keys
    struct FaultyStore {
        inner: MemoryObjectStore,
        fail_head: Option<String>,
        fail_delete: Option<String>,
        /// Another writer lands just before every generation-matched write
        race_updates: bool,
    }

    #[async_trait]
    impl ObjectStore for FaultyStore {
        async fn head_object(&self, key: &str) -> Result<ObjectAttributes, StoreError> {
            if self.fail_head.as_deref() == Some(key) {
                return Err(StoreError::Backend("head failed".to_string()));
            }
            self.inner.head_object(key).await
        }

        async fn get_object(&self, key: &str) -> Result<Vec<u8>, StoreError> {
            self.inner.get_object(key).await
        }

        async fn put_object(
            &self,
            key: &str,
            data: &[u8],
            content_type: &str,
            metadata: &HashMap<String, String>,
            condition: WriteCondition,
        ) -> Result<(), StoreError> {
            if self.race_updates {
                if let WriteCondition::GenerationMatch(generation) = &condition {
                    self.inner
                        .put_object(
                            key,
                            b"racer",
                            content_type,
                            metadata,
                            WriteCondition::GenerationMatch(generation.clone()),
                        )
                        .await?;
                }
            }
            self.inner
                .put_object(key, data, content_type, metadata, condition)
                .await
        }

        async fn delete_object(&self, key: &str, generation: &str) -> Result<(), StoreError> {
            if self.fail_delete.as_deref() == Some(key) {
                return Err(StoreError::Backend("delete failed".to_string()));
            }
            self.inner.delete_object(key, generation).await
        }

        async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
            self.inner.list_keys(prefix).await
        }

        async fn presign_get(&self, key: &str, expires_in_secs: u32) -> Result<String, StoreError> {
            self.inner.presign_get(key, expires_in_secs).await
        }
    }

    async fn seed_files(store: &MemoryObjectStore, keys: &[&str]) {
        let meta = metadata::encode(&LifecycleMetadata {
            auto_delete_at: Utc::now().timestamp_millis() + 60_000,
            private_url_expires: 10,
            is_public: false,
        });
        for key in keys {
            store
                .put_object(key, b"data", "text/plain", &meta, WriteCondition::DoesNotExist)
                .await
                .unwrap();
        }
    }

    fn faulty(fail_head: Option<&str>, fail_delete: Option<&str>, race_updates: bool) -> FaultyStore {
        FaultyStore {
            inner: MemoryObjectStore::new("http://memory.local"),
            fail_head: fail_head.map(str::to_string),
            fail_delete: fail_delete.map(str::to_string),
            race_updates,
        }
    }

    #[tokio::test]
    async fn test_list_fails_when_one_object_cannot_be_read() {
        let store = Arc::new(faulty(Some("alice/b.txt"), None, false));
        seed_files(&store.inner, &["alice/a.txt", "alice/b.txt", "alice/c.txt"]).await;
        let service = service_with(store.clone());

        let listed = service.list_files("alice", &FileFilter::default()).await;
        assert!(matches!(listed, Err(FileError::Store(StoreError::Backend(_)))));

        // Other owners are unaffected
        seed_files(&store.inner, &["bob/a.txt"]).await;
        let bob = assert_ok!(service.list_files("bob", &FileFilter::default()).await);
        assert_eq!(bob.len(), 1);
    }

    #[tokio::test]
    async fn test_update_loses_race_against_concurrent_writer() {
        let store = Arc::new(faulty(None, None, true));
        seed_files(&store.inner, &["alice/a.txt"]).await;
        let service = service_with(store.clone());
        let headers = lifecycle_headers(120_000, 20, true);

        let updated = service
            .update_file("alice", "a.txt", payload("text/plain", &headers, b"mine"))
            .await;
        assert!(matches!(updated, Err(FileError::ModifiedConcurrently(_))));

        // The other writer's content survives
        let stored = assert_ok!(store.inner.get_object("alice/a.txt").await);
        assert_eq!(stored, b"racer");
    }

    #[tokio::test]
    async fn test_delete_all_aborts_on_store_error() {
        let store = Arc::new(faulty(None, Some("alice/b.txt"), false));
        seed_files(&store.inner, &["alice/b.txt"]).await;
        let service = service_with(store.clone());

        let deleted = service.delete_all_files("alice").await;
        assert!(matches!(deleted, Err(FileError::Store(StoreError::Backend(_)))));
        assert_eq!(assert_ok!(service.count_files("alice").await), 1);
    }
}
