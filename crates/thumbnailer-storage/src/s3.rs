use crate::traits::{ByteStream, Storage, StorageError, StorageResult};
use crate::upload::{self, UploadEvent, UploadReceipt, UploadStream};
use crate::StorageBackend;
use async_trait::async_trait;
use futures::StreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::buffered::BufWriter;
use object_store::path::Path;
use object_store::{Attribute, Attributes, Error as ObjectStoreError, ObjectStore};
use object_store::ObjectStoreExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thumbnailer_core::constants::{
    DEFAULT_PIPELINE_BUFFER_CHUNKS, DEFAULT_UPLOAD_PART_SIZE_MB, OUTPUT_CONTENT_TYPE, OUTPUT_EXTENSION,
};
use tokio::io::AsyncWriteExt;

/// Static credentials for S3-compatible providers. AWS deployments leave this unset and
/// rely on the environment (execution role, `AWS_*` variables).
#[derive(Clone)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// S3 storage implementation
///
/// `object_store` binds each store to one bucket, so stores are built on first use of a
/// bucket and cached for the lifetime of the client.
#[derive(Clone)]
pub struct S3Storage {
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    allow_http: bool,
    credentials: Option<S3Credentials>,
    part_size_bytes: usize,
    buffer_chunks: usize,
    stores: Arc<Mutex<HashMap<String, Arc<dyn ObjectStore>>>>,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub fn new(region: String, endpoint_url: Option<String>) -> Self {
        let allow_http = endpoint_url
            .as_deref()
            .map(|e| e.starts_with("http://"))
            .unwrap_or(false);

        S3Storage {
            region,
            endpoint_url,
            allow_http,
            credentials: None,
            part_size_bytes: DEFAULT_UPLOAD_PART_SIZE_MB * 1024 * 1024,
            buffer_chunks: DEFAULT_PIPELINE_BUFFER_CHUNKS,
            stores: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_credentials(mut self, credentials: S3Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_allow_http(mut self, allow_http: bool) -> Self {
        self.allow_http = allow_http;
        self
    }

    /// Size of each multipart part buffered before it is sent.
    pub fn with_part_size(mut self, part_size_bytes: usize) -> Self {
        self.part_size_bytes = part_size_bytes;
        self
    }

    /// Set the capacity of the channel between upload writers and the multipart task.
    pub fn with_buffer_chunks(mut self, buffer_chunks: usize) -> Self {
        self.buffer_chunks = buffer_chunks;
        self
    }

    /// Serve `bucket` from an already built store instead of S3.
    #[cfg(test)]
    fn with_store(self, bucket: &str, store: Arc<dyn ObjectStore>) -> Self {
        if let Ok(mut stores) = self.stores.lock() {
            stores.insert(bucket.to_string(), store);
        }
        self
    }

    /// Build AmazonS3 object store from environment and explicit settings.
    fn build_store(&self, bucket: &str) -> StorageResult<Arc<dyn ObjectStore>> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(self.region.clone())
            .with_bucket_name(bucket.to_string());

        if let Some(ref endpoint) = self.endpoint_url {
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(self.allow_http);
        }

        if let Some(ref credentials) = self.credentials {
            builder = builder
                .with_access_key_id(credentials.access_key_id.clone())
                .with_secret_access_key(credentials.secret_access_key.clone());
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;
        Ok(Arc::new(store))
    }

    fn store_for(&self, bucket: &str) -> StorageResult<Arc<dyn ObjectStore>> {
        if bucket.is_empty() {
            return Err(StorageError::InvalidKey("Bucket name is empty".to_string()));
        }

        let mut stores = self
            .stores
            .lock()
            .map_err(|_| StorageError::BackendError("S3 store cache poisoned".to_string()))?;

        if let Some(store) = stores.get(bucket) {
            return Ok(store.clone());
        }

        let store = self.build_store(bucket)?;
        stores.insert(bucket.to_string(), store.clone());
        tracing::debug!(bucket = %bucket, region = %self.region, "S3 store created");
        Ok(store)
    }
}

/// Map a key onto an object store path, byte for byte.
///
/// `Path::from` percent-encodes characters S3 accepts (`#`, `%`, ...), so the stored object
/// would not be the one reported back. Keys that have no verbatim path (empty segments, a
/// leading or trailing `/`, `.` or `..` segments, control characters) are rejected.
fn object_location(key: &str) -> StorageResult<Path> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    let location = Path::parse(key)
        .map_err(|e| StorageError::InvalidKey(format!("{}: {}", key, e)))?;
    if location.as_ref() != key {
        return Err(StorageError::InvalidKey(format!(
            "Storage key cannot be stored verbatim: {}",
            key
        )));
    }
    Ok(location)
}

#[async_trait]
impl Storage for S3Storage {
    async fn download_stream(&self, bucket: &str, key: &str) -> StorageResult<ByteStream> {
        let location = object_location(key)?;
        let store = self.store_for(bucket)?;
        let start = std::time::Instant::now();

        let result = store.get(&location).await.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => {
                StorageError::NotFound(format!("{}/{}", bucket, key))
            }
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let bucket = bucket.to_string();
        let key = key.to_string();

        let stream = result.into_stream().map(move |res| match res {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 stream download error"
                );
                Err(StorageError::DownloadFailed(e.to_string()))
            }
        });

        Ok(Box::pin(stream))
    }

    async fn upload_stream(&self, bucket: &str, key: &str) -> StorageResult<UploadStream> {
        let location = object_location(key)?;
        let store = self.store_for(bucket)?;
        let mut buffered = BufWriter::with_capacity(store, location, self.part_size_bytes);
        if key.ends_with(OUTPUT_EXTENSION) {
            buffered = buffered.with_attributes(Attributes::from_iter([(
                Attribute::ContentType,
                OUTPUT_CONTENT_TYPE,
            )]));
        }

        let (writer, mut source) = upload::channel(bucket, key, self.buffer_chunks);
        let bucket = bucket.to_string();
        let key = key.to_string();

        let completion = upload::spawn(async move {
            let start = std::time::Instant::now();
            let mut size: u64 = 0;

            loop {
                match source.next().await {
                    UploadEvent::Chunk(bytes) => {
                        if let Err(e) = buffered.write_all(&bytes).await {
                            let _ = buffered.abort().await;
                            tracing::error!(
                                error = %e,
                                bucket = %bucket,
                                key = %key,
                                size_bytes = size,
                                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                                "S3 stream upload failed"
                            );
                            return Err(StorageError::UploadFailed(e.to_string()));
                        }
                        size += bytes.len() as u64;
                    }
                    UploadEvent::Finished => break,
                    UploadEvent::Abandoned => {
                        if let Err(e) = buffered.abort().await {
                            tracing::warn!(
                                error = %e,
                                bucket = %bucket,
                                key = %key,
                                "S3 multipart abort failed"
                            );
                        }
                        tracing::warn!(
                            bucket = %bucket,
                            key = %key,
                            size_bytes = size,
                            "S3 upload abandoned before commit"
                        );
                        return Err(StorageError::UploadAborted(format!("{}/{}", bucket, key)));
                    }
                }
            }

            // Completes the multipart upload (or issues a single put for small objects).
            buffered.shutdown().await.map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 stream upload commit failed"
                );
                StorageError::UploadFailed(e.to_string())
            })?;

            tracing::info!(
                bucket = %bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 stream upload successful"
            );

            Ok(UploadReceipt {
                bucket,
                key,
                size_bytes: size,
            })
        });

        Ok(UploadStream { writer, completion })
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::TryStreamExt;
    use object_store::local::LocalFileSystem;
    use object_store::memory::InMemory;

    fn minio() -> S3Storage {
        S3Storage::new("us-east-1".to_string(), Some("http://localhost:9000".to_string()))
            .with_credentials(S3Credentials {
                access_key_id: "minio".to_string(),
                secret_access_key: "minio123".to_string(),
            })
    }

    fn in_memory(bucket: &str) -> (S3Storage, Arc<dyn ObjectStore>) {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let storage = minio().with_store(bucket, store.clone());
        (storage, store)
    }

    async fn stored_keys(store: &Arc<dyn ObjectStore>) -> Vec<String> {
        let objects: Vec<_> = store.list(None).try_collect().await.unwrap();
        objects.iter().map(|meta| meta.location.to_string()).collect()
    }

    #[test]
    fn test_http_endpoint_allows_http() {
        let storage = minio();
        assert!(storage.allow_http);

        let storage = S3Storage::new("eu-west-1".to_string(), None);
        assert!(!storage.allow_http);
    }

    #[test]
    fn test_store_cached_per_bucket() {
        let storage = minio();
        let first = storage.store_for("input").unwrap();
        let again = storage.store_for("input").unwrap();
        let other = storage.store_for("output").unwrap();

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(storage.stores.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_clones_share_store_cache() {
        let storage = minio();
        let clone = storage.clone();
        storage.store_for("input").unwrap();
        assert_eq!(clone.stores.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_empty_bucket_rejected() {
        let storage = minio();
        assert!(matches!(
            storage.store_for(""),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_object_location_is_verbatim() {
        for key in ["img#1.png", "50%off.png", "a[1]/b c.png", "photos/2024/cat.png"] {
            assert_eq!(object_location(key).unwrap().as_ref(), key);
        }
    }

    #[test]
    fn test_keys_without_verbatim_location_rejected() {
        for key in ["", "photos//cat.png", "/leading.png", "trailing/", "a/../b.png"] {
            assert!(
                matches!(object_location(key), Err(StorageError::InvalidKey(_))),
                "{key:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_special_characters_stored_under_reported_key() {
        let (storage, store) = in_memory("output");

        for key in ["img#1.png", "50%off.png"] {
            let receipt = storage.upload("output", key, b"png".to_vec()).await.unwrap();
            assert_eq!(receipt.key, key);
        }

        let mut keys = stored_keys(&store).await;
        keys.sort();
        assert_eq!(keys, vec!["50%off.png", "img#1.png"]);
        assert_eq!(storage.download("output", "img#1.png").await.unwrap(), b"png");
    }

    #[tokio::test]
    async fn test_double_slash_key_rejected_before_upload() {
        let (storage, store) = in_memory("output");

        let result = storage.upload_stream("output", "photos//cat.png").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
        assert!(stored_keys(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_stream_upload_commits_on_finish() {
        let (storage, store) = in_memory("output");
        let storage = storage.with_part_size(16);

        let (mut writer, completion) = storage
            .upload_stream("output", "thumbs/cat.png")
            .await
            .unwrap()
            .into_parts();
        for _ in 0..4 {
            writer.write(Bytes::from(vec![7u8; 24])).await.unwrap();
        }
        writer.finish().await.unwrap();

        let receipt = completion.wait().await.unwrap();
        assert_eq!(receipt.size_bytes, 96);
        assert_eq!(stored_keys(&store).await, vec!["thumbs/cat.png"]);
        assert_eq!(
            storage.download("output", "thumbs/cat.png").await.unwrap(),
            vec![7u8; 96]
        );
    }

    #[tokio::test]
    async fn test_abandoned_multipart_upload_commits_nothing() {
        let (storage, store) = in_memory("output");
        let storage = storage.with_part_size(16);

        let (mut writer, completion) = storage
            .upload_stream("output", "thumbs/cat.png")
            .await
            .unwrap()
            .into_parts();
        for _ in 0..4 {
            writer.write(Bytes::from(vec![7u8; 24])).await.unwrap();
        }
        drop(writer);

        let result = completion.wait().await;
        assert!(matches!(result, Err(StorageError::UploadAborted(_))));
        assert!(stored_keys(&store).await.is_empty());
        assert!(matches!(
            storage.download_stream("output", "thumbs/cat.png").await,
            Err(StorageError::NotFound(_))
        ));
    }

    /// A filesystem store whose root has been replaced by a plain file, so every write fails.
    fn broken_store() -> (tempfile::TempDir, Arc<dyn ObjectStore>) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("bucket");
        std::fs::create_dir(&root).unwrap();
        let store = LocalFileSystem::new_with_prefix(&root).unwrap();
        std::fs::remove_dir(&root).unwrap();
        std::fs::write(&root, b"not a directory").unwrap();
        (dir, Arc::new(store))
    }

    #[tokio::test]
    async fn test_failed_part_write_reports_upload_failed() {
        let (_dir, store) = broken_store();
        let storage = minio().with_store("output", store).with_part_size(16);

        let (mut writer, completion) = storage
            .upload_stream("output", "cat.png")
            .await
            .unwrap()
            .into_parts();
        // Larger than one part, so the multipart upload starts while writing.
        let _ = writer.write(Bytes::from(vec![1u8; 64])).await;
        let _ = writer.finish().await;

        let result = completion.wait().await;
        assert!(matches!(result, Err(StorageError::UploadFailed(_))));
    }

    #[tokio::test]
    async fn test_failed_commit_reports_upload_failed() {
        let (_dir, store) = broken_store();
        let storage = minio().with_store("output", store);

        let (mut writer, completion) = storage
            .upload_stream("output", "cat.png")
            .await
            .unwrap()
            .into_parts();
        writer.write(Bytes::from_static(b"small")).await.unwrap();
        writer.finish().await.unwrap();

        let result = completion.wait().await;
        assert!(matches!(result, Err(StorageError::UploadFailed(_))));
    }
}
