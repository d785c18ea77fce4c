use crate::keys::{validate_bucket, validate_key};
use crate::traits::{ByteStream, Storage, StorageError, StorageResult};
use crate::upload::{self, UploadEvent, UploadReceipt, UploadStream};
use crate::StorageBackend;
use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use thumbnailer_core::constants::DEFAULT_PIPELINE_BUFFER_CHUNKS;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Local filesystem storage implementation
///
/// Objects live at `{base_path}/{bucket}/{key}`. Streamed uploads are written to a hidden
/// staging file next to the destination and renamed into place on commit, so a reader never
/// sees a half-written object.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    buffer_chunks: usize,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory holding one subdirectory per bucket
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            buffer_chunks: DEFAULT_PIPELINE_BUFFER_CHUNKS,
        })
    }

    /// Set the capacity of the channel between upload writers and the file task.
    pub fn with_buffer_chunks(mut self, buffer_chunks: usize) -> Self {
        self.buffer_chunks = buffer_chunks;
        self
    }

    /// Convert bucket and key to a filesystem path with security validation
    fn object_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        validate_bucket(bucket)?;
        validate_key(key)?;
        Ok(self.base_path.join(bucket).join(key))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

fn staging_path(path: &Path) -> StorageResult<PathBuf> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StorageError::InvalidKey(format!("No file name in {}", path.display())))?;
    Ok(path.with_file_name(format!(".{}.{}.part", file_name, Uuid::new_v4())))
}

#[async_trait]
impl Storage for LocalStorage {
    async fn download_stream(&self, bucket: &str, key: &str) -> StorageResult<ByteStream> {
        let path = self.object_path(bucket, key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(format!("{}/{}", bucket, key)));
        }

        let file = fs::File::open(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to open file {}: {}", path.display(), e))
        })?;

        let reader = tokio_util::io::ReaderStream::new(file);

        let path_display = path.display().to_string();
        let stream = reader.map(move |result| {
            result.map_err(|e| {
                tracing::error!(
                    error = %e,
                    path = %path_display,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage stream download error"
                );
                StorageError::DownloadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        tracing::debug!(
            path = %path.display(),
            bucket = %bucket,
            key = %key,
            "Local storage download stream opened"
        );

        Ok(Box::pin(stream))
    }

    async fn upload_stream(&self, bucket: &str, key: &str) -> StorageResult<UploadStream> {
        let path = self.object_path(bucket, key)?;
        self.ensure_parent_dir(&path).await?;

        let staging = staging_path(&path)?;
        let mut file = fs::File::create(&staging).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to create file {}: {}",
                staging.display(),
                e
            ))
        })?;

        let (writer, mut source) = upload::channel(bucket, key, self.buffer_chunks);
        let bucket = bucket.to_string();
        let key = key.to_string();

        let completion = upload::spawn(async move {
            let start = std::time::Instant::now();
            let mut size: u64 = 0;

            loop {
                match source.next().await {
                    UploadEvent::Chunk(bytes) => {
                        if let Err(e) = file.write_all(&bytes).await {
                            drop(file);
                            let _ = fs::remove_file(&staging).await;
                            return Err(StorageError::UploadFailed(format!(
                                "Failed to write file {}: {}",
                                staging.display(),
                                e
                            )));
                        }
                        size += bytes.len() as u64;
                    }
                    UploadEvent::Finished => break,
                    UploadEvent::Abandoned => {
                        drop(file);
                        let _ = fs::remove_file(&staging).await;
                        tracing::warn!(
                            bucket = %bucket,
                            key = %key,
                            size_bytes = size,
                            "Local storage upload abandoned before commit"
                        );
                        return Err(StorageError::UploadAborted(format!("{}/{}", bucket, key)));
                    }
                }
            }

            let committed: std::io::Result<()> = async {
                file.flush().await?;
                file.sync_all().await?;
                drop(file);
                fs::rename(&staging, &path).await
            }
            .await;

            if let Err(e) = committed {
                let _ = fs::remove_file(&staging).await;
                return Err(StorageError::UploadFailed(format!(
                    "Failed to commit file {}: {}",
                    path.display(),
                    e
                )));
            }

            tracing::info!(
                path = %path.display(),
                bucket = %bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Local storage stream upload successful"
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
        StorageBackend::Local
    }
}
