//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::upload::{UploadReceipt, UploadStream};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use thiserror::Error;
use thumbnailer_core::AppError;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Upload aborted before commit: {0}")]
    UploadAborted(String),

    #[error("Upload sink closed: {0}")]
    SinkClosed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A readable object: `Bytes` chunks in order, ending after the last byte.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::UploadAborted(msg) => AppError::UploadAborted(msg),
            StorageError::UploadFailed(msg)
            | StorageError::SinkClosed(msg)
            | StorageError::DownloadFailed(msg)
            | StorageError::BackendError(msg) => AppError::Storage(msg),
            StorageError::IoError(err) => AppError::Storage(format!("IO error: {}", err)),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
        }
    }
}

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) implement this trait. A single instance is
/// created per process and shared by every concurrent invocation, so implementations hold
/// connection configuration only, never per-invocation state.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Open a stream over `key` in `bucket`.
    ///
    /// A missing object is reported as `NotFound`. Read errors after the stream is open
    /// arrive as `Err` items.
    async fn download_stream(&self, bucket: &str, key: &str) -> StorageResult<ByteStream>;

    /// Open a destination for `key` in `bucket`.
    ///
    /// Returns the writer half and the completion signal. Nothing becomes visible under
    /// `key` until the writer is finished and the completion resolves.
    async fn upload_stream(&self, bucket: &str, key: &str) -> StorageResult<UploadStream>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Download a whole object into memory.
    async fn download(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let mut stream = self.download_stream(bucket, key).await?;
        let mut data = Vec::new();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk?);
        }
        Ok(data)
    }

    /// Upload a whole object and wait for the commit.
    async fn upload(&self, bucket: &str, key: &str, data: Vec<u8>) -> StorageResult<UploadReceipt> {
        let (mut writer, completion) = self.upload_stream(bucket, key).await?.into_parts();
        writer.write(Bytes::from(data)).await?;
        writer.finish().await?;
        completion.wait().await
    }
}
