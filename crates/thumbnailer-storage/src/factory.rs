#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{Storage, StorageBackend, StorageError, StorageResult};
use std::sync::Arc;
use thumbnailer_core::Config;

/// Create a storage backend based on configuration
///
/// Called once per process; the returned client is shared by every invocation.
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend() {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let mut storage =
                S3Storage::new(config.s3_region().to_string(), config.s3_endpoint().map(String::from))
                    .with_allow_http(config.s3_allow_http())
                    .with_part_size(config.upload_part_size_bytes())
                    .with_buffer_chunks(config.pipeline_buffer_chunks());

            if let (Some(access_key_id), Some(secret_access_key)) =
                (config.s3_access_key_id(), config.s3_secret_access_key())
            {
                storage = storage.with_credentials(crate::s3::S3Credentials {
                    access_key_id: access_key_id.to_string(),
                    secret_access_key: secret_access_key.to_string(),
                });
            }

            tracing::info!(
                region = %config.s3_region(),
                endpoint = ?config.s3_endpoint(),
                "Using S3 storage backend"
            );
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config.local_storage_path().cloned().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
            })?;

            tracing::info!(path = %base_path.display(), "Using local storage backend");
            let storage = LocalStorage::new(base_path)
                .await?
                .with_buffer_chunks(config.pipeline_buffer_chunks());
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
