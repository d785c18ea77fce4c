//! Shared bucket and key validation for storage backends.
//!
//! Keys must be non-empty, must be relative and must not have a `..` path segment. Dots
//! inside a segment (`photo..jpg`) are fine. Bucket names additionally must not contain `/`,
//! since the local backend maps each bucket to one directory.

use crate::traits::{StorageError, StorageResult};
use std::path::{Component, Path};

pub fn validate_bucket(bucket: &str) -> StorageResult<()> {
    if bucket.is_empty() {
        return Err(StorageError::InvalidKey("Bucket name is empty".to_string()));
    }
    if bucket.contains('/') || bucket.contains("..") || bucket.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "Bucket name contains invalid characters: {}",
            bucket
        )));
    }
    Ok(())
}

pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    let escapes = Path::new(key).components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(StorageError::InvalidKey(format!(
            "Storage key must be a relative path without '..' segments: {}",
            key
        )));
    }
    Ok(())
}
