//! Thumbnailer Storage Library
//!
//! This crate provides the storage abstraction the handler streams through, with
//! implementations for S3 (and S3-compatible endpoints) and the local filesystem.
//!
//! # Streaming contract
//!
//! - [`Storage::download_stream`] yields the object as a stream of `Bytes` chunks.
//! - [`Storage::upload_stream`] returns an [`ObjectWriter`] and an [`UploadCompletion`].
//!   Chunks written to the writer flow through a bounded channel to the backend; the
//!   object is committed only after [`ObjectWriter::finish`], and the completion resolves
//!   once the backend confirms the commit. Dropping the writer unfinished abandons the
//!   upload and fails the completion.
//!
//! # Object addressing
//!
//! Every operation names its bucket explicitly. One storage client serves any number of
//! buckets over its lifetime.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;
pub mod upload;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use thumbnailer_core::StorageBackend;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
pub use upload::{
    ObjectWriter, UploadCompletion, UploadEvent, UploadReceipt, UploadSource, UploadStream,
};
