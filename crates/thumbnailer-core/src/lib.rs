//! Thumbnailer Core Library
//!
//! This crate provides the invocation data model, output key derivation, error types
//! and configuration shared by all thumbnailer components.

pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, LogFormat};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use event::{derive_upload_key, BucketPair, InvocationEvent, ObjectSpec, ResultDescriptor};
pub use storage_types::StorageBackend;
