//! Configuration module
//!
//! Deployment settings for the thumbnailer function: which storage backend to talk to,
//! how to reach it, how large the pipeline buffers are and how logs are formatted.
//! None of this is part of the invocation contract; it only wires the process.

use std::env;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_OUTPUT_CHUNK_SIZE_KB, DEFAULT_PIPELINE_BUFFER_CHUNKS, DEFAULT_REGION,
    DEFAULT_UPLOAD_PART_SIZE_MB,
};
use crate::storage_types::StorageBackend;

/// Smallest part S3 accepts for any but the last part of a multipart upload.
const MIN_UPLOAD_PART_SIZE_BYTES: usize = 5 * 1024 * 1024;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Thumbnailer configuration
#[derive(Clone, Debug)]
pub struct ThumbnailerConfig {
    pub environment: String,
    pub log_format: LogFormat,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_region: String,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    pub s3_allow_http: bool,
    pub local_storage_path: Option<PathBuf>,
    // Pipeline configuration
    pub upload_part_size_bytes: usize,
    pub pipeline_buffer_chunks: usize,
    pub output_chunk_size_bytes: usize,
    pub spool_dir: Option<PathBuf>,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ThumbnailerConfig>);

impl Config {
    fn inner(&self) -> &ThumbnailerConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let config = ThumbnailerConfig::from_lookup(|name| env::var(name).ok())?;
        Ok(Config(Box::new(config)))
    }

    pub fn environment(&self) -> &str {
        &self.inner().environment
    }

    pub fn log_format(&self) -> LogFormat {
        self.inner().log_format
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn s3_region(&self) -> &str {
        &self.inner().s3_region
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn s3_access_key_id(&self) -> Option<&str> {
        self.inner().s3_access_key_id.as_deref()
    }

    pub fn s3_secret_access_key(&self) -> Option<&str> {
        self.inner().s3_secret_access_key.as_deref()
    }

    pub fn s3_allow_http(&self) -> bool {
        self.inner().s3_allow_http
    }

    pub fn local_storage_path(&self) -> Option<&PathBuf> {
        self.inner().local_storage_path.as_ref()
    }

    pub fn upload_part_size_bytes(&self) -> usize {
        self.inner().upload_part_size_bytes
    }

    pub fn pipeline_buffer_chunks(&self) -> usize {
        self.inner().pipeline_buffer_chunks
    }

    pub fn output_chunk_size_bytes(&self) -> usize {
        self.inner().output_chunk_size_bytes
    }

    pub fn spool_dir(&self) -> Option<&PathBuf> {
        self.inner().spool_dir.as_ref()
    }
}

impl ThumbnailerConfig {
    /// Build the configuration from a variable lookup (the process environment in
    /// production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let log_format = match lookup("LOG_FORMAT").map(|s| s.to_lowercase()) {
            Some(ref f) if f == "json" => LogFormat::Json,
            Some(ref f) if f == "text" || f == "pretty" => LogFormat::Text,
            Some(other) => return Err(anyhow::anyhow!("Invalid LOG_FORMAT: {}", other)),
            // Lambda ships stdout to CloudWatch, where one JSON object per line is searchable.
            None if lookup("AWS_LAMBDA_FUNCTION_NAME").is_some() => LogFormat::Json,
            None => LogFormat::Text,
        };

        let storage_backend = match lookup("STORAGE_BACKEND") {
            Some(s) => s.parse::<StorageBackend>()?,
            None => StorageBackend::S3,
        };

        let s3_region = lookup("S3_REGION")
            .or_else(|| lookup("AWS_REGION"))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        // MinIO deployments only export MINIO_* variables.
        let s3_endpoint = lookup("S3_ENDPOINT")
            .or_else(|| lookup("MINIO_ADDRESS").map(|address| normalize_endpoint(&address)));
        let s3_access_key_id = lookup("S3_ACCESS_KEY_ID").or_else(|| lookup("MINIO_ACCESS_KEY"));
        let s3_secret_access_key =
            lookup("S3_SECRET_ACCESS_KEY").or_else(|| lookup("MINIO_SECRET_KEY"));

        let endpoint_is_http = s3_endpoint
            .as_deref()
            .map(|e| e.starts_with("http://"))
            .unwrap_or(false);
        let s3_allow_http = lookup("S3_ALLOW_HTTP")
            .map(|s| s.to_lowercase().parse().unwrap_or(endpoint_is_http))
            .unwrap_or(endpoint_is_http);

        let upload_part_size_mb = lookup("UPLOAD_PART_SIZE_MB")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_UPLOAD_PART_SIZE_MB);

        let pipeline_buffer_chunks = lookup("PIPELINE_BUFFER_CHUNKS")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_PIPELINE_BUFFER_CHUNKS);

        let output_chunk_size_kb = lookup("OUTPUT_CHUNK_SIZE_KB")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_OUTPUT_CHUNK_SIZE_KB);

        let upload_part_size_bytes = upload_part_size_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| {
                anyhow::anyhow!("UPLOAD_PART_SIZE_MB is too large: {}", upload_part_size_mb)
            })?;
        let output_chunk_size_bytes = output_chunk_size_kb.checked_mul(1024).ok_or_else(|| {
            anyhow::anyhow!("OUTPUT_CHUNK_SIZE_KB is too large: {}", output_chunk_size_kb)
        })?;

        let config = ThumbnailerConfig {
            environment,
            log_format,
            storage_backend,
            s3_region,
            s3_endpoint,
            s3_access_key_id,
            s3_secret_access_key,
            s3_allow_http,
            local_storage_path: lookup("LOCAL_STORAGE_PATH").map(PathBuf::from),
            upload_part_size_bytes,
            pipeline_buffer_chunks,
            output_chunk_size_bytes,
            spool_dir: lookup("SPOOL_DIR").map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.storage_backend == StorageBackend::Local && self.local_storage_path.is_none() {
            return Err(anyhow::anyhow!(
                "LOCAL_STORAGE_PATH must be set when STORAGE_BACKEND=local"
            ));
        }

        if self.s3_access_key_id.is_some() != self.s3_secret_access_key.is_some() {
            return Err(anyhow::anyhow!(
                "S3 access key id and secret access key must be set together"
            ));
        }

        if self.upload_part_size_bytes < MIN_UPLOAD_PART_SIZE_BYTES {
            return Err(anyhow::anyhow!(
                "UPLOAD_PART_SIZE_MB must be at least 5 (got {} bytes)",
                self.upload_part_size_bytes
            ));
        }

        if self.pipeline_buffer_chunks == 0 {
            return Err(anyhow::anyhow!("PIPELINE_BUFFER_CHUNKS must be greater than 0"));
        }

        if self.output_chunk_size_bytes == 0 {
            return Err(anyhow::anyhow!("OUTPUT_CHUNK_SIZE_KB must be greater than 0"));
        }

        Ok(())
    }
}

impl Default for ThumbnailerConfig {
    fn default() -> Self {
        ThumbnailerConfig {
            environment: "development".to_string(),
            log_format: LogFormat::Text,
            storage_backend: StorageBackend::S3,
            s3_region: DEFAULT_REGION.to_string(),
            s3_endpoint: None,
            s3_access_key_id: None,
            s3_secret_access_key: None,
            s3_allow_http: false,
            local_storage_path: None,
            upload_part_size_bytes: DEFAULT_UPLOAD_PART_SIZE_MB * 1024 * 1024,
            pipeline_buffer_chunks: DEFAULT_PIPELINE_BUFFER_CHUNKS,
            output_chunk_size_bytes: DEFAULT_OUTPUT_CHUNK_SIZE_KB * 1024,
            spool_dir: None,
        }
    }
}

/// MinIO addresses come as `host:port`; object_store wants a URL.
fn normalize_endpoint(address: &str) -> String {
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}
