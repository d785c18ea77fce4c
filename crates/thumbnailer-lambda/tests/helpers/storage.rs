//! In-memory storage double with scripted failures.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use thumbnailer_storage::upload::{self, UploadEvent};
use thumbnailer_storage::{
    ByteStream, Storage, StorageBackend, StorageError, StorageResult, UploadReceipt, UploadStream,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Committed { key: String, data: Vec<u8> },
    Abandoned { key: String },
}

/// Serves one source object as a fixed list of chunks.
pub struct ScriptedStorage {
    chunks: Vec<Bytes>,
    /// Fail the source stream after this many chunks.
    fail_source_after: Option<usize>,
    /// Fail every upload before reading any chunk.
    fail_upload: bool,
    pub uploads: Arc<Mutex<Vec<UploadOutcome>>>,
}

impl ScriptedStorage {
    pub fn serving(data: &[u8], chunk_size: usize) -> Self {
        Self {
            chunks: data.chunks(chunk_size).map(Bytes::copy_from_slice).collect(),
            fail_source_after: None,
            fail_upload: false,
            uploads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing_source_after(mut self, chunks: usize) -> Self {
        self.fail_source_after = Some(chunks);
        self
    }

    pub fn failing_upload(mut self) -> Self {
        self.fail_upload = true;
        self
    }

    pub fn outcomes(&self) -> Vec<UploadOutcome> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl Storage for ScriptedStorage {
    async fn download_stream(&self, _bucket: &str, _key: &str) -> StorageResult<ByteStream> {
        let mut items: Vec<StorageResult<Bytes>> = self.chunks.iter().cloned().map(Ok).collect();
        if let Some(after) = self.fail_source_after {
            items.truncate(after);
            items.push(Err(StorageError::DownloadFailed(
                "connection reset by peer".to_string(),
            )));
        }
        Ok(Box::pin(futures::stream::iter(items)))
    }

    async fn upload_stream(&self, bucket: &str, key: &str) -> StorageResult<UploadStream> {
        let (writer, mut source) = upload::channel(bucket, key, 1);
        let uploads = self.uploads.clone();
        let fail_upload = self.fail_upload;
        let bucket = bucket.to_string();
        let key = key.to_string();

        let completion = upload::spawn(async move {
            if fail_upload {
                return Err(StorageError::UploadFailed("quota exceeded".to_string()));
            }

            let mut data = Vec::new();
            loop {
                match source.next().await {
                    UploadEvent::Chunk(bytes) => data.extend_from_slice(&bytes),
                    UploadEvent::Finished => {
                        let size_bytes = data.len() as u64;
                        uploads.lock().unwrap().push(UploadOutcome::Committed {
                            key: key.clone(),
                            data,
                        });
                        return Ok(UploadReceipt {
                            bucket,
                            key,
                            size_bytes,
                        });
                    }
                    UploadEvent::Abandoned => {
                        uploads
                            .lock()
                            .unwrap()
                            .push(UploadOutcome::Abandoned { key: key.clone() });
                        return Err(StorageError::UploadAborted(format!("{}/{}", bucket, key)));
                    }
                }
            }
        });

        Ok(UploadStream { writer, completion })
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
