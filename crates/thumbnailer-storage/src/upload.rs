//! Streamed upload plumbing shared by all backends.
//!
//! The caller side gets an [`ObjectWriter`] and an [`UploadCompletion`]. The backend side
//! gets an [`UploadSource`] it drains inside a spawned task. The two are joined by a bounded
//! channel, so a slow backend stalls `write` instead of letting chunks pile up in memory.

use bytes::Bytes;
use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::traits::{StorageError, StorageResult};

enum UploadMessage {
    Chunk(Bytes),
    Finish,
}

/// What the backend task sees next.
pub enum UploadEvent {
    Chunk(Bytes),
    /// The writer called `finish`; commit the object.
    Finished,
    /// The writer was dropped without finishing; discard what was staged.
    Abandoned,
}

/// Writable end of a streamed upload.
pub struct ObjectWriter {
    tx: mpsc::Sender<UploadMessage>,
    bucket: String,
    key: String,
    bytes_written: u64,
}

impl ObjectWriter {
    /// Queue a chunk for the backend. Waits while the channel is full.
    pub async fn write(&mut self, chunk: Bytes) -> StorageResult<()> {
        if chunk.is_empty() {
            return Ok(());
        }
        let len = chunk.len() as u64;
        self.tx
            .send(UploadMessage::Chunk(chunk))
            .await
            .map_err(|_| self.closed())?;
        self.bytes_written += len;
        Ok(())
    }

    /// Signal that every chunk has been written. The backend commits after this.
    pub async fn finish(self) -> StorageResult<()> {
        self.tx
            .send(UploadMessage::Finish)
            .await
            .map_err(|_| self.closed())
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn closed(&self) -> StorageError {
        StorageError::SinkClosed(format!("{}/{}", self.bucket, self.key))
    }
}

/// Backend end of a streamed upload.
pub struct UploadSource {
    rx: mpsc::Receiver<UploadMessage>,
}

impl UploadSource {
    pub async fn next(&mut self) -> UploadEvent {
        match self.rx.recv().await {
            Some(UploadMessage::Chunk(bytes)) => UploadEvent::Chunk(bytes),
            Some(UploadMessage::Finish) => UploadEvent::Finished,
            None => UploadEvent::Abandoned,
        }
    }
}

/// Confirmation that an object was committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub bucket: String,
    pub key: String,
    pub size_bytes: u64,
}

/// Resolves once the backend has committed (or failed to commit) the object.
pub struct UploadCompletion {
    handle: JoinHandle<StorageResult<UploadReceipt>>,
}

impl UploadCompletion {
    pub async fn wait(self) -> StorageResult<UploadReceipt> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(StorageError::BackendError(format!("Upload task failed: {}", e))),
        }
    }
}

/// A destination opened by [`crate::Storage::upload_stream`].
pub struct UploadStream {
    pub writer: ObjectWriter,
    pub completion: UploadCompletion,
}

impl UploadStream {
    pub fn into_parts(self) -> (ObjectWriter, UploadCompletion) {
        (self.writer, self.completion)
    }
}

/// Create the bounded channel between a writer and its backend task.
///
/// Backends call this from `upload_stream`, drain the [`UploadSource`] inside [`spawn`], and
/// hand the writer plus completion back to the caller.
pub fn channel(bucket: &str, key: &str, capacity: usize) -> (ObjectWriter, UploadSource) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let writer = ObjectWriter {
        tx,
        bucket: bucket.to_string(),
        key: key.to_string(),
        bytes_written: 0,
    };
    (writer, UploadSource { rx })
}

/// Run a backend's commit loop in the background.
pub fn spawn<F>(task: F) -> UploadCompletion
where
    F: Future<Output = StorageResult<UploadReceipt>> + Send + 'static,
{
    UploadCompletion {
        handle: tokio::spawn(task),
    }
}
