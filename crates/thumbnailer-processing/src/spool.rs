//! Input spooling.
//!
//! Image decoders need `Read + Seek`, which a network stream cannot offer. The input is
//! copied chunk by chunk into an anonymous temporary file that the decoder then reads from,
//! so the encoded source never has to sit in memory as one buffer.

use crate::error::ProcessingError;
use futures::StreamExt;
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::Path;
use thumbnailer_storage::ByteStream;
use tokio::io::AsyncWriteExt;

/// An input copied to disk. The file is unlinked already and disappears when dropped.
pub struct SpooledInput {
    file: File,
    size_bytes: u64,
}

impl SpooledInput {
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// A fresh reader positioned at the start. Readers share one file offset, so use them
    /// one after another. Blocking.
    pub fn reader(&self) -> std::io::Result<BufReader<File>> {
        let mut file = self.file.try_clone()?;
        file.seek(SeekFrom::Start(0))?;
        Ok(BufReader::new(file))
    }
}

/// Drain `input` into a temporary file under `dir` (or the system temp dir).
pub async fn spool_input(
    mut input: ByteStream,
    dir: Option<&Path>,
) -> Result<SpooledInput, ProcessingError> {
    let file = match dir {
        Some(dir) => tempfile::tempfile_in(dir),
        None => tempfile::tempfile(),
    }
    .map_err(ProcessingError::Spool)?;

    let mut file = tokio::fs::File::from_std(file);
    let mut size_bytes: u64 = 0;

    while let Some(chunk) = input.next().await {
        let chunk = chunk.map_err(ProcessingError::Source)?;
        file.write_all(&chunk).await.map_err(ProcessingError::Spool)?;
        size_bytes += chunk.len() as u64;
    }
    file.flush().await.map_err(ProcessingError::Spool)?;

    Ok(SpooledInput {
        file: file.into_std().await,
        size_bytes,
    })
}
