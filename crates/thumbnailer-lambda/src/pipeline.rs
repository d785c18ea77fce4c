//! Stream wiring between the transform stage and an open upload.
//!
//! The pump moves one output chunk at a time into the upload writer. Every hop is a bounded
//! channel, so a slow upload stalls the encoder, which stalls the read of the source.

use futures::StreamExt;
use thumbnailer_core::AppError;
use thumbnailer_processing::{PngStream, ProcessingError};
use thumbnailer_storage::{ObjectWriter, StorageError, UploadReceipt, UploadStream};

enum PumpError {
    Transform(ProcessingError),
    Sink(StorageError),
}

async fn pump(mut output: PngStream, mut writer: ObjectWriter) -> Result<u64, PumpError> {
    while let Some(chunk) = output.next().await {
        // Returning early drops the writer, which abandons the upload.
        let chunk = chunk.map_err(PumpError::Transform)?;
        writer.write(chunk).await.map_err(PumpError::Sink)?;
    }
    let written = writer.bytes_written();
    writer.finish().await.map_err(PumpError::Sink)?;
    Ok(written)
}

/// Drain `output` into `upload` and wait for the commit.
///
/// The first failure wins. When the writer fails only because the backend task is gone, the
/// backend's own error is reported instead.
pub async fn run(output: PngStream, upload: UploadStream) -> Result<UploadReceipt, AppError> {
    let (writer, completion) = upload.into_parts();
    let (pumped, committed) = tokio::join!(pump(output, writer), completion.wait());

    match (pumped, committed) {
        (Ok(_), Ok(receipt)) => Ok(receipt),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(PumpError::Sink(StorageError::SinkClosed(_))), Err(e)) => Err(e.into()),
        (Err(PumpError::Sink(e)), _) => Err(e.into()),
        (Err(PumpError::Transform(e)), _) => Err(e.into()),
    }
}
