//! Resize stage - turns an encoded image stream into a PNG stream
//!
//! `ResizeStage::apply` returns immediately. Work happens in a background task:
//! 1. Spool the input stream to a temporary file
//! 2. Decode (format sniffed from content) on the blocking pool, shrinking while reading
//!    where the format allows
//! 3. Cover-resize to the target dimensions
//! 4. Encode PNG row by row into a bounded channel
//!
//! The returned stream yields output chunks as the encoder produces them. A failure at any
//! step arrives as a final `Err` item; the stream ends without one only on success.

use super::chunk_writer::ChunkWriter;
use super::decode::decode_for_target;
use super::png_stream;
use super::resize::{resize_to_cover, TargetDimensions};
use crate::error::ProcessingError;
use crate::spool::spool_input;
use bytes::Bytes;
use futures::Stream;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Instant;
use thumbnailer_core::constants::{DEFAULT_OUTPUT_CHUNK_SIZE_KB, DEFAULT_PIPELINE_BUFFER_CHUNKS};
use thumbnailer_core::Config;
use thumbnailer_storage::ByteStream;
use tokio::sync::mpsc;

/// Encoded PNG output, in order.
pub type PngStream = Pin<Box<dyn Stream<Item = Result<Bytes, ProcessingError>> + Send>>;

/// Tuning knobs for the transform stage.
#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// Size of each emitted output chunk.
    pub chunk_size: usize,
    /// Chunks that may be in flight between the encoder and the consumer.
    pub buffer_chunks: usize,
    /// Where to spool input. `None` uses the system temp dir.
    pub spool_dir: Option<PathBuf>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_OUTPUT_CHUNK_SIZE_KB * 1024,
            buffer_chunks: DEFAULT_PIPELINE_BUFFER_CHUNKS,
            spool_dir: None,
        }
    }
}

impl TransformOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.output_chunk_size_bytes(),
            buffer_chunks: config.pipeline_buffer_chunks(),
            spool_dir: config.spool_dir().cloned(),
        }
    }
}

/// Streaming resize-to-PNG transform for one target size.
#[derive(Debug, Clone)]
pub struct ResizeStage {
    target: TargetDimensions,
    options: TransformOptions,
}

impl ResizeStage {
    /// Zero width or height is rejected here, before any input is read.
    pub fn new(width: u32, height: u32) -> Result<Self, ProcessingError> {
        Ok(Self {
            target: TargetDimensions::new(width, height)?,
            options: TransformOptions::default(),
        })
    }

    pub fn with_options(mut self, options: TransformOptions) -> Self {
        self.options = options;
        self
    }

    /// Start transforming `input`. Must be called inside a Tokio runtime.
    pub fn apply(&self, input: ByteStream) -> PngStream {
        let (tx, rx) = mpsc::channel(self.options.buffer_chunks.max(1));
        let target = self.target;
        let options = self.options.clone();

        tokio::spawn(async move {
            if let Err(e) = run(input, target, options, tx.clone()).await {
                match e {
                    // Nobody left to tell.
                    ProcessingError::OutputClosed => {
                        tracing::debug!("Transform stopped: output stream dropped")
                    }
                    other => {
                        let _ = tx.send(Err(other)).await;
                    }
                }
            }
        });

        Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        }))
    }
}

async fn run(
    input: ByteStream,
    target: TargetDimensions,
    options: TransformOptions,
    tx: mpsc::Sender<Result<Bytes, ProcessingError>>,
) -> Result<(), ProcessingError> {
    let start = Instant::now();
    let spooled = spool_input(input, options.spool_dir.as_deref()).await?;
    let input_bytes = spooled.size_bytes();

    if tx.is_closed() {
        return Err(ProcessingError::OutputClosed);
    }

    let chunk_size = options.chunk_size;
    let output_bytes = tokio::task::spawn_blocking(move || {
        let source = decode_for_target(&spooled, target)?;
        let resized = resize_to_cover(source, target);
        drop(spooled);

        let mut sink = ChunkWriter::new(tx, chunk_size);
        png_stream::encode(&resized, &mut sink, chunk_size)?;
        sink.finish().map_err(|_| ProcessingError::OutputClosed)
    })
    .await
    .map_err(|e| ProcessingError::Worker(e.to_string()))??;

    tracing::info!(
        input_bytes = input_bytes,
        output_bytes = output_bytes,
        width = target.width(),
        height = target.height(),
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Thumbnail encoded"
    );

    Ok(())
}
