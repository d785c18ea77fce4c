//! Function handler
//!
//! One invocation is one linear pipeline:
//! source object -> resize stage -> destination object.
//!
//! All per-invocation values live on the stack of `handle`; the `Thumbnailer` itself holds
//! only the shared storage client and transform settings, so concurrent invocations never
//! observe each other's event.

use crate::pipeline;
use std::sync::Arc;
use std::time::Instant;
use thumbnailer_core::{AppError, InvocationEvent, ResultDescriptor};
use thumbnailer_processing::{ResizeStage, TransformOptions};
use thumbnailer_storage::Storage;

/// Process-wide handler state.
#[derive(Clone)]
pub struct Thumbnailer {
    storage: Arc<dyn Storage>,
    options: TransformOptions,
}

impl Thumbnailer {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            options: TransformOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TransformOptions) -> Self {
        self.options = options;
        self
    }

    /// Resize `event.object` from `event.bucket.input` into `event.bucket.output`.
    ///
    /// Returns once the destination object is committed. On failure nothing is reported as
    /// written; an upload that was already open is abandoned, not committed.
    pub async fn handle(&self, event: InvocationEvent) -> Result<ResultDescriptor, AppError> {
        let start = Instant::now();
        let upload_key = event.upload_key();
        let InvocationEvent { bucket, object } = event;

        tracing::info!(
            input_bucket = %bucket.input,
            output_bucket = %bucket.output,
            key = %object.key,
            upload_key = %upload_key,
            width = object.width,
            height = object.height,
            "Thumbnail requested"
        );

        let stage =
            ResizeStage::new(object.width, object.height)?.with_options(self.options.clone());

        // Open the source first so a missing object never opens a destination.
        let input = self
            .storage
            .download_stream(&bucket.input, &object.key)
            .await?;
        let upload = self
            .storage
            .upload_stream(&bucket.output, &upload_key)
            .await?;

        let receipt = pipeline::run(stage.apply(input), upload).await?;

        tracing::info!(
            bucket = %receipt.bucket,
            key = %receipt.key,
            size_bytes = receipt.size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Thumbnail written"
        );

        Ok(ResultDescriptor {
            bucket: bucket.output,
            key: upload_key,
        })
    }
}
