//! Shared constants.

/// Extension appended to every derived output key.
pub const OUTPUT_EXTENSION: &str = ".png";

/// Content type of everything the transform stage emits.
pub const OUTPUT_CONTENT_TYPE: &str = "image/png";

/// Default multipart part size for streamed uploads, in megabytes.
pub const DEFAULT_UPLOAD_PART_SIZE_MB: usize = 10;

/// Default capacity, in chunks, of every bounded channel between pipeline stages.
pub const DEFAULT_PIPELINE_BUFFER_CHUNKS: usize = 4;

/// Default size of the chunks the PNG encoder emits, in kilobytes.
pub const DEFAULT_OUTPUT_CHUNK_SIZE_KB: usize = 64;

/// Region used when neither `S3_REGION` nor `AWS_REGION` is set.
pub const DEFAULT_REGION: &str = "us-east-1";
