use thiserror::Error;
use thumbnailer_core::AppError;
use thumbnailer_storage::StorageError;

/// Failures of the transform stage.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Invalid target dimensions {width}x{height}: each side must be between 1 and 16383")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Input image {width}x{height} exceeds the 268402689 pixel limit")]
    InputTooLarge { width: u32, height: u32 },

    #[error("Input stream failed: {0}")]
    Source(#[source] StorageError),

    #[error("Failed to spool input: {0}")]
    Spool(#[source] std::io::Error),

    #[error("Unrecognized image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode PNG: {0}")]
    Encode(String),

    #[error("Output consumer went away")]
    OutputClosed,

    #[error("Transform worker failed: {0}")]
    Worker(String),
}

impl From<ProcessingError> for AppError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::InvalidDimensions { .. } => AppError::InvalidInput(err.to_string()),
            ProcessingError::Source(e) => e.into(),
            ProcessingError::UnsupportedFormat
            | ProcessingError::InputTooLarge { .. }
            | ProcessingError::Decode(_)
            | ProcessingError::Encode(_) => AppError::ImageProcessing(err.to_string()),
            ProcessingError::OutputClosed => AppError::Storage(err.to_string()),
            ProcessingError::Spool(_) | ProcessingError::Worker(_) => {
                AppError::Internal(err.to_string())
            }
        }
    }
}
