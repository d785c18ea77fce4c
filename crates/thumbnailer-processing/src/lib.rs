//! Thumbnailer Processing Library
//!
//! The transform stage of the thumbnail pipeline: an input byte stream goes in, a PNG byte
//! stream of the requested dimensions comes out. Decoding, resizing and encoding run on the
//! blocking pool; encoded output is handed back in bounded chunks as it is produced.

pub mod error;
pub mod image;
pub mod spool;

pub use error::ProcessingError;
pub use image::{
    PngStream, ResizeStage, TargetDimensions, TransformOptions, MAX_DECODE_BYTES, MAX_INPUT_PIXELS,
    MAX_TARGET_SIDE,
};
