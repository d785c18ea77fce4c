//! Image transform stage: shrink-on-load decode, cover-resize, streamed PNG encode.

mod chunk_writer;
mod decode;
mod png_stream;
pub mod resize;
mod shrink;
pub mod transformer;

pub use decode::{MAX_DECODE_BYTES, MAX_INPUT_PIXELS};
pub use resize::{TargetDimensions, MAX_TARGET_SIDE};
pub use transformer::{PngStream, ResizeStage, TransformOptions};
