//! Thumbnailer Lambda
//!
//! The function handler: read the source object, resize it to a PNG thumbnail and write the
//! thumbnail next to the other outputs, streaming end to end.

pub mod handler;
pub mod invocation;
pub mod pipeline;

pub use handler::Thumbnailer;
pub use invocation::{invocation_span, InvocationInfo};
