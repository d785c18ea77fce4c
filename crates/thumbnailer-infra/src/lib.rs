//! Thumbnailer Infrastructure Library
//!
//! Shared process-level plumbing for the thumbnailer binaries:
//! - Telemetry initialization (tracing subscriber, text or JSON output)
//! - Error reporting at the level each error asks for

#[cfg(feature = "observability-basic")]
pub mod telemetry;

pub mod error;

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry, DEFAULT_LOG_FILTER};

pub use error::log_error;
