//! Telemetry initialization
//!
//! One subscriber per process. Output format comes from configuration; filtering comes from
//! `RUST_LOG`, falling back to [`DEFAULT_LOG_FILTER`].

mod init_basic;

pub use init_basic::{init_telemetry, shutdown_telemetry, DEFAULT_LOG_FILTER};
