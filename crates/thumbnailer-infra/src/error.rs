//! Error reporting
//!
//! Invocation failures are returned to the runtime as-is; this module only decides how loudly
//! they are logged on the way out.

use thumbnailer_core::{AppError, ErrorMetadata, LogLevel};

/// Log `error` at the level its metadata asks for.
pub fn log_error(error: &AppError) {
    let code = error.error_code();
    let recoverable = error.is_recoverable();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_code = code, recoverable, "Invocation failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_code = code, recoverable, "Invocation failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_code = code, recoverable, "Invocation failed");
        }
    }
}
