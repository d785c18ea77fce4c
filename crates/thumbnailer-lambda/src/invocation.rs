//! Per-invocation bookkeeping: request id, cold start, container identity.
//!
//! A container (one process) serves many invocations. The first one it serves is the cold
//! start; all later ones are warm. The container id is generated on that first invocation
//! and stays fixed for the life of the process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::Instant;
use uuid::Uuid;

static CONTAINER_ID: OnceLock<String> = OnceLock::new();
static WARM: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone)]
pub struct InvocationInfo {
    pub request_id: String,
    pub is_cold: bool,
    pub container_id: String,
    started: Instant,
}

impl InvocationInfo {
    /// Record the start of an invocation.
    pub fn begin(request_id: impl Into<String>) -> Self {
        let is_cold = !WARM.swap(true, Ordering::SeqCst);
        let container_id = CONTAINER_ID
            .get_or_init(|| Uuid::new_v4().to_string())
            .clone();

        Self {
            request_id: request_id.into(),
            is_cold,
            container_id,
            started: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}

/// Span every log line of one invocation runs under.
pub fn invocation_span(info: &InvocationInfo) -> tracing::Span {
    tracing::info_span!(
        "invocation",
        request_id = %info.request_id,
        is_cold = info.is_cold,
        container_id = %info.container_id,
    )
}
