//! Passive health checking (failure detection).
//!
//! # Responsibilities
//! - Observe request outcomes from the dispatcher
//! - Update endpoint status (failure count, health, latency)
//! - Append the outcome to the endpoint's history
//!
//! # Design Decisions
//! - Only failures that are the endpoint's fault count (see
//!   `AttemptFailure::counts_against_endpoint`); 429 is not one of them
//! - History writes are fire-and-forget

use std::sync::Arc;

use crate::health::history::{HealthRecord, HistoryRecorder};
use crate::observability::metrics;
use crate::registry::Endpoint;
use crate::resilience::AttemptFailure;

/// A request to `endpoint` succeeded after `elapsed_ms`.
pub fn report_success(recorder: &Arc<HistoryRecorder>, endpoint: &Arc<Endpoint>, elapsed_ms: u64) {
    endpoint.mark_success(elapsed_ms);
    metrics::record_endpoint_health(&endpoint.name, true);
    // Fire-and-forget.
    let _ = recorder.record(endpoint.clone(), HealthRecord::success(elapsed_ms));
}

/// A request to `endpoint` failed. Failures that are not the endpoint's
/// fault leave its status untouched.
pub fn report_failure(recorder: &Arc<HistoryRecorder>, endpoint: &Arc<Endpoint>, failure: AttemptFailure) {
    if !failure.counts_against_endpoint() {
        return;
    }

    if endpoint.mark_failure() {
        tracing::warn!(
            endpoint = %endpoint.name,
            failures = endpoint.consecutive_failures(),
            reason = %failure,
            "Endpoint marked unhealthy"
        );
    }
    metrics::record_endpoint_health(&endpoint.name, endpoint.is_healthy());
    let _ = recorder.record(endpoint.clone(), HealthRecord::failure());
}
