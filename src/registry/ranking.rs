//! Candidate ranking.
//!
//! Healthy endpoints are ordered by success rate (descending), then by last
//! observed latency (ascending, unknown latency last). Full ties keep
//! registration order. Unhealthy endpoints follow as last-resort candidates,
//! ranked the same way, so a request is still attempted when nothing is
//! healthy.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::registry::{endpoint::Endpoint, Capability, EndpointRegistry};

/// Ranking key captured once per endpoint so a concurrent status update
/// cannot reorder the list mid-sort.
#[derive(Debug, Clone, Copy)]
struct RankKey {
    success_rate_pct: f64,
    latency_ms: u64,
}

impl RankKey {
    fn of(endpoint: &Endpoint) -> Self {
        Self {
            success_rate_pct: endpoint.success_rate_pct(),
            latency_ms: endpoint.last_response_time_ms().unwrap_or(u64::MAX),
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        other
            .success_rate_pct
            .total_cmp(&self.success_rate_pct)
            .then(self.latency_ms.cmp(&other.latency_ms))
    }
}

/// Sort endpoints by rank. Stable, so ties keep their input order.
pub fn rank(endpoints: Vec<Arc<Endpoint>>) -> Vec<Arc<Endpoint>> {
    let mut keyed: Vec<(RankKey, Arc<Endpoint>)> = endpoints
        .into_iter()
        .map(|e| (RankKey::of(&e), e))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| a.compare(b));
    keyed.into_iter().map(|(_, e)| e).collect()
}

/// Ordered attempt list for a capability: ranked healthy endpoints first,
/// then ranked unhealthy ones.
pub fn candidates(registry: &EndpointRegistry, capability: &Capability) -> Vec<Arc<Endpoint>> {
    let (healthy, unhealthy): (Vec<_>, Vec<_>) = registry
        .list_endpoints(capability)
        .into_iter()
        .partition(|e| e.is_healthy());

    if healthy.is_empty() && !unhealthy.is_empty() {
        tracing::debug!(
            capability = %capability,
            count = unhealthy.len(),
            "No healthy endpoints, falling back to all endpoints"
        );
    }

    let mut ordered = rank(healthy);
    ordered.extend(rank(unhealthy));
    ordered
}
