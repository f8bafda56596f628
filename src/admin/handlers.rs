use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::cache::CacheStats;
use crate::registry::EndpointStatus;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub endpoints: usize,
    pub healthy_endpoints: usize,
    pub in_flight: usize,
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Serialize)]
pub struct PurgeResult {
    pub removed: usize,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let endpoints = state.registry.all_endpoints();
    let status = if state.gate.is_closed() {
        "shutting_down"
    } else {
        "operational"
    };

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status,
        endpoints: endpoints.len(),
        healthy_endpoints: endpoints.iter().filter(|e| e.is_healthy()).count(),
        in_flight: state.gate.in_flight(),
        max_concurrent_requests: state.gate.limit(),
    })
}

pub async fn get_endpoints(State(state): State<AdminState>) -> Json<Vec<EndpointStatus>> {
    Json(
        state
            .registry
            .all_endpoints()
            .iter()
            .map(|e| e.status())
            .collect(),
    )
}

pub async fn get_cache(State(state): State<AdminState>) -> Json<CacheStats> {
    Json(state.cache.stats())
}

pub async fn purge_cache(State(state): State<AdminState>) -> Json<PurgeResult> {
    let removed = state.cache.clear();
    tracing::info!(removed, "Response cache purged via admin API");
    Json(PurgeResult { removed })
}
