//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define router metrics (requests, attempts, cache, gate, endpoint health)
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `router_requests_total` (counter): route calls by outcome
//! - `router_request_duration_seconds` (histogram): route call latency
//! - `router_attempts_total` (counter): per-endpoint attempts by outcome
//! - `router_cache_lookups_total` (counter): cache hits and misses
//! - `router_cache_entries` (gauge): cached responses
//! - `router_in_flight_requests` (gauge): held gate slots
//! - `router_endpoint_health` (gauge): 1=healthy, 0=unhealthy
//! - `router_probe_duration_seconds` (histogram): health probe latency
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests that never call [`init_metrics`] pay nothing.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Install the Prometheus recorder and its HTTP listener. Must be called
/// from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// One finished `route` call.
pub fn record_route(outcome: &'static str, start: Instant) {
    ::metrics::counter!("router_requests_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("router_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// One attempt against one endpoint.
pub fn record_attempt(endpoint: &str, outcome: &'static str) {
    ::metrics::counter!(
        "router_attempts_total",
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    ::metrics::counter!("router_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_cache_size(entries: usize) {
    ::metrics::gauge!("router_cache_entries").set(entries as f64);
}

pub fn record_in_flight(in_flight: usize) {
    ::metrics::gauge!("router_in_flight_requests").set(in_flight as f64);
}

pub fn record_endpoint_health(endpoint: &str, healthy: bool) {
    ::metrics::gauge!("router_endpoint_health", "endpoint" => endpoint.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_probe(endpoint: &str, elapsed: Duration) {
    ::metrics::histogram!("router_probe_duration_seconds", "endpoint" => endpoint.to_string())
        .record(elapsed.as_secs_f64());
}
