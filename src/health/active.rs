//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every endpoint's health path
//! - Update endpoint status and history from the result

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::health::history::{HealthRecord, HistoryRecorder};
use crate::observability::metrics;
use crate::registry::{Endpoint, EndpointRegistry};
use crate::transport::{OutboundRequest, Transport};

/// Outcome of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy { response_time_ms: u64 },
    Unhealthy,
}

pub struct HealthMonitor {
    registry: Arc<EndpointRegistry>,
    recorder: Arc<HistoryRecorder>,
    transport: Arc<dyn Transport>,
    config: HealthCheckConfig,
}

impl HealthMonitor {
    pub fn new(
        registry: Arc<EndpointRegistry>,
        recorder: Arc<HistoryRecorder>,
        transport: Arc<dyn Transport>,
        config: HealthCheckConfig,
    ) -> Self {
        Self {
            registry,
            recorder,
            transport,
            config,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            path = %self.config.path,
            endpoints = self.registry.len(),
            "Health monitor starting"
        );

        let interval = Duration::from_secs(self.config.interval_secs.max(1));
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every endpoint once, concurrently.
    pub async fn check_all(&self) -> Vec<ProbeOutcome> {
        let probes = self
            .registry
            .all_endpoints()
            .iter()
            .map(|endpoint| self.check(endpoint.clone()));
        join_all(probes).await
    }

    /// Probe one endpoint and apply the result.
    pub async fn check(&self, endpoint: Arc<Endpoint>) -> ProbeOutcome {
        let outcome = self.probe(&endpoint).await;
        endpoint.touch_checked();

        match outcome {
            ProbeOutcome::Healthy { response_time_ms } => {
                endpoint.mark_success(response_time_ms);
                let _ = self
                    .recorder
                    .record(endpoint.clone(), HealthRecord::success(response_time_ms));
            }
            ProbeOutcome::Unhealthy => {
                endpoint.mark_probe_failure();
                let _ = self.recorder.record(endpoint.clone(), HealthRecord::failure());
            }
        }

        metrics::record_endpoint_health(&endpoint.name, endpoint.is_healthy());
        outcome
    }

    async fn probe(&self, endpoint: &Endpoint) -> ProbeOutcome {
        let url = match endpoint.resolve(&endpoint.health_path) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(endpoint = %endpoint.name, error = %e, "Failed to build health check URL");
                return ProbeOutcome::Unhealthy;
            }
        };

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let start = Instant::now();
        let result = self.transport.get(OutboundRequest::new(url, timeout)).await;
        let elapsed = start.elapsed();
        metrics::record_probe(&endpoint.name, elapsed);

        match result {
            Ok(response) if (200..300).contains(&response.status) => ProbeOutcome::Healthy {
                response_time_ms: elapsed.as_millis() as u64,
            },
            Ok(response) => {
                tracing::warn!(endpoint = %endpoint.name, status = response.status, "Health check failed: non-success status");
                ProbeOutcome::Unhealthy
            }
            Err(e) => {
                tracing::warn!(endpoint = %endpoint.name, error = %e, "Health check failed");
                ProbeOutcome::Unhealthy
            }
        }
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("endpoints", &self.registry.len())
            .field("config", &self.config)
            .finish()
    }
}
