//! Endpoint abstraction.
//!
//! # Responsibilities
//! - Represent a single backend base URL and its capabilities
//! - Track live status (health, failures, latency, success rate)
//! - Enforce the consecutive-failure threshold
//!
//! All status fields are atomics so the dispatcher and the health monitor can
//! update them concurrently without a lock. Health state and the failure
//! count share one word, so a success racing a failure can never leave the
//! endpoint unhealthy with a zero count. The other fields in
//! [`Endpoint::status`] are read separately and may be a moment apart.

use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

use crate::registry::Capability;

/// Health State enum.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Never probed and never used; treated as healthy.
    Unknown = 0,
    Healthy = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Healthy,
            2 => HealthState::Unhealthy,
            _ => HealthState::Unknown,
        }
    }
}

const UNKNOWN_LATENCY: u64 = u64::MAX;
const NEVER: u64 = 0;

/// State in bits 32..40, consecutive failures in bits 0..32.
fn pack(state: HealthState, failures: u32) -> u64 {
    ((state as u64) << 32) | u64::from(failures)
}

fn unpack(bits: u64) -> (HealthState, u32) {
    (HealthState::from((bits >> 32) as u8), bits as u32)
}

/// Point-in-time view of an endpoint's status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointStatus {
    pub name: String,
    pub url: String,
    pub capabilities: Vec<Capability>,
    pub is_healthy: bool,
    pub state: HealthState,
    /// Epoch milliseconds of the last health probe.
    pub last_checked_at: Option<u64>,
    pub last_response_time_ms: Option<u64>,
    pub consecutive_failures: u32,
    pub success_rate_pct: f64,
}

/// A single backend endpoint.
#[derive(Debug)]
pub struct Endpoint {
    /// Operator-facing identifier.
    pub name: String,
    /// Base URL request paths are appended to.
    pub base_url: Url,
    /// Path probed by the health monitor.
    pub health_path: String,
    /// Capability classes served.
    pub capabilities: BTreeSet<Capability>,

    /// Consecutive failures that force the endpoint unhealthy.
    failure_threshold: u32,

    /// Health state and consecutive failure count, see [`pack`].
    health: AtomicU64,
    /// Epoch millis of last probe, 0 if never probed.
    last_checked_at: AtomicU64,
    /// Latency of the last success in millis, `u64::MAX` if unknown.
    last_response_time_ms: AtomicU64,
    /// `f64` bits of the success rate percentage.
    success_rate_bits: AtomicU64,
}

impl Endpoint {
    /// Create a new endpoint with an optimistic initial status.
    pub fn new(
        name: impl Into<String>,
        base_url: Url,
        capabilities: impl IntoIterator<Item = Capability>,
        health_path: impl Into<String>,
        failure_threshold: u32,
    ) -> Self {
        Self {
            name: name.into(),
            base_url,
            health_path: health_path.into(),
            capabilities: capabilities.into_iter().collect(),
            failure_threshold: failure_threshold.max(1),
            health: AtomicU64::new(pack(HealthState::Unknown, 0)),
            last_checked_at: AtomicU64::new(NEVER),
            last_response_time_ms: AtomicU64::new(UNKNOWN_LATENCY),
            success_rate_bits: AtomicU64::new(100f64.to_bits()),
        }
    }

    /// Whether this endpoint serves the given capability.
    pub fn serves(&self, capability: &Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Base URL as a string, with any trailing slash removed.
    pub fn url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Absolute URL for `{base}{path}`. A missing leading slash is added.
    pub fn resolve(&self, path: &str) -> Result<Url, url::ParseError> {
        if path.is_empty() {
            return Ok(self.base_url.clone());
        }
        let separator = if path.starts_with('/') { "" } else { "/" };
        Url::parse(&format!("{}{}{}", self.url(), separator, path))
    }

    // --- Health Logic ---

    /// Return true if the endpoint is eligible for the ranked healthy set.
    /// Never true while the failure count is at or over the threshold.
    pub fn is_healthy(&self) -> bool {
        self.healthy_from(self.health.load(Ordering::Acquire))
    }

    fn healthy_from(&self, bits: u64) -> bool {
        let (state, failures) = unpack(bits);
        state != HealthState::Unhealthy && failures < self.failure_threshold
    }

    pub fn state(&self) -> HealthState {
        unpack(self.health.load(Ordering::Acquire)).0
    }

    pub fn consecutive_failures(&self) -> u32 {
        unpack(self.health.load(Ordering::Acquire)).1
    }

    pub fn success_rate_pct(&self) -> f64 {
        f64::from_bits(self.success_rate_bits.load(Ordering::Acquire))
    }

    pub fn last_response_time_ms(&self) -> Option<u64> {
        match self.last_response_time_ms.load(Ordering::Acquire) {
            UNKNOWN_LATENCY => None,
            ms => Some(ms),
        }
    }

    /// Report a successful request or probe.
    pub fn mark_success(&self, response_time_ms: u64) {
        self.last_response_time_ms
            .store(response_time_ms.min(UNKNOWN_LATENCY - 1), Ordering::Release);
        let previous = self
            .health
            .swap(pack(HealthState::Healthy, 0), Ordering::AcqRel);
        if unpack(previous).0 == HealthState::Unhealthy {
            tracing::info!(endpoint = %self.name, "Endpoint recovered");
        }
    }

    /// Report a failed request.
    ///
    /// Returns true if this failure pushed the endpoint over the threshold.
    pub fn mark_failure(&self) -> bool {
        let threshold = self.failure_threshold;
        let (previous, failures) = self.update_health(|state, failures| {
            if failures >= threshold {
                HealthState::Unhealthy
            } else {
                state
            }
        });
        failures >= threshold && previous != HealthState::Unhealthy
    }

    /// Report a failed health probe. Probes are authoritative, so a single
    /// failure marks the endpoint unhealthy.
    pub fn mark_probe_failure(&self) {
        self.update_health(|_, _| HealthState::Unhealthy);
    }

    /// Increment the failure count and pick the new state from the old state
    /// and the new count, as one atomic step. Returns the old state and the
    /// new count.
    fn update_health(&self, next: impl Fn(HealthState, u32) -> HealthState) -> (HealthState, u32) {
        let bits = match self
            .health
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                let (state, failures) = unpack(bits);
                let failures = failures.saturating_add(1);
                Some(pack(next(state, failures), failures))
            }) {
            Ok(bits) | Err(bits) => bits,
        };
        let (state, failures) = unpack(bits);
        (state, failures.saturating_add(1))
    }

    /// Record the time of a health probe.
    pub fn touch_checked(&self) {
        self.last_checked_at.store(now_millis(), Ordering::Release);
    }

    /// Replace the success rate (computed from recorded history).
    pub fn set_success_rate(&self, pct: f64) {
        let pct = if pct.is_finite() { pct.clamp(0.0, 100.0) } else { 0.0 };
        self.success_rate_bits.store(pct.to_bits(), Ordering::Release);
    }

    /// Best-effort snapshot of the current status.
    pub fn status(&self) -> EndpointStatus {
        let last_checked_at = match self.last_checked_at.load(Ordering::Acquire) {
            NEVER => None,
            ms => Some(ms),
        };
        let health = self.health.load(Ordering::Acquire);
        let (state, consecutive_failures) = unpack(health);
        EndpointStatus {
            name: self.name.clone(),
            url: self.url().to_string(),
            capabilities: self.capabilities.iter().cloned().collect(),
            is_healthy: self.healthy_from(health),
            state,
            last_checked_at,
            last_response_time_ms: self.last_response_time_ms(),
            consecutive_failures,
            success_rate_pct: self.success_rate_pct(),
        }
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
