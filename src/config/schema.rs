//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the endpoint router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Candidate backend endpoints.
    pub endpoints: Vec<EndpointConfig>,

    /// Request dispatch settings (concurrency, timeouts, backoff).
    pub dispatch: DispatchConfig,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Health history persistence.
    pub history: HistoryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// A single backend endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// Unique endpoint identifier for logging/metrics.
    pub name: String,

    /// Base URL requests are appended to (e.g., "https://api.example.org/v1").
    pub base_url: String,

    /// Capability classes this endpoint can serve.
    pub capabilities: Vec<String>,

    /// Per-endpoint override of the health probe path.
    #[serde(default)]
    pub health_path: Option<String>,
}

/// Dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum outbound requests in flight across all endpoints.
    pub max_concurrent_requests: usize,

    /// Per-attempt request timeout in milliseconds.
    pub request_timeout_ms: u64,

    /// Delay after an endpoint answers 429, in milliseconds.
    pub rate_limit_delay_ms: u64,

    /// Base delay for exponential backoff in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub retry_max_delay_ms: u64,

    /// Add up to 10% random jitter to backoff delays.
    pub retry_jitter: bool,

    /// Client identifier sent as the User-Agent header.
    pub client_id: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 2,
            request_timeout_ms: 10_000,
            rate_limit_delay_ms: 1_000,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 8_000,
            retry_jitter: false,
            client_id: concat!("endpoint-router/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl DispatchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable response caching.
    pub enabled: bool,

    /// Entry freshness window in seconds.
    pub ttl_secs: u64,

    /// Entry count above which a sweep runs.
    pub max_entries: usize,

    /// Number of oldest entries removed per sweep.
    pub sweep_batch: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 300,
            max_entries: 100,
            sweep_batch: 20,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health checks.
    pub enabled: bool,

    /// Health check interval in seconds.
    pub interval_secs: u64,

    /// Health check timeout in seconds.
    pub timeout_secs: u64,

    /// Path to probe for HTTP health checks.
    pub path: String,

    /// Number of consecutive failures before an endpoint is forced unhealthy.
    pub failure_threshold: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
            timeout_secs: 5,
            path: "/health".to_string(),
            failure_threshold: 3,
        }
    }
}

/// Where health history is persisted.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    /// In-process only; lost on restart.
    #[default]
    Memory,
    /// One JSON file per endpoint under `directory`.
    File,
}

/// Health history configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub backend: HistoryBackend,

    /// Directory for the file backend.
    pub directory: Option<PathBuf>,

    /// Outcomes retained per endpoint (ring buffer size).
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            backend: HistoryBackend::Memory,
            directory: None,
            capacity: 20,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Full,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
