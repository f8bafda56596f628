//! Structured logging.
//!
//! # Responsibilities
//! - Install the global `tracing` subscriber
//! - Pick the log level from `RUST_LOG`, falling back to config
//!
//! # Design Decisions
//! - `RUST_LOG` wins so operators can raise verbosity without editing config
//! - Compact format is meant for terminals; full format for log collectors
//! - Events go to stderr so `fetch` can print the payload alone on stdout

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Install the global subscriber. Call once, from the binary.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Full => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

/// Config level for this crate and its HTTP layers; everything else at warn.
fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(format!(
        "warn,endpoint_router={level},router_cli={level},tower_http={level}"
    ))
    .unwrap_or_else(|_| EnvFilter::new("info"))
}
