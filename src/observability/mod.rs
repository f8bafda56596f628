//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events; route calls carry a request-id span)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID (UUID v4) flows through every event of a route call
//! - Metrics are cheap and no-ops without an installed recorder

pub mod logging;
pub mod metrics;
