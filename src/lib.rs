//! Resilient multi-endpoint request router.
//!
//! Routes each logical request to the best currently-available backend among
//! several functionally equivalent endpoints, caches successful responses,
//! bounds outbound concurrency and recovers from timeouts, rate limiting and
//! endpoint failure.

// Core subsystems
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod registry;
pub mod transport;

// Endpoint health
pub mod health;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::RouterConfig;
pub use dispatch::{Dispatcher, RequestOptions, RouteError, RouteResult};
pub use lifecycle::{RouterService, Shutdown};
pub use registry::Capability;
