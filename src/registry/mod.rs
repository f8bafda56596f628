//! Endpoint registry subsystem.
//!
//! # Data Flow
//! ```text
//! route(capability, ...)
//!     → pool.rs (endpoints serving the capability)
//!     → ranking.rs (healthy by success rate, then latency; unhealthy last)
//!     → endpoint.rs (live status read from atomics)
//!     → ordered candidate list handed to the dispatcher
//! ```
//!
//! # Design Decisions
//! - The endpoint set is fixed after construction; only status changes
//! - Status is per-endpoint and lock-free
//! - Ranking snapshots each endpoint once so concurrent updates cannot
//!   produce an inconsistent order

pub mod capability;
pub mod endpoint;
pub mod pool;
pub mod ranking;

pub use capability::Capability;
pub use endpoint::{Endpoint, EndpointStatus, HealthState};
pub use pool::{EndpointRegistry, RegistryError};
