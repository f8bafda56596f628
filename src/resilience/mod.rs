//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt against an endpoint:
//!     → gate.rs (wait for an in-flight slot)
//!     → transport enforces the request timeout
//!     → On failure: retries.rs (classify: rate limited, transient, status)
//!     → backoff.rs (delay before the next candidate)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every outbound call has a deadline
//! - A failed endpoint is never retried within the same call; the next
//!   candidate is tried instead
//! - Concurrency is bounded globally, not per endpoint

pub mod backoff;
pub mod gate;
pub mod retries;

pub use gate::{ConcurrencyGate, GateClosed, GatePermit};
pub use retries::AttemptFailure;
