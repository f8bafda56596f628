//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Probe each endpoint's health path
//!     → Update endpoint status (registry::endpoint)
//!     → Append outcome to history.rs
//!
//! Passive health checks (passive.rs):
//!     Request outcome observed by the dispatcher
//!     → Increment or reset failure count
//!     → Append outcome to history.rs
//!
//! History (history.rs, store.rs):
//!     Ring buffer of recent outcomes per endpoint
//!     → persisted through a HealthHistoryStore
//!     → success rate fed back to the endpoint (eventually consistent)
//! ```
//!
//! # Design Decisions
//! - Active and passive checks are complementary; a probe success clears
//!   failures recorded by requests and vice versa
//! - Health state is per-endpoint, not per-capability
//! - Nothing here surfaces errors to `route` callers

pub mod active;
pub mod history;
pub mod passive;
pub mod store;

pub use active::{HealthMonitor, ProbeOutcome};
pub use history::{history_key, HealthHistory, HealthHistoryStore, HealthRecord, HistoryError, HistoryRecorder};
pub use store::{FileHistoryStore, MemoryHistoryStore};
