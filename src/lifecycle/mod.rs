//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Registry/Cache/Gate/Transport/History → Dispatcher
//!     → restore history → spawn health monitor + admin API
//!
//! Shutdown (shutdown.rs):
//!     Trigger → close gate → broadcast stop → tasks exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then background tasks
//! - Shutdown has a timeout per task

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
pub use startup::{RouterService, StartupError};
