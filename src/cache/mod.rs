//! Response caching subsystem.
//!
//! # Data Flow
//! ```text
//! route(capability, path, options)
//!     → key.rs (logical request identity)
//!     → response.rs get: fresh hit short-circuits the network
//!     → on success: response.rs put (size sweep if over the ceiling)
//! ```
//!
//! # Design Decisions
//! - Pure in-memory and best-effort; never persisted across restarts
//! - Freshness checked on read; no background expiry task
//! - Only successful responses are cached

pub mod key;
pub mod response;

pub use key::CacheKey;
pub use response::{CacheEntry, CacheStats, ResponseCache};
