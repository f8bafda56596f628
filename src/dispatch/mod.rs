//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! route(capability, path, options)
//!     → cache (fresh hit returns immediately)
//!     → registry::ranking (healthy ranked, then unhealthy ranked)
//!     → for each candidate:
//!         gate slot → transport GET → release slot
//!         → health::passive (status + history)
//!         → success: cache put, return
//!         → failure: delay per class, next candidate
//!     → RouteResult
//! ```

pub mod dispatcher;
pub mod options;
pub mod result;

pub use dispatcher::Dispatcher;
pub use options::RequestOptions;
pub use result::{RouteError, RouteFailure, RouteResult, RouteSuccess};
