//! Outbound transport.
//!
//! # Data Flow
//! ```text
//! Dispatcher / HealthMonitor
//!     → OutboundRequest (absolute URL, headers, timeout)
//!     → Transport::get
//!     → TransportResponse (status + raw body) or TransportError
//! ```
//!
//! # Design Decisions
//! - Non-2xx statuses are responses, not errors; classification belongs to
//!   the caller
//! - The timeout covers connect, send and body read
//! - The trait returns boxed futures so it can be used as `dyn Transport`

pub mod http;

use futures_util::future::BoxFuture;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub use self::http::HttpTransport;

/// A single outbound GET.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: Url,
    /// Extra headers on top of the transport defaults.
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl OutboundRequest {
    pub fn new(url: Url, timeout: Duration) -> Self {
        Self {
            url,
            headers: Vec::new(),
            timeout,
        }
    }
}

/// Status and raw body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    /// Body decoded as UTF-8. Invalid sequences become U+FFFD, so binary
    /// bodies are not byte-exact.
    pub body: String,
}

/// Errors that prevent a response from being received.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection error: {0}")]
    Connect(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Issues outbound HTTP GET requests.
pub trait Transport: Send + Sync {
    fn get(&self, request: OutboundRequest)
        -> BoxFuture<'_, Result<TransportResponse, TransportError>>;
}
