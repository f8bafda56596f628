//! Attempt failure classification.
//!
//! # Responsibilities
//! - Map transport errors and HTTP statuses to a failure class
//! - Decide whether a failure counts against the endpoint
//! - Decide whether a failure is followed by exponential backoff
//!
//! # Design Decisions
//! - 429 is not the endpoint's fault: no failure count, fixed delay
//! - Timeouts and connection errors back off exponentially
//! - Other non-2xx statuses count as failures but move on immediately
//! - Malformed requests are ours: no penalty, no delay

use serde::Serialize;
use std::fmt;

use crate::transport::TransportError;

/// Why a single attempt against one endpoint failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum AttemptFailure {
    /// HTTP 429.
    RateLimited,
    /// The attempt exceeded the request timeout.
    Timeout,
    /// Connection refused, reset, DNS failure, unreadable body.
    Network,
    /// Any other non-2xx status.
    HttpStatus(u16),
    /// The request could not be built for this endpoint.
    InvalidRequest,
}

impl AttemptFailure {
    /// Classify a response status; `None` for success (2xx).
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            429 => Some(AttemptFailure::RateLimited),
            other => Some(AttemptFailure::HttpStatus(other)),
        }
    }

    pub fn from_transport(err: &TransportError) -> Self {
        match err {
            TransportError::Timeout(_) => AttemptFailure::Timeout,
            TransportError::Connect(_) | TransportError::Body(_) => AttemptFailure::Network,
            TransportError::InvalidRequest(_) => AttemptFailure::InvalidRequest,
        }
    }

    /// Whether the failure increments the endpoint's consecutive failures.
    pub fn counts_against_endpoint(&self) -> bool {
        matches!(
            self,
            AttemptFailure::Timeout | AttemptFailure::Network | AttemptFailure::HttpStatus(_)
        )
    }

    /// Whether the failure is followed by exponential backoff.
    pub fn backs_off(&self) -> bool {
        matches!(self, AttemptFailure::Timeout | AttemptFailure::Network)
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            AttemptFailure::RateLimited => "rate_limited",
            AttemptFailure::Timeout => "timeout",
            AttemptFailure::Network => "network",
            AttemptFailure::HttpStatus(_) => "http_status",
            AttemptFailure::InvalidRequest => "invalid_request",
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::RateLimited => write!(f, "rate limited (429)"),
            AttemptFailure::Timeout => write!(f, "timeout"),
            AttemptFailure::Network => write!(f, "network error"),
            AttemptFailure::HttpStatus(status) => write!(f, "HTTP {}", status),
            AttemptFailure::InvalidRequest => write!(f, "invalid request"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_classification() {
        assert_eq!(AttemptFailure::from_status(200), None);
        assert_eq!(AttemptFailure::from_status(204), None);
        assert_eq!(
            AttemptFailure::from_status(429),
            Some(AttemptFailure::RateLimited)
        );
        assert_eq!(
            AttemptFailure::from_status(503),
            Some(AttemptFailure::HttpStatus(503))
        );
        assert_eq!(
            AttemptFailure::from_status(404),
            Some(AttemptFailure::HttpStatus(404))
        );
    }

    #[test]
    fn test_transport_classification() {
        let timeout = TransportError::Timeout(Duration::from_secs(1));
        assert_eq!(AttemptFailure::from_transport(&timeout), AttemptFailure::Timeout);
        let refused = TransportError::Connect("refused".into());
        assert_eq!(AttemptFailure::from_transport(&refused), AttemptFailure::Network);
    }

    #[test]
    fn test_policy() {
        assert!(!AttemptFailure::RateLimited.counts_against_endpoint());
        assert!(!AttemptFailure::RateLimited.backs_off());

        assert!(AttemptFailure::Timeout.counts_against_endpoint());
        assert!(AttemptFailure::Timeout.backs_off());
        assert!(AttemptFailure::Network.backs_off());

        assert!(AttemptFailure::HttpStatus(500).counts_against_endpoint());
        assert!(!AttemptFailure::HttpStatus(500).backs_off());

        assert!(!AttemptFailure::InvalidRequest.counts_against_endpoint());
    }
}
