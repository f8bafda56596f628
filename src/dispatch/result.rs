//! Route outcomes.

use serde::Serialize;
use std::sync::Arc;

use crate::resilience::AttemptFailure;

/// Why a route call produced no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RouteError {
    /// Every candidate endpoint failed; `last` is the final attempt's failure.
    Exhausted { last: AttemptFailure },
    /// No endpoint is registered for the capability.
    NoEndpoints,
    /// The service is shutting down.
    GateClosed,
}

/// Successful route call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSuccess {
    /// Raw response body.
    pub payload: Arc<str>,
    /// Endpoint that served the response; `None` on a cache hit.
    pub endpoint: Option<String>,
    /// Failed attempts before this success.
    pub retries: u32,
    pub cache_hit: bool,
}

/// Unsuccessful route call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteFailure {
    pub error: RouteError,
    /// Message of the last error.
    pub message: String,
    /// Attempts made.
    pub retries: u32,
}

/// Result of [`Dispatcher::route`](crate::dispatch::Dispatcher::route).
/// Every outcome is a value; `route` never panics or returns `Err`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RouteResult {
    Success(RouteSuccess),
    Failure(RouteFailure),
}

impl RouteResult {
    pub fn is_success(&self) -> bool {
        matches!(self, RouteResult::Success(_))
    }

    pub fn payload(&self) -> Option<&str> {
        match self {
            RouteResult::Success(s) => Some(&s.payload),
            RouteResult::Failure(_) => None,
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        match self {
            RouteResult::Success(s) => s.endpoint.as_deref(),
            RouteResult::Failure(_) => None,
        }
    }

    pub fn retries(&self) -> u32 {
        match self {
            RouteResult::Success(s) => s.retries,
            RouteResult::Failure(f) => f.retries,
        }
    }

    pub fn cache_hit(&self) -> bool {
        matches!(self, RouteResult::Success(s) if s.cache_hit)
    }

    pub fn error(&self) -> Option<&RouteError> {
        match self {
            RouteResult::Success(_) => None,
            RouteResult::Failure(f) => Some(&f.error),
        }
    }

    /// Convert into a `Result` for callers that prefer `?`.
    pub fn into_result(self) -> Result<RouteSuccess, RouteFailure> {
        match self {
            RouteResult::Success(s) => Ok(s),
            RouteResult::Failure(f) => Err(f),
        }
    }

    pub(crate) fn outcome_label(&self) -> &'static str {
        match self {
            RouteResult::Success(s) if s.cache_hit => "cache_hit",
            RouteResult::Success(_) => "success",
            RouteResult::Failure(RouteFailure { error: RouteError::Exhausted { .. }, .. }) => "exhausted",
            RouteResult::Failure(RouteFailure { error: RouteError::NoEndpoints, .. }) => "no_endpoints",
            RouteResult::Failure(RouteFailure { error: RouteError::GateClosed, .. }) => "gate_closed",
        }
    }
}
