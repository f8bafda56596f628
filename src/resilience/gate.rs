//! Outbound concurrency gate.
//!
//! # Responsibilities
//! - Bound the number of requests in flight across all endpoints
//! - Queue waiters (tokio's semaphore is FIFO) without blocking the runtime
//! - Release slots through an RAII permit
//!
//! Health probes do not pass through the gate.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::observability::metrics;

/// The gate was closed (the service is shutting down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("concurrency gate closed")]
pub struct GateClosed;

/// Bounds simultaneous outbound requests.
#[derive(Debug)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl ConcurrencyGate {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> Result<GatePermit, GateClosed> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| GateClosed)?;
        metrics::record_in_flight(self.in_flight());
        Ok(GatePermit {
            permit: Some(permit),
            semaphore: self.semaphore.clone(),
            limit: self.limit,
        })
    }

    /// Take a slot only if one is free right now.
    pub fn try_acquire(&self) -> Option<GatePermit> {
        let permit = self.semaphore.clone().try_acquire_owned().ok()?;
        metrics::record_in_flight(self.in_flight());
        Some(GatePermit {
            permit: Some(permit),
            semaphore: self.semaphore.clone(),
            limit: self.limit,
        })
    }

    /// Number of slots currently held.
    pub fn in_flight(&self) -> usize {
        self.limit.saturating_sub(self.semaphore.available_permits())
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Fail all pending and future `acquire` calls. Held permits stay valid.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }
}

/// A held gate slot. Released on drop.
#[derive(Debug)]
pub struct GatePermit {
    permit: Option<OwnedSemaphorePermit>,
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl GatePermit {
    /// Release the slot explicitly.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        drop(self.permit.take());
        metrics::record_in_flight(self.limit.saturating_sub(self.semaphore.available_permits()));
    }
}
