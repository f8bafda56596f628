//! Shutdown coordination for the router.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::resilience::ConcurrencyGate;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
/// When a gate is attached, triggering also closes it so queued and future
/// route calls end with `GateClosed` instead of starting new requests.
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
    gate: Option<Arc<ConcurrencyGate>>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx, gate: None }
    }

    /// Close `gate` when shutdown is triggered.
    pub fn with_gate(mut self, gate: Arc<ConcurrencyGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        if let Some(gate) = &self.gate {
            gate.close();
        }
        let _ = self.tx.send(());
    }

    /// Get the number of active subscribers (tasks still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
