//! Rolling health history per endpoint.
//!
//! # Responsibilities
//! - Keep the most recent outcomes per endpoint in a ring buffer
//! - Persist the buffer as JSON through a [`HealthHistoryStore`]
//! - Recompute the endpoint success rate from the buffer
//!
//! # Design Decisions
//! - Writes are fire-and-forget from the request and probe paths, so the
//!   success rate an endpoint is ranked by may lag the latest outcome
//! - Read-modify-write is serialized per key so concurrent outcomes for the
//!   same endpoint are never lost
//! - Store failures are logged and swallowed; history is advisory
//! - Background writes are counted so short-lived processes can
//!   [`HistoryRecorder::flush`] before the runtime is dropped

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use crate::registry::endpoint::{now_millis, Endpoint};

/// Errors raised by a history store.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("history serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistent key-value storage for serialized histories.
pub trait HealthHistoryStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, HistoryError>>;

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), HistoryError>>;
}

/// Store key for an endpoint, derived from its URL.
pub fn history_key(url: &str) -> String {
    format!("endpoint-health:{}", url.trim_end_matches('/'))
}

/// One recorded outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecord {
    /// Epoch milliseconds.
    pub timestamp: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
}

impl HealthRecord {
    pub fn success(response_time_ms: u64) -> Self {
        Self {
            timestamp: now_millis(),
            success: true,
            response_time_ms: Some(response_time_ms),
        }
    }

    pub fn failure() -> Self {
        Self {
            timestamp: now_millis(),
            success: false,
            response_time_ms: None,
        }
    }
}

/// Bounded ring buffer of outcomes, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthHistory {
    records: VecDeque<HealthRecord>,
    capacity: usize,
}

impl HealthHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Decode a persisted buffer, keeping only the newest `capacity` records.
    pub fn from_json(json: &str, capacity: usize) -> Result<Self, HistoryError> {
        let records: Vec<HealthRecord> = serde_json::from_str(json)?;
        let mut history = Self::new(capacity);
        for record in records {
            history.push(record);
        }
        Ok(history)
    }

    pub fn to_json(&self) -> Result<String, HistoryError> {
        Ok(serde_json::to_string(&self.records)?)
    }

    /// Append an outcome, dropping the oldest when full.
    pub fn push(&mut self, record: HealthRecord) {
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// `successes / len * 100`, or `None` with no records.
    pub fn success_rate(&self) -> Option<f64> {
        if self.records.is_empty() {
            return None;
        }
        let successes = self.records.iter().filter(|r| r.success).count();
        Some(successes as f64 / self.records.len() as f64 * 100.0)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &HealthRecord> {
        self.records.iter()
    }
}

/// Appends outcomes to the store and feeds success rates back to endpoints.
pub struct HistoryRecorder {
    store: Arc<dyn HealthHistoryStore>,
    capacity: usize,
    locks: DashMap<String, Arc<Mutex<()>>>,
    /// Background writes spawned by `record` and not yet finished.
    pending: AtomicUsize,
    idle: Notify,
}

/// Decrements the pending count when a background write ends, even if the
/// task is cancelled.
struct PendingWrite(Arc<HistoryRecorder>);

impl Drop for PendingWrite {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

impl HistoryRecorder {
    pub fn new(store: Arc<dyn HealthHistoryStore>, capacity: usize) -> Self {
        Self {
            store,
            capacity: capacity.max(1),
            locks: DashMap::new(),
            pending: AtomicUsize::new(0),
            idle: Notify::new(),
        }
    }

    /// Record an outcome in the background. The returned handle may be
    /// dropped; awaiting it observes the updated success rate.
    pub fn record(self: &Arc<Self>, endpoint: Arc<Endpoint>, record: HealthRecord) -> JoinHandle<()> {
        self.pending.fetch_add(1, Ordering::AcqRel);
        let guard = PendingWrite(self.clone());
        tokio::spawn(async move {
            let recorder = guard.0.clone();
            if let Err(e) = recorder.append(&endpoint, record).await {
                tracing::warn!(endpoint = %endpoint.name, error = %e, "Failed to persist health history");
            }
            drop(guard);
        })
    }

    /// Number of background writes still running.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Wait until every write started by [`record`](Self::record) has
    /// reached the store.
    pub async fn flush(&self) {
        loop {
            let idle = self.idle.notified();
            tokio::pin!(idle);
            // Register before checking so a wakeup in between is not missed.
            idle.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            idle.await;
        }
    }

    /// Append an outcome and update the endpoint's success rate.
    pub async fn append(&self, endpoint: &Endpoint, record: HealthRecord) -> Result<f64, HistoryError> {
        let key = history_key(endpoint.url());
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let mut history = self.load(&key).await?;
        history.push(record);
        self.store.set(&key, history.to_json()?).await?;

        let rate = history.success_rate().unwrap_or(100.0);
        endpoint.set_success_rate(rate);
        tracing::trace!(endpoint = %endpoint.name, rate, samples = history.len(), "Success rate updated");
        Ok(rate)
    }

    /// Load persisted history into an endpoint's success rate (startup).
    pub async fn restore(&self, endpoint: &Endpoint) -> Result<Option<f64>, HistoryError> {
        let history = self.load(&history_key(endpoint.url())).await?;
        let rate = history.success_rate();
        if let Some(rate) = rate {
            endpoint.set_success_rate(rate);
            tracing::debug!(endpoint = %endpoint.name, rate, samples = history.len(), "Restored health history");
        }
        Ok(rate)
    }

    /// Current history for an endpoint.
    pub async fn history(&self, endpoint: &Endpoint) -> Result<HealthHistory, HistoryError> {
        self.load(&history_key(endpoint.url())).await
    }

    async fn load(&self, key: &str) -> Result<HealthHistory, HistoryError> {
        match self.store.get(key).await? {
            Some(json) => match HealthHistory::from_json(&json, self.capacity) {
                Ok(history) => Ok(history),
                Err(e) => {
                    tracing::warn!(key, error = %e, "Discarding unreadable health history");
                    Ok(HealthHistory::new(self.capacity))
                }
            },
            None => Ok(HealthHistory::new(self.capacity)),
        }
    }
}

impl std::fmt::Debug for HistoryRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryRecorder")
            .field("capacity", &self.capacity)
            .finish()
    }
}
