//! In-memory response cache.
//!
//! Entries are fresh for a fixed TTL measured from when they were stored.
//! When a `put` pushes the entry count over the ceiling, the oldest batch of
//! entries is swept regardless of remaining TTL. This is a coarse batch
//! eviction, not LRU: reads do not refresh an entry.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::cache::CacheKey;
use crate::config::CacheConfig;
use crate::observability::metrics;

/// A cached successful response.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: Arc<str>,
    pub stored_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

/// Counters exposed through the admin API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub entries: usize,
    pub max_entries: usize,
    pub ttl_secs: u64,
    pub hits: u64,
    pub misses: u64,
}

/// A thread-safe TTL and size bounded cache.
#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<CacheKey, CacheEntry>,
    enabled: bool,
    ttl: Duration,
    max_entries: usize,
    sweep_batch: usize,
    /// Serializes sweeps so concurrent puts don't evict twice.
    sweep_lock: Mutex<()>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            enabled: config.enabled,
            ttl: config.ttl(),
            max_entries: config.max_entries.max(1),
            sweep_batch: config.sweep_batch.max(1),
            sweep_lock: Mutex::new(()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Override the freshness window.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Look up a fresh payload. Expired entries are removed and count as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<str>> {
        if !self.enabled {
            return None;
        }

        let found = match self.entries.get(key) {
            Some(entry) if entry.is_fresh(self.ttl) => Some(entry.payload.clone()),
            Some(entry) => {
                let stored_at = entry.stored_at;
                drop(entry);
                // Only remove the entry we judged stale, not a fresh replacement.
                self.entries.remove_if(key, |_, e| e.stored_at == stored_at);
                tracing::trace!(key = %key, "Cache entry expired");
                None
            }
            None => None,
        };

        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        metrics::record_cache_lookup(found.is_some());
        found
    }

    /// Store a payload, sweeping the oldest entries if over the ceiling.
    pub fn put(&self, key: CacheKey, payload: impl Into<Arc<str>>) {
        if !self.enabled {
            return;
        }

        self.entries.insert(
            key,
            CacheEntry {
                payload: payload.into(),
                stored_at: Instant::now(),
            },
        );

        if self.entries.len() > self.max_entries {
            self.sweep();
        }
        metrics::record_cache_size(self.entries.len());
    }

    /// Remove the `sweep_batch` entries with the oldest `stored_at`.
    fn sweep(&self) {
        let _guard = match self.sweep_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Another put may have swept while we waited.
        if self.entries.len() <= self.max_entries {
            return;
        }

        let mut by_age: Vec<(Instant, CacheKey)> = self
            .entries
            .iter()
            .map(|e| (e.value().stored_at, e.key().clone()))
            .collect();
        by_age.sort_by(|a, b| a.0.cmp(&b.0));

        let mut evicted = 0;
        for (_, key) in by_age.into_iter().take(self.sweep_batch) {
            if self.entries.remove(&key).is_some() {
                evicted += 1;
            }
        }
        tracing::debug!(evicted, remaining = self.entries.len(), "Cache sweep");
    }

    /// Drop every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.is_fresh(self.ttl));
        let removed = before.saturating_sub(self.entries.len());
        metrics::record_cache_size(self.entries.len());
        removed
    }

    /// Drop every entry. Returns the number removed.
    pub fn clear(&self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        metrics::record_cache_size(0);
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            enabled: self.enabled,
            entries: self.entries.len(),
            max_entries: self.max_entries,
            ttl_secs: self.ttl.as_secs(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::RequestOptions;
    use crate::registry::Capability;

    fn key(path: &str) -> CacheKey {
        CacheKey::new(&Capability::new("manga"), path, &RequestOptions::default())
    }

    fn cache(ttl_secs: u64) -> ResponseCache {
        ResponseCache::new(&CacheConfig {
            ttl_secs,
            ..Default::default()
        })
    }

    #[test]
    fn test_get_put() {
        let cache = cache(300);
        assert!(cache.get(&key("/a")).is_none());

        cache.put(key("/a"), "payload-a");
        assert_eq!(cache.get(&key("/a")).as_deref(), Some("payload-a"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_expired_is_miss() {
        let cache = cache(300).with_ttl(Duration::from_millis(20));
        cache.put(key("/old"), "stale");
        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get(&key("/old")).is_none());
        // Lazily evicted.
        assert!(cache.is_empty());
    }

    #[test]
    fn test_size_sweep_removes_oldest_batch() {
        let cache = ResponseCache::new(&CacheConfig::default());
        let base = Instant::now();
        for i in 0..100u64 {
            cache.entries.insert(
                key(&format!("/{i}")),
                CacheEntry {
                    payload: Arc::from(format!("p{i}")),
                    stored_at: base + Duration::from_nanos(i),
                },
            );
        }
        assert_eq!(cache.len(), 100);
        std::thread::sleep(Duration::from_millis(2));

        // The 101st entry triggers a sweep of the 20 oldest.
        cache.put(key("/new"), "fresh");
        assert_eq!(cache.len(), 81);
        for i in 0..20 {
            assert!(cache.get(&key(&format!("/{i}"))).is_none());
        }
        assert!(cache.get(&key("/20")).is_some());
        assert!(cache.get(&key("/new")).is_some());
    }

    #[test]
    fn test_size_never_exceeds_ceiling_plus_one() {
        let cache = cache(300);
        for i in 0..500 {
            cache.put(key(&format!("/{i}")), "x");
            assert!(cache.len() <= 101);
        }
    }

    #[test]
    fn test_disabled_cache() {
        let cache = ResponseCache::new(&CacheConfig {
            enabled: false,
            ..Default::default()
        });
        cache.put(key("/a"), "payload");
        assert!(cache.get(&key("/a")).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_and_clear() {
        let cache = cache(300).with_ttl(Duration::from_millis(20));
        cache.put(key("/stale"), "s");
        std::thread::sleep(Duration::from_millis(40));
        cache.put(key("/fresh"), "f");

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.clear(), 1);
        assert!(cache.is_empty());
    }
}
