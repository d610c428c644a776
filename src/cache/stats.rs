//! Cache Statistics Module
//!
//! Tracks lookup outcomes per tier and builds the stats report exposed to monitoring.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Counters ==
/// Lock-free lookup counters shared by all callers of the cache service.
#[derive(Debug, Default)]
pub struct CacheCounters {
    remote_hits: AtomicU64,
    fallback_hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl CacheCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_remote_hit(&self) {
        self.remote_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback_hit(&self) {
        self.fallback_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the current counter values.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            remote_hits: self.remote_hits.load(Ordering::Relaxed),
            fallback_hits: self.fallback_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fallback_evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

// == Counter Snapshot ==
/// Point-in-time copy of [`CacheCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub remote_hits: u64,
    pub fallback_hits: u64,
    pub misses: u64,
    pub fallback_evictions: u64,
}

impl CounterSnapshot {
    // == Hit Rate ==
    /// Returns hits / (hits + misses) across both tiers, or 0.0 with no lookups.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.remote_hits + self.fallback_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

// == Cache Stats ==
/// Stats report served to the monitoring surface.
///
/// Remote fields are omitted when the remote store is disconnected or INFO failed.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub remote_connected: bool,
    pub fallback_cache_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_memory_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_connected_clients: Option<u64>,
    #[serde(flatten)]
    pub counters: CounterSnapshot,
    pub hit_rate: f64,
}
