//! Counters for cache traffic and reload behavior.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters accumulated by a [`ReadCache`](super::ReadCache) since
/// construction. Cheap to bump from any thread; read via
/// [`snapshot`](Self::snapshot).
#[derive(Default)]
pub struct CacheMetrics {
    resolve_calls: AtomicU64,
    resolve_hits: AtomicU64,
    resolve_misses: AtomicU64,
    find_calls: AtomicU64,
    reload_fetches: AtomicU64,
    reload_coalesced: AtomicU64,
    reload_failures: AtomicU64,
}

/// Point-in-time copy of [`CacheMetrics`].
#[derive(Clone, Copy, Debug, Default)]
pub struct CacheMetricsSnapshot {
    /// Identifier resolutions attempted.
    pub resolve_calls: u64,
    /// Resolutions served by the live snapshot without a reload.
    pub resolve_hits: u64,
    /// Resolutions that came back empty and triggered a reload.
    pub resolve_misses: u64,
    /// Pattern searches (each one implies a reload attempt).
    pub find_calls: u64,
    /// Reloads that fetched the name table from the backing store.
    pub reload_fetches: u64,
    /// Reloads satisfied by a snapshot a concurrent caller had just built.
    pub reload_coalesced: u64,
    /// Reloads that failed and left the previous snapshot in place.
    pub reload_failures: u64,
}

impl CacheMetricsSnapshot {
    /// Fraction of resolutions served without touching the store.
    pub fn resolve_hit_rate(&self) -> f64 {
        if self.resolve_calls == 0 {
            return 0.0;
        }
        self.resolve_hits as f64 / self.resolve_calls as f64
    }
}

impl CacheMetrics {
    /// Copies the current counter values.
    pub fn snapshot(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            resolve_calls: self.resolve_calls.load(Ordering::Relaxed),
            resolve_hits: self.resolve_hits.load(Ordering::Relaxed),
            resolve_misses: self.resolve_misses.load(Ordering::Relaxed),
            find_calls: self.find_calls.load(Ordering::Relaxed),
            reload_fetches: self.reload_fetches.load(Ordering::Relaxed),
            reload_coalesced: self.reload_coalesced.load(Ordering::Relaxed),
            reload_failures: self.reload_failures.load(Ordering::Relaxed),
        }
    }

    fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn resolve_call(&self) {
        self.inc(&self.resolve_calls);
    }

    pub(super) fn resolve_hit(&self) {
        self.inc(&self.resolve_hits);
    }

    pub(super) fn resolve_miss(&self) {
        self.inc(&self.resolve_misses);
    }

    pub(super) fn find_call(&self) {
        self.inc(&self.find_calls);
    }

    pub(super) fn reload_fetch(&self) {
        self.inc(&self.reload_fetches);
    }

    pub(super) fn reload_coalesce(&self) {
        self.inc(&self.reload_coalesced);
    }

    pub(super) fn reload_failure(&self) {
        self.inc(&self.reload_failures);
    }
}
