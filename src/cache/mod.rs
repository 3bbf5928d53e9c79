//! Read-through cache over the backing store's name table.
//!
//! Serves identifier resolution from an immutable [`NameIndex`]
//! snapshot and refreshes it lazily. A resolution that comes back empty
//! assumes the snapshot is stale rather than the name unknown (new
//! series appear continuously), refetches the table once, and retries.
//! Pattern search refetches before every walk: it is the interactive
//! discovery path, where staleness is most visible. A failed refetch
//! leaves the previous snapshot authoritative.

#![forbid(unsafe_code)]

mod metrics;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::index::{FindNode, NameIndex};
use crate::model::{DataSource, Series};
use crate::store::{Fetcher, MemStore, NameSupplier, SeriesSupplier};
use crate::types::{DsId, Result, Timestamp};

pub use metrics::{CacheMetrics, CacheMetricsSnapshot};

/// Tuning knobs for [`ReadCache`].
#[derive(Clone, Debug)]
pub struct CacheOptions {
    /// Skip the fetch when a concurrent reload completed while this
    /// caller was waiting its turn; misses that stampede after the same
    /// new series then share one fetch. Explicit [`ReadCache::reload`]
    /// calls and pattern searches always fetch regardless.
    pub coalesce_reloads: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self { coalesce_reloads: true }
    }
}

struct Slot {
    index: Arc<NameIndex>,
    generation: u64,
}

/// Read-through name cache wrapping a backing [`Fetcher`].
///
/// Lookups never block reloads and reloads never block lookups beyond
/// the moment the fresh snapshot is swapped in: the replacement index is
/// built off to the side and installed whole, so a reader holds either
/// the old snapshot or the new one, never a mixture.
///
/// The cache is itself a [`Fetcher`], passing record and series fetches
/// straight through, so it can stand wherever a store is expected.
pub struct ReadCache {
    fetcher: Arc<dyn Fetcher>,
    slot: RwLock<Slot>,
    reload_lock: Mutex<()>,
    opts: CacheOptions,
    metrics: Arc<CacheMetrics>,
}

impl ReadCache {
    /// Wraps `fetcher` with an empty initial snapshot; the first lookup
    /// populates it.
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_options(fetcher, CacheOptions::default())
    }

    /// Wraps `fetcher` with explicit options.
    pub fn with_options(fetcher: Arc<dyn Fetcher>, opts: CacheOptions) -> Self {
        Self {
            fetcher,
            slot: RwLock::new(Slot { index: Arc::new(NameIndex::default()), generation: 0 }),
            reload_lock: Mutex::new(()),
            opts,
            metrics: Arc::new(CacheMetrics::default()),
        }
    }

    /// Convenience constructor over a fixed [`MemStore`] table.
    pub fn from_map(sources: impl IntoIterator<Item = (String, DataSource)>) -> Self {
        Self::new(Arc::new(MemStore::new(sources)))
    }

    /// Resolves an exact identifier to its name-to-ID mapping.
    ///
    /// An empty result triggers one reload and one retry: a truly
    /// unknown identifier is indistinguishable from a stale snapshot,
    /// and the contract pays one extra fetch per miss instead of keeping
    /// a negative cache. Still empty after the retry is `Ok` with an
    /// empty map; only a failed fetch is an error.
    pub fn ids_for_ident(&self, ident: &str) -> Result<HashMap<String, DsId>> {
        self.metrics.resolve_call();
        let (index, generation) = self.current();
        let found = index.ids_for_ident(ident);
        if !found.is_empty() {
            self.metrics.resolve_hit();
            trace!(ident, "readcache.resolve.hit");
            return Ok(found);
        }
        self.metrics.resolve_miss();
        trace!(ident, "readcache.resolve.miss");
        self.reload_observed(generation)?;
        Ok(self.current().0.ids_for_ident(ident))
    }

    /// Searches the name hierarchy with a dotted glob pattern.
    ///
    /// Reloads the name table first, then walks the fresh snapshot; see
    /// [`NameIndex::find`] for the grammar. An unmatched pattern is an
    /// empty vec, a failed reload an error.
    pub fn find(&self, pattern: &str) -> Result<Vec<FindNode>> {
        self.metrics.find_call();
        self.reload()?;
        let (index, _) = self.current();
        let nodes = index.find(pattern);
        trace!(pattern, matches = nodes.len(), "readcache.find");
        Ok(nodes)
    }

    /// Refetches the name table and swaps in a fresh snapshot. On
    /// failure the previous snapshot stays in place and keeps serving.
    pub fn reload(&self) -> Result<()> {
        let _guard = self.reload_lock.lock();
        self.fetch_and_swap()
    }

    /// Shared handle to the traffic counters.
    pub fn metrics(&self) -> Arc<CacheMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Copies the current counter values.
    pub fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Number of names in the live snapshot.
    pub fn len(&self) -> usize {
        self.slot.read().index.len()
    }

    /// Whether the live snapshot holds no names.
    pub fn is_empty(&self) -> bool {
        self.slot.read().index.is_empty()
    }

    fn current(&self) -> (Arc<NameIndex>, u64) {
        let slot = self.slot.read();
        (Arc::clone(&slot.index), slot.generation)
    }

    /// Reload on behalf of a caller whose miss was observed against
    /// `generation`. When a concurrent reload already advanced past it,
    /// that snapshot is at least as fresh as the one this caller wants,
    /// so the fetch is skipped.
    fn reload_observed(&self, generation: u64) -> Result<()> {
        let _guard = self.reload_lock.lock();
        if self.opts.coalesce_reloads && self.slot.read().generation != generation {
            self.metrics.reload_coalesce();
            trace!(generation, "readcache.reload.coalesced");
            return Ok(());
        }
        self.fetch_and_swap()
    }

    /// Callers must hold `reload_lock`.
    fn fetch_and_swap(&self) -> Result<()> {
        let names = match self.fetcher.fetch_data_source_names() {
            Ok(names) => names,
            Err(err) => {
                self.metrics.reload_failure();
                debug!(error = %err, "readcache.reload.failed");
                return Err(err);
            }
        };
        // Build off to the side; the swap is the only write readers see.
        let index = Arc::new(NameIndex::build(names));
        self.metrics.reload_fetch();
        let mut slot = self.slot.write();
        slot.index = index;
        slot.generation += 1;
        debug!(names = slot.index.len(), generation = slot.generation, "readcache.reload.swap");
        Ok(())
    }
}

impl NameSupplier for ReadCache {
    /// Passes through to the backing store; the cache's own snapshot
    /// stays internal. Callers wanting cached lookups use
    /// [`ReadCache::ids_for_ident`].
    fn fetch_data_source_names(&self) -> Result<HashMap<String, DsId>> {
        self.fetcher.fetch_data_source_names()
    }
}

impl SeriesSupplier for ReadCache {
    fn fetch_data_source_by_id(&self, id: DsId) -> Result<Arc<DataSource>> {
        self.fetcher.fetch_data_source_by_id(id)
    }

    fn fetch_series(
        &self,
        ds: &DataSource,
        from: Timestamp,
        to: Timestamp,
        max_points: u64,
    ) -> Result<Series> {
        self.fetcher.fetch_series(ds, from, to, max_points)
    }
}
