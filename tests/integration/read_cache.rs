#![allow(clippy::all)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Barrier, Once};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use senda::{
    cache::{CacheOptions, ReadCache},
    model::{Archive, DataSource, Series},
    store::{MemStore, NameSupplier, SeriesSupplier},
    types::{DsId, Result, SendaError, Timestamp},
};
use tracing_subscriber::EnvFilter;

const STEP: Duration = Duration::from_secs(10);

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("senda=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .try_init();
    });
}

fn source(name: &str) -> (String, DataSource) {
    (name.to_string(), DataSource::new(DsId(0), name, STEP))
}

fn fixture() -> ReadCache {
    ReadCache::from_map([
        source("host.cpu.load1"),
        source("host.cpu.load5"),
        source("host.mem.used"),
    ])
}

/// Wraps a [`MemStore`] and counts name-table fetches, witnessing store
/// traffic independently of the cache's own metrics.
struct CountingStore {
    inner: MemStore,
    name_fetches: AtomicU64,
}

impl CountingStore {
    fn new(sources: impl IntoIterator<Item = (String, DataSource)>) -> Self {
        Self { inner: MemStore::new(sources), name_fetches: AtomicU64::new(0) }
    }

    fn fetches(&self) -> u64 {
        self.name_fetches.load(Ordering::SeqCst)
    }
}

impl NameSupplier for CountingStore {
    fn fetch_data_source_names(&self) -> Result<HashMap<String, DsId>> {
        self.name_fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_data_source_names()
    }
}

impl SeriesSupplier for CountingStore {
    fn fetch_data_source_by_id(&self, id: DsId) -> Result<Arc<DataSource>> {
        self.inner.fetch_data_source_by_id(id)
    }

    fn fetch_series(
        &self,
        ds: &DataSource,
        from: Timestamp,
        to: Timestamp,
        max_points: u64,
    ) -> Result<Series> {
        self.inner.fetch_series(ds, from, to, max_points)
    }
}

/// Fails name-table fetches on demand.
struct FailingStore {
    inner: MemStore,
    fail: AtomicBool,
}

impl FailingStore {
    fn new(sources: impl IntoIterator<Item = (String, DataSource)>) -> Self {
        Self { inner: MemStore::new(sources), fail: AtomicBool::new(false) }
    }
}

impl NameSupplier for FailingStore {
    fn fetch_data_source_names(&self) -> Result<HashMap<String, DsId>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SendaError::Store("injected outage".into()));
        }
        self.inner.fetch_data_source_names()
    }
}

impl SeriesSupplier for FailingStore {
    fn fetch_data_source_by_id(&self, id: DsId) -> Result<Arc<DataSource>> {
        self.inner.fetch_data_source_by_id(id)
    }

    fn fetch_series(
        &self,
        ds: &DataSource,
        from: Timestamp,
        to: Timestamp,
        max_points: u64,
    ) -> Result<Series> {
        self.inner.fetch_series(ds, from, to, max_points)
    }
}

/// A name table the test rewrites between fetches.
#[derive(Default)]
struct MutableStore {
    names: Mutex<HashMap<String, DsId>>,
}

impl MutableStore {
    fn set(&self, names: &[(&str, i64)]) {
        *self.names.lock() = names
            .iter()
            .map(|&(name, id)| (name.to_string(), DsId(id)))
            .collect();
    }
}

impl NameSupplier for MutableStore {
    fn fetch_data_source_names(&self) -> Result<HashMap<String, DsId>> {
        Ok(self.names.lock().clone())
    }
}

impl SeriesSupplier for MutableStore {
    fn fetch_data_source_by_id(&self, _id: DsId) -> Result<Arc<DataSource>> {
        Err(SendaError::NotFound)
    }

    fn fetch_series(
        &self,
        _ds: &DataSource,
        _from: Timestamp,
        _to: Timestamp,
        _max_points: u64,
    ) -> Result<Series> {
        Err(SendaError::Invalid("no series behind this store"))
    }
}

/// Serves a completely different namespace on every fetch.
#[derive(Default)]
struct SwitchStore {
    calls: AtomicU64,
}

impl NameSupplier for SwitchStore {
    fn fetch_data_source_names(&self) -> Result<HashMap<String, DsId>> {
        let names: &[&str] = if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
            &["alpha.one", "alpha.two", "alpha.three"]
        } else {
            &["beta.one", "beta.two", "beta.three"]
        };
        Ok(names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.to_string(), DsId(i as i64)))
            .collect())
    }
}

impl SeriesSupplier for SwitchStore {
    fn fetch_data_source_by_id(&self, _id: DsId) -> Result<Arc<DataSource>> {
        Err(SendaError::NotFound)
    }

    fn fetch_series(
        &self,
        _ds: &DataSource,
        _from: Timestamp,
        _to: Timestamp,
        _max_points: u64,
    ) -> Result<Series> {
        Err(SendaError::Invalid("no series behind this store"))
    }
}

#[test]
fn resolve_populates_empty_cache_then_hits() -> Result<()> {
    init_tracing();
    let cache = fixture();

    let first = cache.ids_for_ident("host.cpu.load1")?;
    assert_eq!(first.len(), 1);
    let m = cache.metrics_snapshot();
    assert_eq!(m.resolve_calls, 1);
    assert_eq!(m.resolve_misses, 1, "cold cache must miss");
    assert_eq!(m.reload_fetches, 1);

    let second = cache.ids_for_ident("host.cpu.load1")?;
    assert_eq!(second, first);
    let m = cache.metrics_snapshot();
    assert_eq!(m.resolve_hits, 1);
    assert_eq!(m.reload_fetches, 1, "a warm hit must not refetch");
    assert_eq!(cache.len(), 3);
    Ok(())
}

#[test]
fn resolved_ids_round_trip_through_the_store() -> Result<()> {
    let cache = fixture();
    let ids = cache.ids_for_ident("host.mem.used")?;
    let (name, &id) = ids.iter().next().unwrap();
    let ds = cache.fetch_data_source_by_id(id)?;
    assert_eq!(ds.name(), name);
    assert_eq!(ds.id(), id);
    Ok(())
}

#[test]
fn missing_ident_reloads_once_per_call() -> Result<()> {
    let cache = fixture();
    assert!(cache.ids_for_ident("no.such.series")?.is_empty());
    assert!(cache.ids_for_ident("no.such.series")?.is_empty());
    let m = cache.metrics_snapshot();
    // an unknown name is indistinguishable from a stale snapshot, so
    // every miss pays exactly one refetch
    assert_eq!(m.resolve_misses, 2);
    assert_eq!(m.reload_fetches, 2);
    assert_eq!(m.resolve_hits, 0);
    Ok(())
}

#[test]
fn warm_hits_never_touch_the_store() -> Result<()> {
    let store = Arc::new(CountingStore::new([source("a.b"), source("c.d")]));
    let cache = ReadCache::new(store.clone());
    cache.ids_for_ident("a.b")?;
    assert_eq!(store.fetches(), 1);
    for _ in 0..100 {
        assert_eq!(cache.ids_for_ident("a.b")?.len(), 1);
        assert_eq!(cache.ids_for_ident("c.d")?.len(), 1);
    }
    assert_eq!(store.fetches(), 1);
    assert_eq!(cache.metrics_snapshot().resolve_hit_rate(), 200.0 / 201.0);
    Ok(())
}

#[test]
fn find_refetches_every_call() -> Result<()> {
    let store = Arc::new(CountingStore::new([source("a.b"), source("a.c")]));
    let cache = ReadCache::new(store.clone());
    cache.ids_for_ident("a.b")?;
    let before = store.fetches();
    assert_eq!(cache.find("a.*")?.len(), 2);
    assert_eq!(cache.find("a.*")?.len(), 2);
    assert_eq!(store.fetches(), before + 2);
    assert_eq!(cache.metrics_snapshot().find_calls, 2);
    Ok(())
}

#[test]
fn resolve_serves_stale_until_something_reloads() -> Result<()> {
    let store = Arc::new(MutableStore::default());
    store.set(&[("a.b.c", 1), ("x.y.z", 2)]);
    let cache = ReadCache::new(store.clone());

    // warm up, then drop the name from the store behind the cache's back
    assert_eq!(cache.ids_for_ident("a.b.c")?.len(), 1);
    store.set(&[("x.y.z", 2)]);

    // hits don't revalidate: the removed name keeps resolving
    assert_eq!(cache.ids_for_ident("a.b.c")?.len(), 1);

    // a search reloads and the fresh snapshot takes over wholesale
    assert!(cache.find("a.b.c")?.is_empty());
    assert!(cache.ids_for_ident("a.b.c")?.is_empty());
    assert_eq!(cache.ids_for_ident("x.y.z")?.len(), 1);
    Ok(())
}

#[test]
fn names_created_after_warmup_appear_on_miss() -> Result<()> {
    let store = Arc::new(MutableStore::default());
    store.set(&[("host.cpu", 1)]);
    let cache = ReadCache::new(store.clone());
    cache.ids_for_ident("host.cpu")?;

    store.set(&[("host.cpu", 1), ("host.mem", 2)]);
    let found = cache.ids_for_ident("host.mem")?;
    assert_eq!(found["host.mem"], DsId(2));
    Ok(())
}

#[test]
fn reload_failure_keeps_previous_snapshot() -> Result<()> {
    init_tracing();
    let store = Arc::new(FailingStore::new([source("a.b"), source("c.d")]));
    let cache = ReadCache::new(store.clone());
    assert_eq!(cache.find("*.*")?.len(), 2);

    store.fail.store(true, Ordering::SeqCst);

    // hits keep serving from the surviving snapshot
    assert_eq!(cache.ids_for_ident("a.b")?.len(), 1);
    // anything that needs the store propagates the failure
    assert!(matches!(cache.find("*.*"), Err(SendaError::Store(_))));
    assert!(matches!(cache.ids_for_ident("nope"), Err(SendaError::Store(_))));
    assert!(matches!(cache.reload(), Err(SendaError::Store(_))));
    assert_eq!(cache.len(), 2, "failed reloads must not clear the snapshot");
    assert_eq!(cache.metrics_snapshot().reload_failures, 3);

    store.fail.store(false, Ordering::SeqCst);
    assert_eq!(cache.find("*.*")?.len(), 2);
    Ok(())
}

#[test]
fn concurrent_reloads_never_yield_torn_results() -> Result<()> {
    let cache = Arc::new(ReadCache::new(Arc::new(SwitchStore::default())));

    let reloader = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || -> Result<()> {
            for _ in 0..200 {
                cache.reload()?;
            }
            Ok(())
        })
    };
    let searcher = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || -> Result<()> {
            for _ in 0..200 {
                let nodes = cache.find("*.*")?;
                assert_eq!(nodes.len(), 3);
                let alpha = nodes.iter().filter(|n| n.path.starts_with("alpha.")).count();
                let beta = nodes.iter().filter(|n| n.path.starts_with("beta.")).count();
                assert!(
                    alpha == 3 || beta == 3,
                    "torn snapshot: {alpha} alpha / {beta} beta"
                );
                assert!(nodes.iter().all(|n| n.is_leaf()));
            }
            Ok(())
        })
    };
    reloader.join().unwrap()?;
    searcher.join().unwrap()?;
    Ok(())
}

#[test]
fn stampeding_misses_share_one_fetch() -> Result<()> {
    let store = Arc::new(CountingStore::new([source("late.arrival")]));
    let cache = Arc::new(ReadCache::new(store.clone()));
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || -> Result<usize> {
                barrier.wait();
                Ok(cache.ids_for_ident("late.arrival")?.len())
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap()?, 1, "every caller must see the name");
    }

    // whichever miss reaches the reload lock first fetches; the rest
    // either coalesce onto its snapshot or were hits outright
    assert_eq!(store.fetches(), 1);
    let m = cache.metrics_snapshot();
    assert_eq!(m.reload_fetches, 1);
    assert_eq!(m.reload_coalesced, m.resolve_misses - 1);
    assert_eq!(m.resolve_hits + m.resolve_misses, threads as u64);
    Ok(())
}

#[test]
fn coalescing_disabled_fetches_per_miss() -> Result<()> {
    let store = Arc::new(CountingStore::new([source("late.arrival")]));
    let cache = Arc::new(ReadCache::with_options(
        store.clone(),
        CacheOptions { coalesce_reloads: false },
    ));
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || -> Result<usize> {
                barrier.wait();
                Ok(cache.ids_for_ident("late.arrival")?.len())
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap()?, 1);
    }

    let m = cache.metrics_snapshot();
    assert_eq!(m.reload_coalesced, 0);
    assert_eq!(m.reload_fetches, m.resolve_misses);
    assert_eq!(store.fetches(), m.reload_fetches);
    Ok(())
}

#[test]
fn caches_stack_as_fetchers() -> Result<()> {
    // a cache is itself a Fetcher, so a second cache can wrap it
    let inner = Arc::new(ReadCache::from_map([source("deep.metric")]));
    let outer = ReadCache::new(inner.clone());
    let ids = outer.ids_for_ident("deep.metric")?;
    assert_eq!(ids.len(), 1);
    // the outer cache's reload fetched through the inner passthrough,
    // which does not populate the inner cache's snapshot
    assert_eq!(inner.len(), 0);
    assert_eq!(outer.len(), 1);
    Ok(())
}

#[test]
fn series_fetches_pass_through() -> Result<()> {
    let archive = Archive::new(STEP)
        .with_points([(Timestamp::from_secs(100), 1.0), (Timestamp::from_secs(110), 2.0)]);
    let ds = DataSource::new(DsId(0), "host.cpu.load1", STEP)
        .with_archive(archive)
        .with_archive(Archive::new(Duration::from_secs(300)));
    let cache = ReadCache::from_map([("host.cpu.load1".to_string(), ds)]);

    let ids = cache.ids_for_ident("host.cpu.load1")?;
    let id = *ids.values().next().unwrap();
    let ds = cache.fetch_data_source_by_id(id)?;
    let series =
        cache.fetch_series(&ds, Timestamp::from_secs(0), Timestamp::from_secs(200), 1000)?;
    assert_eq!(series.step(), STEP);
    assert_eq!(series.len(), 2);
    assert_eq!(series.points()[0].value, 1.0);

    assert!(matches!(
        cache.fetch_data_source_by_id(DsId(999)),
        Err(SendaError::NotFound)
    ));
    Ok(())
}

#[test]
fn empty_store_answers_empty_without_error() -> Result<()> {
    let cache = ReadCache::from_map(std::iter::empty());
    assert!(cache.ids_for_ident("anything")?.is_empty());
    assert!(cache.find("*")?.is_empty());
    assert!(cache.is_empty());
    Ok(())
}
