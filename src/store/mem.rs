//! Fixed in-memory fetcher.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::model::{DataSource, Series};
use crate::types::{DsId, Result, SendaError, Timestamp};

use super::{NameSupplier, SeriesSupplier};

/// A [`Fetcher`](super::Fetcher) over a fixed table of sources.
///
/// Names are sorted and assigned sequential IDs from zero, and every
/// record is rebound to its assigned identity so by-ID fetches agree
/// with the name table. Series fetches serve the first retained archive
/// as-is, ignoring the requested range. No caching, no invalidation;
/// the table never changes after construction.
pub struct MemStore {
    by_name: HashMap<String, DsId>,
    by_id: FxHashMap<DsId, Arc<DataSource>>,
}

impl MemStore {
    /// Builds the store from `(name, source)` pairs. The pair's name is
    /// authoritative; a duplicated name keeps the last source given.
    pub fn new(sources: impl IntoIterator<Item = (String, DataSource)>) -> Self {
        let table: BTreeMap<String, DataSource> = sources.into_iter().collect();
        let mut by_name = HashMap::with_capacity(table.len());
        let mut by_id = FxHashMap::default();
        for (n, (name, ds)) in table.into_iter().enumerate() {
            let id = DsId(n as i64);
            by_id.insert(id, Arc::new(ds.rebind(id, name.clone())));
            by_name.insert(name, id);
        }
        Self { by_name, by_id }
    }

    /// Number of sources in the table.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl NameSupplier for MemStore {
    fn fetch_data_source_names(&self) -> Result<HashMap<String, DsId>> {
        Ok(self.by_name.clone())
    }
}

impl SeriesSupplier for MemStore {
    fn fetch_data_source_by_id(&self, id: DsId) -> Result<Arc<DataSource>> {
        self.by_id.get(&id).cloned().ok_or(SendaError::NotFound)
    }

    fn fetch_series(
        &self,
        ds: &DataSource,
        _from: Timestamp,
        _to: Timestamp,
        _max_points: u64,
    ) -> Result<Series> {
        let archive = ds
            .archives()
            .first()
            .ok_or(SendaError::Invalid("data source has no archives"))?;
        Ok(archive.series())
    }
}
