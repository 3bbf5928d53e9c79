//! Backing-store fetch contract and the map-backed test double.
//!
//! The cache consumes two narrow capabilities: the complete name table,
//! and record/series fetches by ID. Real stores implement both; so does
//! [`MemStore`], the fixed in-memory table used throughout the tests.

#![forbid(unsafe_code)]

mod mem;

use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{DataSource, Series};
use crate::types::{DsId, Result, Timestamp};

pub use mem::MemStore;

/// Supplies the complete, current name table.
pub trait NameSupplier: Send + Sync {
    /// Fetches the full name-to-ID snapshot. One ID per name; the store
    /// is the authority on which ID a name maps to.
    fn fetch_data_source_names(&self) -> Result<HashMap<String, DsId>>;
}

/// Supplies individual data-source records and their values.
pub trait SeriesSupplier: Send + Sync {
    /// Fetches one data-source record by its numeric ID.
    fn fetch_data_source_by_id(&self, id: DsId) -> Result<Arc<DataSource>>;

    /// Fetches values for `ds` over `[from, to]`, consolidated down to at
    /// most `max_points` points.
    fn fetch_series(
        &self,
        ds: &DataSource,
        from: Timestamp,
        to: Timestamp,
        max_points: u64,
    ) -> Result<Series>;
}

/// The composed contract a read cache wraps. Blanket-implemented, so any
/// type with both capabilities qualifies; caches themselves do, which is
/// what lets them stack in front of one another.
pub trait Fetcher: NameSupplier + SeriesSupplier {}

impl<T: NameSupplier + SeriesSupplier + ?Sized> Fetcher for T {}
