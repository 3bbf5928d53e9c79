//! Data-source records and their retained archives.

use std::time::Duration;

use crate::types::{DsId, Timestamp};

use super::series::{Series, SeriesPoint};

/// A named series as known to the backing store.
///
/// Carries identity and shape only; value storage, consolidation, and
/// flushing live with the store. The name is the full dotted path.
#[derive(Clone, Debug)]
pub struct DataSource {
    id: DsId,
    name: String,
    step: Duration,
    heartbeat: Duration,
    last_update: Option<Timestamp>,
    archives: Vec<Archive>,
}

impl DataSource {
    /// Creates a record with the given identity and base step.
    pub fn new(id: DsId, name: impl Into<String>, step: Duration) -> Self {
        Self {
            id,
            name: name.into(),
            step,
            heartbeat: Duration::ZERO,
            last_update: None,
            archives: Vec::new(),
        }
    }

    /// Sets the longest silence tolerated before the series is stale.
    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// Sets the last-update stamp.
    pub fn with_last_update(mut self, stamp: Timestamp) -> Self {
        self.last_update = Some(stamp);
        self
    }

    /// Appends a retained archive. Order is significant: the first
    /// archive is the finest resolution and the default fetch target.
    pub fn with_archive(mut self, archive: Archive) -> Self {
        self.archives.push(archive);
        self
    }

    /// Store-assigned ID.
    pub fn id(&self) -> DsId {
        self.id
    }

    /// Full dotted name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base sampling step.
    pub fn step(&self) -> Duration {
        self.step
    }

    /// Longest tolerated silence.
    pub fn heartbeat(&self) -> Duration {
        self.heartbeat
    }

    /// Stamp of the most recent datapoint, if any was ever written.
    pub fn last_update(&self) -> Option<Timestamp> {
        self.last_update
    }

    /// Retained archives, finest first.
    pub fn archives(&self) -> &[Archive] {
        &self.archives
    }

    /// Rebinds identity. Stores that assign IDs at load time use this to
    /// make their table authoritative over whatever the record carried.
    pub(crate) fn rebind(mut self, id: DsId, name: String) -> Self {
        self.id = id;
        self.name = name;
        self
    }
}

/// One retained round-robin archive of a data source.
#[derive(Clone, Debug, Default)]
pub struct Archive {
    step: Duration,
    points: Vec<SeriesPoint>,
}

impl Archive {
    /// Creates an empty archive consolidating at `step`.
    pub fn new(step: Duration) -> Self {
        Self { step, points: Vec::new() }
    }

    /// Appends `(stamp, value)` points in stamp order.
    pub fn with_points(mut self, points: impl IntoIterator<Item = (Timestamp, f64)>) -> Self {
        self.points
            .extend(points.into_iter().map(|(stamp, value)| SeriesPoint { stamp, value }));
        self
    }

    /// Consolidation step.
    pub fn step(&self) -> Duration {
        self.step
    }

    /// Retained points, oldest first.
    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    /// Materializes the archive as a series.
    pub fn series(&self) -> Series {
        Series::new(self.step, self.points.clone())
    }
}
