//! Materialized point runs returned by series fetches.

use std::time::Duration;

use serde::Serialize;

use crate::types::Timestamp;

/// A single observation.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// Observation time.
    pub stamp: Timestamp,
    /// Observed value.
    pub value: f64,
}

/// A run of points consolidated at a fixed step.
///
/// Points are ordered by stamp; the step is the spacing the producing
/// archive consolidated at, not necessarily the distance between any two
/// adjacent points (gaps are represented by absent points, not NaNs).
#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    step: Duration,
    points: Vec<SeriesPoint>,
}

impl Series {
    /// Wraps pre-sorted points consolidated at `step`.
    pub fn new(step: Duration, points: Vec<SeriesPoint>) -> Self {
        Self { step, points }
    }

    /// Consolidation step of the producing archive.
    pub fn step(&self) -> Duration {
        self.step
    }

    /// The points, oldest first.
    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the run holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterates the points, oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, SeriesPoint> {
        self.points.iter()
    }
}
