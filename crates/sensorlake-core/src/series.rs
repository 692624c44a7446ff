//! Raw in-memory representation of one sensor's time series.

use chrono::{DateTime, Utc};

/// One named series of `(timestamp, value)` samples.
///
/// Points arrive in file order from the decoders; callers normalize with
/// [`RawSeries::sort_and_dedup_keep_last`] before handing the series to the
/// alignment engine, which requires strictly increasing timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSeries {
    name: String,
    points: Vec<(DateTime<Utc>, f64)>,
}

impl RawSeries {
    /// Create a series from pre-collected points.
    pub fn new(name: impl Into<String>, points: Vec<(DateTime<Utc>, f64)>) -> Self {
        RawSeries { name: name.into(), points }
    }

    /// Create an empty named series.
    pub fn empty(name: impl Into<String>) -> Self {
        RawSeries { name: name.into(), points: Vec::new() }
    }

    /// The series name (the sensor tag name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The sample points, in their current order.
    pub fn points(&self) -> &[(DateTime<Utc>, f64)] {
        &self.points
    }

    /// Number of sample points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Timestamp of the first point, if any.
    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.points.first().map(|(ts, _)| *ts)
    }

    /// Timestamp of the last point, if any.
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.points.last().map(|(ts, _)| *ts)
    }

    /// Append points, keeping their order.
    pub fn extend(&mut self, points: impl IntoIterator<Item = (DateTime<Utc>, f64)>) {
        self.points.extend(points);
    }

    /// Sort by timestamp and collapse duplicate timestamps.
    ///
    /// The stable sort keeps duplicates in arrival order, so retaining the
    /// last occurrence per timestamp implements latest-write-wins: a
    /// correction file appended after the original silently supersedes it.
    pub fn sort_and_dedup_keep_last(&mut self) {
        self.points.sort_by_key(|(ts, _)| *ts);
        // Vec::dedup_by keeps the first of each run; overwrite in place to
        // keep the last instead.
        let mut deduped: Vec<(DateTime<Utc>, f64)> = Vec::with_capacity(self.points.len());
        for point in self.points.drain(..) {
            match deduped.last_mut() {
                Some(last) if last.0 == point.0 => *last = point,
                _ => deduped.push(point),
            }
        }
        self.points = deduped;
    }

    /// Keep only points with `start <= timestamp < end`.
    pub fn trim(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.points.retain(|(ts, _)| *ts >= start && *ts < end);
    }
}
