//! Resampling one raw series onto a fixed time grid.
//!
//! Buckets are left-labeled and anchored at UTC midnight of the grid start's
//! day, so the same resolution always produces the same bucket boundaries
//! regardless of the time of day the window opens. Empty buckets aggregate to
//! NaN (count: zero) and are then filled by bounded interpolation; rows still
//! holding NaN afterwards are dropped.

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};

use crate::{
    error::{ConfigError, UnknownAggregationSnafu, UnknownInterpolationSnafu},
    join::{JoinError, OutOfRangeSnafu},
    series::RawSeries,
};

/// Per-bucket aggregation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Arithmetic mean of the bucket.
    Mean,
    /// Smallest value in the bucket.
    Min,
    /// Largest value in the bucket.
    Max,
    /// Sum of the bucket.
    Sum,
    /// Number of samples in the bucket.
    Count,
    /// First sample in the bucket.
    First,
    /// Last sample in the bucket.
    Last,
}

impl Aggregation {
    /// Parse an aggregation from its configuration name.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "mean" => Ok(Aggregation::Mean),
            "min" => Ok(Aggregation::Min),
            "max" => Ok(Aggregation::Max),
            "sum" => Ok(Aggregation::Sum),
            "count" => Ok(Aggregation::Count),
            "first" => Ok(Aggregation::First),
            "last" => Ok(Aggregation::Last),
            _ => UnknownAggregationSnafu { name }.fail(),
        }
    }

    /// The configuration name of this aggregation.
    pub fn name(&self) -> &'static str {
        match self {
            Aggregation::Mean => "mean",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::Sum => "sum",
            Aggregation::Count => "count",
            Aggregation::First => "first",
            Aggregation::Last => "last",
        }
    }

    /// Aggregate one bucket. Empty buckets count as zero and aggregate to
    /// NaN for everything else.
    pub fn apply(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return match self {
                Aggregation::Count => 0.0,
                _ => f64::NAN,
            };
        }
        match self {
            Aggregation::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Aggregation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregation::Sum => values.iter().sum(),
            Aggregation::Count => values.len() as f64,
            Aggregation::First => values[0],
            Aggregation::Last => values[values.len() - 1],
        }
    }
}

/// Gap-filling method applied after aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// Linear interpolation of interior gaps; trailing gaps carry the last
    /// value forward.
    Linear,
    /// Carry the previous value forward.
    ForwardFill,
}

impl Interpolation {
    /// Parse an interpolation method from its configuration name.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "linear_interpolation" => Ok(Interpolation::Linear),
            "ffill" => Ok(Interpolation::ForwardFill),
            _ => UnknownInterpolationSnafu { name }.fail(),
        }
    }

    /// The configuration name of this method.
    pub fn name(&self) -> &'static str {
        match self {
            Interpolation::Linear => "linear_interpolation",
            Interpolation::ForwardFill => "ffill",
        }
    }
}

/// One series on the fixed grid, NaN rows already dropped.
#[derive(Debug, Clone)]
pub struct ResampledSeries {
    /// The series name.
    pub name: String,
    /// Bucket labels with at least one surviving value, ascending.
    pub index: Vec<DateTime<Utc>>,
    /// One value column per aggregation, aligned with `index`.
    pub columns: Vec<(Aggregation, Vec<f64>)>,
}

/// The bucket grid origin: UTC midnight of the grid start's day.
pub(crate) fn grid_origin(start: DateTime<Utc>) -> DateTime<Utc> {
    start.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Resample `series` onto left-labeled buckets of width `resolution` spanning
/// `[start, end]`.
///
/// The series must lie inside the window: a sample strictly before `start` or
/// strictly after `end` is a fatal [`JoinError::OutOfRange`]. A series
/// starting late or ending early is padded implicitly, to the extent the
/// bounded fill reaches.
///
/// `limit_buckets` bounds how many consecutive empty buckets the fill may
/// bridge; `None` is unbounded. Callers validate the limit beforehand.
pub(crate) fn resample_series(
    series: &RawSeries,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    resolution: TimeDelta,
    aggregations: &[Aggregation],
    interpolation: Interpolation,
    limit_buckets: Option<usize>,
) -> Result<ResampledSeries, JoinError> {
    let name = series.name().to_string();
    if series.is_empty() {
        return Ok(ResampledSeries { name, index: Vec::new(), columns: Vec::new() });
    }

    if let Some(first) = series.first_timestamp() {
        if first < start {
            return OutOfRangeSnafu { series: name, timestamp: first, bound: start }.fail();
        }
    }
    if let Some(last) = series.last_timestamp() {
        if last > end {
            return OutOfRangeSnafu { series: name, timestamp: last, bound: end }.fail();
        }
    }

    let origin = grid_origin(start);
    let origin_ms = origin.timestamp_millis();
    let res_ms = resolution.num_milliseconds();
    let bucket = |ts: DateTime<Utc>| (ts.timestamp_millis() - origin_ms).div_euclid(res_ms);

    let first_bucket = bucket(start);
    let last_bucket = bucket(end);
    let num_buckets = (last_bucket - first_bucket + 1) as usize;

    let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); num_buckets];
    for (ts, value) in series.points() {
        let b = (bucket(*ts) - first_bucket) as usize;
        buckets[b].push(*value);
    }

    let mut filled: Vec<(Aggregation, Vec<f64>)> = Vec::with_capacity(aggregations.len());
    for aggregation in aggregations {
        let mut column: Vec<f64> = buckets.iter().map(|vals| aggregation.apply(vals)).collect();
        fill_gaps(&mut column, interpolation, limit_buckets);
        filled.push((*aggregation, column));
    }

    let mut index = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); filled.len()];
    for i in 0..num_buckets {
        if filled.iter().any(|(_, column)| column[i].is_nan()) {
            continue;
        }
        index.push(origin + TimeDelta::milliseconds((first_bucket + i as i64) * res_ms));
        for (j, (_, column)) in filled.iter().enumerate() {
            columns[j].push(column[i]);
        }
    }

    let columns = filled
        .iter()
        .map(|(aggregation, _)| *aggregation)
        .zip(columns)
        .collect();
    Ok(ResampledSeries { name, index, columns })
}

/// Fill NaN runs in place, bounded by `limit` buckets per run.
///
/// Runs before the first valid value are never filled. A run with a valid
/// value on both sides is bridged linearly (or carried forward for
/// [`Interpolation::ForwardFill`]); a trailing run always carries the last
/// value. Only the first `limit` buckets of a run are filled, with the
/// linear ramp computed over the full run either way.
fn fill_gaps(column: &mut [f64], interpolation: Interpolation, limit: Option<usize>) {
    let n = column.len();
    let Some(first_valid) = column.iter().position(|v| !v.is_nan()) else {
        return;
    };
    let mut i = first_valid;
    while i < n {
        if !column[i].is_nan() {
            i += 1;
            continue;
        }
        let mut j = i;
        while j < n && column[j].is_nan() {
            j += 1;
        }
        let run = j - i;
        let fillable = limit.map_or(run, |l| run.min(l));
        if j < n && interpolation == Interpolation::Linear {
            let a = column[i - 1];
            let b = column[j];
            for k in 0..fillable {
                column[i + k] = a + (b - a) * ((k + 1) as f64 / (run + 1) as f64);
            }
        } else {
            let carried = column[i - 1];
            for k in 0..fillable {
                column[i + k] = carried;
            }
        }
        i = j;
    }
}
