//! Aligning several resampled series into one gap-free frame.
//!
//! Every input series is resampled onto the same midnight-anchored grid and
//! the per-series results are inner-joined on the time index, so the output
//! frame only carries timestamps where every series has a value. Series
//! without any usable data are collected and reported together, after all
//! inputs have been attempted, so one pass surfaces every offender.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::{
    error::{
        ConfigError, EmptyAggregationsSnafu, EmptySeriesListSnafu, InvalidInterpolationLimitSnafu,
        InvalidResolutionSnafu,
    },
    resample::{Aggregation, Interpolation, ResampledSeries, resample_series},
    series::RawSeries,
};

/// Errors raised while joining series.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum JoinError {
    /// Caller-supplied join parameters were rejected.
    #[snafu(display("Join configuration error: {source}"))]
    Config {
        /// The underlying configuration error.
        source: ConfigError,
    },

    /// A series holds a sample outside the requested window.
    #[snafu(display("Series '{series}' has sample at {timestamp} outside the window bound {bound}"))]
    OutOfRange {
        /// Name of the offending series.
        series: String,
        /// The out-of-window sample timestamp.
        timestamp: DateTime<Utc>,
        /// The window bound it violates.
        bound: DateTime<Utc>,
    },

    /// One or more series produced no usable rows.
    ///
    /// Raised only after every input was attempted; `series` names each
    /// offender in input order.
    #[snafu(display("Insufficient data for series: {}", series.join(", ")))]
    InsufficientData {
        /// Names of all series without usable data, in input order.
        series: Vec<String>,
    },
}

/// Identifier of one output column.
///
/// With a single aggregation the frame is flat and `aggregation` is `None`;
/// with several, every column carries its `(series, aggregation)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnKey {
    /// The series the column belongs to.
    pub series: String,
    /// The aggregation name, for multi-aggregation frames.
    pub aggregation: Option<String>,
}

/// The joined, gap-free output frame.
///
/// Values are stored column-major; `index` is strictly increasing and shared
/// by every column. A successfully built frame contains no NaN cells.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedFrame {
    index: Vec<DateTime<Utc>>,
    columns: Vec<ColumnKey>,
    values: Vec<Vec<f64>>,
}

impl AlignedFrame {
    /// The shared time index.
    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    /// The column identifiers, in series order then aggregation order.
    pub fn columns(&self) -> &[ColumnKey] {
        &self.columns
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.index.len()
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// The values of one column, aligned with [`AlignedFrame::index`].
    pub fn column(&self, key: &ColumnKey) -> Option<&[f64]> {
        self.columns
            .iter()
            .position(|k| k == key)
            .map(|i| self.values[i].as_slice())
    }

    /// The values of the column at `idx`.
    pub fn column_at(&self, idx: usize) -> &[f64] {
        &self.values[idx]
    }
}

/// Per-series accounting of the resampling step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesJoinMetadata {
    /// Number of raw samples the series carried.
    pub original_length: usize,
    /// Number of grid rows the series kept after fill and NaN filtering.
    pub resampled_length: usize,
}

/// Whole-frame accounting of the join step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateJoinMetadata {
    /// Number of rows in the final frame.
    pub joined_length: usize,
    /// Number of joined rows dropped for residual NaN cells.
    pub dropped_na_length: usize,
}

/// Accounting for one join, per series and aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinMetadata {
    /// Per-series metadata, in input order.
    pub series: Vec<(String, SeriesJoinMetadata)>,
    /// Aggregate metadata for the joined frame.
    pub aggregate: AggregateJoinMetadata,
}

/// Parameters of one join.
#[derive(Debug, Clone)]
pub struct JoinOptions {
    /// Aggregations applied per bucket, one output column each.
    pub aggregations: Vec<Aggregation>,
    /// Gap-filling method.
    pub interpolation: Interpolation,
    /// Longest time span of consecutive empty buckets the fill may bridge;
    /// `None` is unbounded.
    pub interpolation_limit: Option<TimeDelta>,
}

impl Default for JoinOptions {
    fn default() -> Self {
        JoinOptions {
            aggregations: vec![Aggregation::Mean],
            interpolation: Interpolation::Linear,
            interpolation_limit: Some(TimeDelta::hours(8)),
        }
    }
}

/// Resample every series onto a shared grid and inner-join the results.
///
/// The grid spans `[start, end]` in buckets of `resolution`, anchored at UTC
/// midnight of `start`'s day. Empty input series and series whose resampled
/// frame comes out empty are all collected first, then reported together as
/// [`JoinError::InsufficientData`] in input order.
///
/// # Errors
///
/// [`JoinError::Config`] for a non-positive resolution, an interpolation
/// limit shorter than the resolution, or empty aggregation/series lists;
/// [`JoinError::OutOfRange`] for samples outside the window;
/// [`JoinError::InsufficientData`] as above.
pub fn join_timeseries(
    series: &[RawSeries],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    resolution: TimeDelta,
    options: &JoinOptions,
) -> Result<(AlignedFrame, JoinMetadata), JoinError> {
    if resolution <= TimeDelta::zero() {
        return Err(InvalidResolutionSnafu { resolution }.build()).context(ConfigSnafu);
    }
    if options.aggregations.is_empty() {
        return Err(EmptyAggregationsSnafu.build()).context(ConfigSnafu);
    }
    if series.is_empty() {
        return Err(EmptySeriesListSnafu.build()).context(ConfigSnafu);
    }
    let limit_buckets = match options.interpolation_limit {
        Some(limit) => {
            let buckets = limit.num_milliseconds() / resolution.num_milliseconds();
            if buckets <= 0 {
                return Err(InvalidInterpolationLimitSnafu { buckets }.build())
                    .context(ConfigSnafu);
            }
            Some(buckets as usize)
        }
        None => None,
    };

    let mut insufficient: Vec<String> = Vec::new();
    let mut resampled: Vec<ResampledSeries> = Vec::new();
    let mut per_series: Vec<(String, SeriesJoinMetadata)> = Vec::new();

    for one in series {
        if one.is_empty() {
            insufficient.push(one.name().to_string());
            continue;
        }
        let frame = resample_series(
            one,
            start,
            end,
            resolution,
            &options.aggregations,
            options.interpolation,
            limit_buckets,
        )?;
        if frame.index.is_empty() {
            insufficient.push(one.name().to_string());
            continue;
        }
        per_series.push((
            frame.name.clone(),
            SeriesJoinMetadata { original_length: one.len(), resampled_length: frame.index.len() },
        ));
        resampled.push(frame);
    }

    if !insufficient.is_empty() {
        return InsufficientDataSnafu { series: insufficient }.fail();
    }

    // Inner join on the time index: keep timestamps present in every frame.
    let mut common: HashSet<DateTime<Utc>> = resampled[0].index.iter().copied().collect();
    for frame in &resampled[1..] {
        let other: HashSet<DateTime<Utc>> = frame.index.iter().copied().collect();
        common.retain(|ts| other.contains(ts));
    }
    // The first frame's index is ascending; filtering it keeps the order.
    let joined_index: Vec<DateTime<Utc>> =
        resampled[0].index.iter().copied().filter(|ts| common.contains(ts)).collect();

    let flat = options.aggregations.len() == 1;
    let mut columns: Vec<ColumnKey> = Vec::new();
    let mut values: Vec<Vec<f64>> = Vec::new();
    for frame in &resampled {
        let rows: HashMap<DateTime<Utc>, usize> =
            frame.index.iter().copied().enumerate().map(|(i, ts)| (ts, i)).collect();
        for (aggregation, column) in &frame.columns {
            columns.push(ColumnKey {
                series: frame.name.clone(),
                aggregation: if flat { None } else { Some(aggregation.name().to_string()) },
            });
            values.push(joined_index.iter().map(|ts| column[rows[ts]]).collect());
        }
    }

    // Per-series NaN filtering already ran, so joined rows are normally
    // complete; keep the guard and the accounting anyway.
    let keep: Vec<bool> = (0..joined_index.len())
        .map(|row| values.iter().all(|column| !column[row].is_nan()))
        .collect();
    let dropped = keep.iter().filter(|k| !**k).count();
    let (index, values) = if dropped > 0 {
        let index = joined_index
            .iter()
            .zip(&keep)
            .filter_map(|(ts, keep)| keep.then_some(*ts))
            .collect();
        let values = values
            .into_iter()
            .map(|column| {
                column
                    .into_iter()
                    .zip(&keep)
                    .filter_map(|(v, keep)| keep.then_some(v))
                    .collect()
            })
            .collect();
        (index, values)
    } else {
        (joined_index, values)
    };

    let metadata = JoinMetadata {
        series: per_series,
        aggregate: AggregateJoinMetadata { joined_length: index.len(), dropped_na_length: dropped },
    };
    Ok((AlignedFrame { index, columns, values }, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    /// A regular series: one sample every `step` from `from` to `to`
    /// inclusive, values cycling 0..100.
    fn regular(name: &str, from: DateTime<Utc>, to: DateTime<Utc>, step: TimeDelta) -> RawSeries {
        let mut points = Vec::new();
        let mut ts = from;
        let mut i = 0u64;
        while ts <= to {
            points.push((ts, (i % 100) as f64));
            ts += step;
            i += 1;
        }
        RawSeries::new(name, points)
    }

    #[test]
    fn mixed_resolution_inner_join() {
        let series = vec![
            regular(
                "ts-seconds",
                utc(2018, 1, 1, 6, 0),
                utc(2018, 1, 7, 6, 0),
                TimeDelta::seconds(1),
            ),
            regular(
                "ts-minutes",
                utc(2017, 12, 28, 6, 0),
                utc(2018, 1, 5, 6, 0),
                TimeDelta::minutes(1),
            ),
            regular(
                "ts-hours",
                utc(2018, 1, 3, 6, 0),
                utc(2018, 1, 12, 6, 0),
                TimeDelta::hours(1),
            ),
        ];
        let start = utc(2017, 12, 24, 23, 0);
        let end = utc(2018, 1, 12, 6, 7);

        let (frame, metadata) =
            join_timeseries(&series, start, end, TimeDelta::minutes(7), &JoinOptions::default())
                .unwrap();

        assert_eq!(frame.num_rows(), 481);
        assert_eq!(frame.num_columns(), 3);
        assert_eq!(frame.index()[0], utc(2018, 1, 3, 5, 56));
        assert_eq!(frame.index()[frame.num_rows() - 1], utc(2018, 1, 5, 13, 56));

        let lengths: HashMap<&str, SeriesJoinMetadata> =
            metadata.series.iter().map(|(name, m)| (name.as_str(), *m)).collect();
        assert_eq!(lengths["ts-seconds"].resampled_length, 1303);
        assert_eq!(lengths["ts-minutes"].resampled_length, 1715);
        assert_eq!(lengths["ts-hours"].resampled_length, 1854);
        assert_eq!(lengths["ts-seconds"].original_length, 518_401);
        assert_eq!(metadata.aggregate.joined_length, 481);
        assert_eq!(metadata.aggregate.dropped_na_length, 0);

        for col in 0..frame.num_columns() {
            assert!(frame.column_at(col).iter().all(|v| v.is_finite()));
        }
        assert!(frame.index().windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn single_aggregation_gives_flat_columns() {
        let a = regular("a", utc(2020, 1, 1, 0, 0), utc(2020, 1, 1, 6, 0), TimeDelta::minutes(5));
        let b = regular("b", utc(2020, 1, 1, 0, 0), utc(2020, 1, 1, 6, 0), TimeDelta::minutes(5));
        let (frame, _) = join_timeseries(
            &[a, b],
            utc(2020, 1, 1, 0, 0),
            utc(2020, 1, 1, 6, 0),
            TimeDelta::minutes(10),
            &JoinOptions::default(),
        )
        .unwrap();

        assert_eq!(
            frame.columns(),
            &[
                ColumnKey { series: "a".into(), aggregation: None },
                ColumnKey { series: "b".into(), aggregation: None },
            ]
        );
    }

    #[test]
    fn multiple_aggregations_give_two_level_columns() {
        let a = regular("a", utc(2020, 1, 1, 0, 0), utc(2020, 1, 1, 6, 0), TimeDelta::minutes(5));
        let options = JoinOptions {
            aggregations: vec![Aggregation::Mean, Aggregation::Max, Aggregation::Count],
            ..JoinOptions::default()
        };
        let (frame, _) = join_timeseries(
            &[a],
            utc(2020, 1, 1, 0, 0),
            utc(2020, 1, 1, 6, 0),
            TimeDelta::minutes(10),
            &options,
        )
        .unwrap();

        let keys: Vec<Option<&str>> =
            frame.columns().iter().map(|k| k.aggregation.as_deref()).collect();
        assert_eq!(keys, vec![Some("mean"), Some("max"), Some("count")]);
        let mean = frame
            .column(&ColumnKey { series: "a".into(), aggregation: Some("mean".into()) })
            .unwrap();
        assert_eq!(mean.len(), frame.num_rows());
    }

    #[test]
    fn insufficient_series_are_batched_in_input_order() {
        let good =
            regular("good", utc(2020, 1, 1, 0, 0), utc(2020, 1, 1, 6, 0), TimeDelta::minutes(5));
        let series = vec![RawSeries::empty("first"), good, RawSeries::empty("second")];

        let err = join_timeseries(
            &series,
            utc(2020, 1, 1, 0, 0),
            utc(2020, 1, 1, 6, 0),
            TimeDelta::minutes(10),
            &JoinOptions::default(),
        )
        .expect_err("two empty series");
        match err {
            JoinError::InsufficientData { series } => {
                assert_eq!(series, vec!["first".to_string(), "second".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn limit_shorter_than_resolution_is_rejected() {
        let a = regular("a", utc(2020, 1, 1, 0, 0), utc(2020, 1, 1, 6, 0), TimeDelta::minutes(5));
        let options = JoinOptions {
            interpolation_limit: Some(TimeDelta::minutes(5)),
            ..JoinOptions::default()
        };
        let err = join_timeseries(
            &[a],
            utc(2020, 1, 1, 0, 0),
            utc(2020, 1, 1, 6, 0),
            TimeDelta::minutes(10),
            &options,
        )
        .expect_err("limit resolves to zero buckets");
        assert!(matches!(
            err,
            JoinError::Config { source: ConfigError::InvalidInterpolationLimit { buckets: 0 } }
        ));
    }

    #[test]
    fn bad_parameters_are_rejected() {
        let a = regular("a", utc(2020, 1, 1, 0, 0), utc(2020, 1, 1, 6, 0), TimeDelta::minutes(5));
        let window = (utc(2020, 1, 1, 0, 0), utc(2020, 1, 1, 6, 0));

        let err = join_timeseries(
            std::slice::from_ref(&a),
            window.0,
            window.1,
            TimeDelta::zero(),
            &JoinOptions::default(),
        )
        .expect_err("zero resolution");
        assert!(matches!(
            err,
            JoinError::Config { source: ConfigError::InvalidResolution { .. } }
        ));

        let options = JoinOptions { aggregations: vec![], ..JoinOptions::default() };
        let err = join_timeseries(
            std::slice::from_ref(&a),
            window.0,
            window.1,
            TimeDelta::minutes(10),
            &options,
        )
        .expect_err("no aggregations");
        assert!(matches!(err, JoinError::Config { source: ConfigError::EmptyAggregations }));

        let err = join_timeseries(
            &[],
            window.0,
            window.1,
            TimeDelta::minutes(10),
            &JoinOptions::default(),
        )
        .expect_err("no series");
        assert!(matches!(err, JoinError::Config { source: ConfigError::EmptySeriesList }));
    }

    #[test]
    fn out_of_range_sample_propagates() {
        let a = regular("a", utc(2020, 1, 1, 0, 0), utc(2020, 1, 1, 6, 0), TimeDelta::minutes(5));
        let err = join_timeseries(
            &[a],
            utc(2020, 1, 1, 1, 0),
            utc(2020, 1, 1, 6, 0),
            TimeDelta::minutes(10),
            &JoinOptions::default(),
        )
        .expect_err("samples before the window start");
        assert!(matches!(err, JoinError::OutOfRange { .. }));
    }
}
