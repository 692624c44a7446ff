//! Calendar partitions used to shard stored sensor files.
//!
//! Historical sensor data is laid out in the lake as one file per calendar
//! year or per calendar month. This module defines the partition value type,
//! the granularity selector, and the enumeration of all partitions
//! intersecting a date range. Partitions are pure values: they are created by
//! range enumeration and never mutated.

use std::cmp::Ordering;

use chrono::{DateTime, Datelike, Utc};
use snafu::prelude::*;

use crate::error::{ConfigError, UnknownPartitionBySnafu};

/// Errors raised while enumerating partitions.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PartitionError {
    /// The start of the requested range is after its end.
    #[snafu(display("start_period bigger than end_period: '{start}' > '{end}'"))]
    InvalidRange {
        /// Start of the rejected range.
        start: DateTime<Utc>,
        /// End of the rejected range.
        end: DateTime<Utc>,
    },
}

/// A fixed calendar time bucket identifying one stored file.
///
/// Ordering is total within one variant (by year, then by year and month).
/// Comparing a `Year` against a `Month` is a programming error: `PartialOrd`
/// returns `None` and [`Partition::ordering`] panics with a clear message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// One calendar year.
    Year(i32),
    /// One calendar month.
    Month {
        /// The calendar year.
        year: i32,
        /// The calendar month, 1 through 12.
        month: u32,
    },
}

impl Partition {
    /// The granularity of this partition value.
    pub fn partition_by(&self) -> PartitionBy {
        match self {
            Partition::Year(_) => PartitionBy::Year,
            Partition::Month { .. } => PartitionBy::Month,
        }
    }

    /// Total order between two partitions of the same variant.
    ///
    /// # Panics
    ///
    /// Panics when called across variants; mixed partition sets only arise
    /// from a bug in the calling code, never from data.
    pub fn ordering(&self, other: &Partition) -> Ordering {
        self.partial_cmp(other).unwrap_or_else(|| {
            panic!("can not order partitions of different granularity: {self} vs {other}")
        })
    }
}

impl PartialOrd for Partition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Partition::Year(a), Partition::Year(b)) => Some(a.cmp(b)),
            (
                Partition::Month { year: ay, month: am },
                Partition::Month { year: by, month: bm },
            ) => Some((ay, am).cmp(&(by, bm))),
            _ => None,
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Partition::Year(year) => write!(f, "{year}"),
            Partition::Month { year, month } => write!(f, "{year}-{month:02}"),
        }
    }
}

/// Partition enumeration granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionBy {
    /// One partition per calendar year.
    Year,
    /// One partition per calendar month.
    Month,
}

impl PartitionBy {
    /// Parse a granularity from its configuration name (`year` or `month`).
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "year" => Ok(PartitionBy::Year),
            "month" => Ok(PartitionBy::Month),
            _ => UnknownPartitionBySnafu { name }.fail(),
        }
    }

    /// The configuration name of this granularity.
    pub fn name(&self) -> &'static str {
        match self {
            PartitionBy::Year => "year",
            PartitionBy::Month => "month",
        }
    }
}

/// Enumerate all partitions intersecting `[start, end]`, ascending.
///
/// For [`PartitionBy::Year`] this yields one partition per calendar year
/// touched by the range; for [`PartitionBy::Month`] one per calendar month,
/// inclusive of partial months at both ends.
///
/// # Errors
///
/// Returns [`PartitionError::InvalidRange`] when `start > end`.
pub fn split_by_partitions(
    partition_by: PartitionBy,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Partition>, PartitionError> {
    ensure!(start <= end, InvalidRangeSnafu { start, end });

    let mut partitions = Vec::new();
    match partition_by {
        PartitionBy::Year => {
            for year in start.year()..=end.year() {
                partitions.push(Partition::Year(year));
            }
        }
        PartitionBy::Month => {
            for year in start.year()..=end.year() {
                for month in 1..=12u32 {
                    if (year == start.year() && month < start.month())
                        || (year == end.year() && month > end.month())
                    {
                        continue;
                    }
                    partitions.push(Partition::Month { year, month });
                }
            }
        }
    }
    Ok(partitions)
}
