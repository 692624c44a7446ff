//! Reading resolved locations into raw series.
//!
//! [`SeriesReader`] drives the whole retrieval side: enumerate partitions for
//! the requested window, resolve file locations through [`TagLookup`], fetch
//! and decode each file, filter by status code, and normalize the result into
//! one [`RawSeries`] per tag. Missing directories and missing files degrade
//! to empty series; only decode failures and unexpected storage errors
//! propagate.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;
use snafu::prelude::*;

use crate::{
    assets::AssetCatalog,
    error::ConfigError,
    file_format::FormatError,
    lookup::{LookupError, SensorTag, TagLocations, TagLookup},
    partition::{PartitionBy, PartitionError, split_by_partitions},
    series::RawSeries,
    storage::{DataLakeStorage, StorageError},
};

/// Status codes marking samples as unusable, excluded by default.
pub const DEFAULT_REMOVE_STATUS_CODES: [i64; 7] = [0, 64, 60, 8, 24, 3, 32768];

/// Errors raised while loading series.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ReadError {
    /// The requested time range could not be partitioned.
    #[snafu(display("Invalid time range: {source}"))]
    Partition {
        /// The underlying partition error.
        source: PartitionError,
    },

    /// Location resolution failed.
    #[snafu(display("Location lookup failed: {source}"))]
    Lookup {
        /// The underlying lookup error.
        source: LookupError,
    },

    /// The storage backend failed while fetching a resolved file.
    #[snafu(display("Storage failure at {path}: {source}"))]
    Storage {
        /// The lake path the failure occurred at.
        path: String,
        /// The underlying storage error.
        source: StorageError,
    },

    /// A fetched file could not be decoded.
    #[snafu(display("Can not decode {path}: {source}"))]
    Format {
        /// The lake path of the undecodable file.
        path: String,
        /// The underlying decode error.
        source: FormatError,
    },
}

/// Loader of sensor series from a data lake.
#[derive(Debug)]
pub struct SeriesReader {
    storage: Arc<DataLakeStorage>,
    catalog: AssetCatalog,
    lookup: TagLookup,
    remove_status_codes: Vec<i64>,
    partition_by: PartitionBy,
    base_dir: Option<String>,
    workers: usize,
}

impl SeriesReader {
    /// Create a reader with monthly partitioning, the default status-code
    /// exclusions, and sequential lookup.
    pub fn create(
        storage: Arc<DataLakeStorage>,
        catalog: AssetCatalog,
    ) -> Result<Self, ConfigError> {
        let lookup = TagLookup::create(Arc::clone(&storage))?;
        Ok(SeriesReader {
            storage,
            catalog,
            lookup,
            remove_status_codes: DEFAULT_REMOVE_STATUS_CODES.to_vec(),
            partition_by: PartitionBy::Month,
            base_dir: None,
            workers: 1,
        })
    }

    /// Replace the location resolver.
    pub fn with_lookup(mut self, lookup: TagLookup) -> Self {
        self.lookup = lookup;
        self
    }

    /// Replace the excluded status codes; empty disables filtering.
    pub fn with_remove_status_codes(mut self, codes: Vec<i64>) -> Self {
        self.remove_status_codes = codes;
        self
    }

    /// Change the partition granularity used to enumerate candidate files.
    pub fn with_partition_by(mut self, partition_by: PartitionBy) -> Self {
        self.partition_by = partition_by;
        self
    }

    /// Resolve all tags under one directory instead of via the asset catalog.
    pub fn with_base_dir(mut self, base_dir: Option<String>) -> Self {
        self.base_dir = base_dir;
        self
    }

    /// Bound on concurrent per-tag location resolution.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Fetch and decode every resolved file of one tag into a single series.
    ///
    /// Partitions are read in ascending order; a file that disappeared since
    /// resolution is skipped with a debug log. Samples carrying an excluded
    /// status code are dropped, then the series is sorted and duplicate
    /// timestamps collapse to the latest arrival. A tag with no data at all
    /// yields an empty named series.
    pub async fn read_tag_locations(
        &self,
        locations: &TagLocations,
    ) -> Result<RawSeries, ReadError> {
        let mut series = RawSeries::empty(locations.tag().name.clone());
        for (_, location) in locations.iter() {
            let data = match self.storage.read(&location.path).await {
                Ok(data) => data,
                Err(e) if e.is_not_found() => {
                    debug!("Resolved file vanished, skipping: {}", location.path);
                    continue;
                }
                Err(e) => return Err(e).context(StorageSnafu { path: location.path.clone() }),
            };
            let rows = location
                .file_format
                .read_rows(data)
                .context(FormatSnafu { path: location.path.clone() })?;
            let mut points: Vec<(DateTime<Utc>, f64)> = rows
                .into_iter()
                .filter(|row| {
                    row.status
                        .is_none_or(|code| !self.remove_status_codes.contains(&code))
                })
                .map(|row| (row.timestamp, row.value))
                .collect();
            points.sort_by_key(|(ts, _)| *ts);
            series.extend(points);
        }
        series.sort_and_dedup_keep_last();
        Ok(series)
    }

    /// Load one series per tag over `[start, end)`.
    ///
    /// Output order matches `tags`; tags whose directory is missing produce
    /// empty series.
    pub async fn load_series(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        tags: &[SensorTag],
    ) -> Result<Vec<RawSeries>, ReadError> {
        let partitions =
            split_by_partitions(self.partition_by, start, end).context(PartitionSnafu)?;
        let tag_locations = self
            .lookup
            .lookup(&self.catalog, tags, &partitions, self.workers, self.base_dir.as_deref())
            .await
            .context(LookupSnafu)?;

        let mut series = Vec::with_capacity(tag_locations.len());
        for locations in &tag_locations {
            let mut one = self.read_tag_locations(locations).await?;
            one.trim(start, end);
            series.push(one);
        }
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assets::AssetPathSpec,
        file_format::test_fixtures::parquet_bytes,
        lookup::TIME_SERIES_READER_NAME,
        storage::write_fixture,
    };
    use chrono::TimeZone;
    use tempfile::TempDir;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn utc(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
    }

    fn ms(dt: DateTime<Utc>) -> i64 {
        dt.timestamp_millis()
    }

    fn catalog() -> AssetCatalog {
        let mut catalog = AssetCatalog::new();
        catalog.insert(
            "local",
            "plant-a",
            AssetPathSpec::new(TIME_SERIES_READER_NAME, "raw", "plant-a"),
        );
        catalog
    }

    async fn seed(tmp: &TempDir, tag: &str, year: i32, month: u32, rows: &[(i64, f64, i64)]) -> TestResult {
        let rel = format!("raw/plant-a/{tag}/parquet/{year}/{tag}_{year}{month:02}.parquet");
        write_fixture(tmp.path(), &rel, &parquet_bytes(rows)).await?;
        Ok(())
    }

    fn reader(tmp: &TempDir) -> SeriesReader {
        let storage = Arc::new(DataLakeStorage::local(tmp.path()));
        SeriesReader::create(storage, catalog()).unwrap()
    }

    #[tokio::test]
    async fn excluded_status_codes_drop_samples() -> TestResult {
        let tmp = TempDir::new()?;
        let t = utc(2020, 1, 1, 0);
        seed(
            &tmp,
            "tag1",
            2020,
            1,
            &[
                (ms(t), 1.0, 0),
                (ms(t + chrono::TimeDelta::minutes(1)), 2.0, 192),
                (ms(t + chrono::TimeDelta::minutes(2)), 3.0, 64),
                (ms(t + chrono::TimeDelta::minutes(3)), 4.0, 192),
            ],
        )
        .await?;

        let reader = reader(&tmp);
        let series = reader
            .load_series(utc(2020, 1, 1, 0), utc(2020, 1, 2, 0), &[SensorTag::with_asset("tag1", "plant-a")])
            .await?;

        assert_eq!(series[0].len(), 2);
        assert_eq!(series[0].points()[0].1, 2.0);
        assert_eq!(series[0].points()[1].1, 4.0);
        Ok(())
    }

    #[tokio::test]
    async fn later_partition_wins_on_duplicate_timestamps() -> TestResult {
        let tmp = TempDir::new()?;
        let t = utc(2020, 1, 31, 12);
        // The same timestamp appears in the January and February files with
        // different values; February was written later and supersedes it.
        seed(&tmp, "tag1", 2020, 1, &[(ms(t), 1.0, 192)]).await?;
        seed(&tmp, "tag1", 2020, 2, &[(ms(t), 9.0, 192)]).await?;

        let reader = reader(&tmp);
        let series = reader
            .load_series(utc(2020, 1, 1, 0), utc(2020, 3, 1, 0), &[SensorTag::with_asset("tag1", "plant-a")])
            .await?;

        assert_eq!(series[0].len(), 1);
        assert_eq!(series[0].points()[0], (t, 9.0));
        Ok(())
    }

    #[tokio::test]
    async fn window_trim_is_half_open() -> TestResult {
        let tmp = TempDir::new()?;
        let start = utc(2020, 1, 10, 0);
        let end = utc(2020, 1, 20, 0);
        seed(
            &tmp,
            "tag1",
            2020,
            1,
            &[
                (ms(start - chrono::TimeDelta::hours(1)), 1.0, 192),
                (ms(start), 2.0, 192),
                (ms(end - chrono::TimeDelta::hours(1)), 3.0, 192),
                (ms(end), 4.0, 192),
            ],
        )
        .await?;

        let reader = reader(&tmp);
        let series = reader
            .load_series(start, end, &[SensorTag::with_asset("tag1", "plant-a")])
            .await?;

        let values: Vec<f64> = series[0].points().iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![2.0, 3.0]);
        Ok(())
    }

    #[tokio::test]
    async fn missing_tag_directory_yields_empty_series() -> TestResult {
        let tmp = TempDir::new()?;
        seed(&tmp, "tag1", 2020, 1, &[(ms(utc(2020, 1, 1, 0)), 1.0, 192)]).await?;

        let reader = reader(&tmp);
        let series = reader
            .load_series(
                utc(2020, 1, 1, 0),
                utc(2020, 2, 1, 0),
                &[
                    SensorTag::with_asset("tag1", "plant-a"),
                    SensorTag::with_asset("ghost", "plant-a"),
                ],
            )
            .await?;

        assert_eq!(series.len(), 2);
        assert!(!series[0].is_empty());
        assert!(series[1].is_empty());
        assert_eq!(series[1].name(), "ghost");
        Ok(())
    }

    #[tokio::test]
    async fn yearly_partitioning_reads_yearly_files() -> TestResult {
        let tmp = TempDir::new()?;
        let t = utc(2020, 6, 1, 0);
        write_fixture(
            tmp.path(),
            "raw/plant-a/tag1/parquet/tag1_2020.parquet",
            &parquet_bytes(&[(ms(t), 5.0, 192)]),
        )
        .await?;

        let reader = reader(&tmp).with_partition_by(PartitionBy::Year);
        let series = reader
            .load_series(utc(2020, 1, 1, 0), utc(2020, 12, 31, 0), &[SensorTag::with_asset("tag1", "plant-a")])
            .await?;

        assert_eq!(series[0].points(), &[(t, 5.0)]);
        Ok(())
    }
}
