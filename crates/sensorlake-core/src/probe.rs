//! File-type probes: candidate path layouts for one sensor's files.
//!
//! A probe knows, for one file type, where a sensor's file for a given
//! partition would live relative to the sensor directory, and which decoder
//! reads it. The lookup layer tries probes in priority order per partition;
//! the default order prefers monthly Parquet over yearly Parquet over yearly
//! CSV.

use std::{fmt::Debug, sync::Arc};

use snafu::prelude::*;

use crate::{
    error::{ConfigError, UnknownFileTypeSnafu},
    file_format::{CsvFormat, FileFormat, ParquetFormat, TimeSeriesColumns},
    partition::{Partition, PartitionBy},
};

/// Probe names tried per partition, in priority order, when the caller does
/// not name an explicit subset.
pub const DEFAULT_PROBE_NAMES: [&str; 3] = ["parquet", "yearly_parquet", "csv"];

/// The standard column layout of stored sensor files.
pub fn default_time_series_columns() -> TimeSeriesColumns {
    TimeSeriesColumns::new("Time", "Value", Some("Status"))
}

/// Errors raised while building candidate paths.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ProbeError {
    /// A probe was handed a partition of the wrong granularity.
    ///
    /// Partition sets are homogeneous by construction, so this only arises
    /// from a bug in the calling code.
    #[snafu(display("File type '{probe}' does not support partition {partition}"))]
    UnsupportedPartition {
        /// Name of the probe.
        probe: String,
        /// The rejected partition.
        partition: Partition,
    },
}

/// Path layout and decoder for one stored file type.
pub trait FileTypeProbe: Debug + Send + Sync {
    /// Registry name of this probe.
    fn name(&self) -> &'static str;

    /// Decoder for files this probe locates.
    fn file_format(&self) -> &Arc<dyn FileFormat>;

    /// Partition granularity this probe's layout is sharded by.
    fn partition_by(&self) -> PartitionBy;

    /// Whether `partition` has the granularity this probe supports.
    fn check_partition(&self, partition: &Partition) -> bool {
        partition.partition_by() == self.partition_by()
    }

    /// Candidate paths relative to the sensor directory, one per partition.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::UnsupportedPartition`] when a partition of the
    /// wrong granularity is supplied.
    fn relative_paths(
        &self,
        sensor_name: &str,
        partitions: &[Partition],
    ) -> Result<Vec<(Partition, String)>, ProbeError>;
}

/// Monthly Parquet files under `parquet/<year>/`.
#[derive(Debug)]
pub struct MonthlyParquetProbe {
    format: Arc<dyn FileFormat>,
}

impl MonthlyParquetProbe {
    /// Create the probe with the standard column layout.
    pub fn new() -> Self {
        MonthlyParquetProbe { format: Arc::new(ParquetFormat::new(default_time_series_columns())) }
    }
}

impl Default for MonthlyParquetProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTypeProbe for MonthlyParquetProbe {
    fn name(&self) -> &'static str {
        "parquet"
    }

    fn file_format(&self) -> &Arc<dyn FileFormat> {
        &self.format
    }

    fn partition_by(&self) -> PartitionBy {
        PartitionBy::Month
    }

    fn relative_paths(
        &self,
        sensor_name: &str,
        partitions: &[Partition],
    ) -> Result<Vec<(Partition, String)>, ProbeError> {
        let extension = self.format.extension();
        partitions
            .iter()
            .map(|partition| match partition {
                Partition::Month { year, month } => {
                    let path = format!("parquet/{year}/{sensor_name}_{year}{month:02}{extension}");
                    Ok((*partition, path))
                }
                _ => UnsupportedPartitionSnafu { probe: self.name(), partition: *partition }.fail(),
            })
            .collect()
    }
}

/// Yearly Parquet files under `parquet/`.
#[derive(Debug)]
pub struct YearlyParquetProbe {
    format: Arc<dyn FileFormat>,
}

impl YearlyParquetProbe {
    /// Create the probe with the standard column layout.
    pub fn new() -> Self {
        YearlyParquetProbe { format: Arc::new(ParquetFormat::new(default_time_series_columns())) }
    }
}

impl Default for YearlyParquetProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTypeProbe for YearlyParquetProbe {
    fn name(&self) -> &'static str {
        "yearly_parquet"
    }

    fn file_format(&self) -> &Arc<dyn FileFormat> {
        &self.format
    }

    fn partition_by(&self) -> PartitionBy {
        PartitionBy::Year
    }

    fn relative_paths(
        &self,
        sensor_name: &str,
        partitions: &[Partition],
    ) -> Result<Vec<(Partition, String)>, ProbeError> {
        let extension = self.format.extension();
        partitions
            .iter()
            .map(|partition| match partition {
                Partition::Year(year) => {
                    Ok((*partition, format!("parquet/{sensor_name}_{year}{extension}")))
                }
                _ => UnsupportedPartitionSnafu { probe: self.name(), partition: *partition }.fail(),
            })
            .collect()
    }
}

/// Yearly CSV files directly in the sensor directory.
#[derive(Debug)]
pub struct CsvProbe {
    format: Arc<dyn FileFormat>,
}

impl CsvProbe {
    /// Create the probe with the standard 4-column header.
    pub fn new() -> Self {
        let header = ["Sensor", "Value", "Time", "Status"]
            .into_iter()
            .map(str::to_string)
            .collect();
        CsvProbe { format: Arc::new(CsvFormat::new(header, default_time_series_columns())) }
    }
}

impl Default for CsvProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTypeProbe for CsvProbe {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn file_format(&self) -> &Arc<dyn FileFormat> {
        &self.format
    }

    fn partition_by(&self) -> PartitionBy {
        PartitionBy::Year
    }

    fn relative_paths(
        &self,
        sensor_name: &str,
        partitions: &[Partition],
    ) -> Result<Vec<(Partition, String)>, ProbeError> {
        let extension = self.format.extension();
        partitions
            .iter()
            .map(|partition| match partition {
                Partition::Year(year) => {
                    Ok((*partition, format!("{sensor_name}_{year}{extension}")))
                }
                _ => UnsupportedPartitionSnafu { probe: self.name(), partition: *partition }.fail(),
            })
            .collect()
    }
}

/// Instantiate probes by registry name, preserving the requested order.
///
/// `None` loads the full default set in [`DEFAULT_PROBE_NAMES`] order.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownFileType`] for a name outside the registry.
pub fn load_probes(names: Option<&[&str]>) -> Result<Vec<Arc<dyn FileTypeProbe>>, ConfigError> {
    let names = names.unwrap_or(&DEFAULT_PROBE_NAMES);
    names
        .iter()
        .map(|name| -> Result<Arc<dyn FileTypeProbe>, ConfigError> {
            match *name {
                "parquet" => Ok(Arc::new(MonthlyParquetProbe::new())),
                "yearly_parquet" => Ok(Arc::new(YearlyParquetProbe::new())),
                "csv" => Ok(Arc::new(CsvProbe::new())),
                other => UnknownFileTypeSnafu { name: other }.fail(),
            }
        })
        .collect()
}
