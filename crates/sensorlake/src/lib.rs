//! # sensorlake
//!
//! Partition-aware retrieval and alignment of sensor time-series from a data
//! lake.
//!
//! This crate is the supported public entry point and provides a small,
//! stable surface over `sensorlake-core`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sensorlake::prelude::*;
//! ```

/// Convenience prelude with the stable, supported surface.
pub mod prelude;

pub use sensorlake_core::assets::{AssetCatalog, AssetPathSpec};
pub use sensorlake_core::error::ConfigError;
pub use sensorlake_core::join::{
    AlignedFrame, ColumnKey, JoinError, JoinMetadata, JoinOptions, join_timeseries,
};
pub use sensorlake_core::lookup::{
    DEFAULT_MAX_FILE_SIZE, LookupError, Location, SensorTag, TIME_SERIES_READER_NAME,
    TagLocations, TagLookup, quote_tag_name,
};
pub use sensorlake_core::partition::{Partition, PartitionBy, split_by_partitions};
pub use sensorlake_core::reader::{DEFAULT_REMOVE_STATUS_CODES, ReadError, SeriesReader};
pub use sensorlake_core::resample::{Aggregation, Interpolation};
pub use sensorlake_core::series::RawSeries;
pub use sensorlake_core::storage::DataLakeStorage;
