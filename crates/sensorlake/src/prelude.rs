//! Wrapper prelude.
//!
//! The `sensorlake` crate is the supported public entry point. Downstream
//! code should prefer importing from this prelude instead of depending on
//! internal core module paths.

pub use crate::{
    Aggregation, AlignedFrame, AssetCatalog, AssetPathSpec, ColumnKey, ConfigError,
    DataLakeStorage, Interpolation, JoinError, JoinMetadata, JoinOptions, Partition, PartitionBy,
    RawSeries, ReadError, SensorTag, SeriesReader, TIME_SERIES_READER_NAME, TagLookup,
    join_timeseries,
};
