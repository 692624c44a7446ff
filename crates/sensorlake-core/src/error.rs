//! Crate-wide configuration errors.
//!
//! This module centralizes the `ConfigError` enum used whenever caller-supplied
//! configuration is rejected up front: unknown registry names, bad worker
//! counts, broken asset bindings, and invalid resampling parameters. These are
//! all fatal and surfaced before any remote I/O is attempted; transient
//! conditions (missing files, missing directories) are never represented here.

use snafu::prelude::*;

/// Errors raised when validating caller-supplied configuration.
///
/// Every variant is fatal: the configuration must be fixed, there is nothing
/// to retry.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    /// A file-type name was requested that is not in the probe registry.
    #[snafu(display("Can not find file type '{name}'"))]
    UnknownFileType {
        /// The unrecognized file-type name.
        name: String,
    },

    /// A partition granularity name outside `year`/`month` was supplied.
    #[snafu(display("Wrong partition_by argument '{name}'"))]
    UnknownPartitionBy {
        /// The unrecognized granularity name.
        name: String,
    },

    /// The lookup worker count must be at least 1.
    #[snafu(display("Worker count should be bigger or equal to 1, got {workers}"))]
    InvalidWorkerCount {
        /// The rejected worker count.
        workers: usize,
    },

    /// An aggregation name outside the supported set was supplied.
    #[snafu(display("Unknown aggregation method '{name}'"))]
    UnknownAggregation {
        /// The unrecognized aggregation name.
        name: String,
    },

    /// Interpolation method should be either `linear_interpolation` or `ffill`.
    #[snafu(display(
        "Interpolation method should be either linear_interpolation or ffill, got '{name}'"
    ))]
    UnknownInterpolation {
        /// The unrecognized interpolation method name.
        name: String,
    },

    /// The resampling resolution must be a positive duration.
    #[snafu(display("Resampling resolution must be positive, got {resolution:?}"))]
    InvalidResolution {
        /// The rejected bucket width.
        resolution: chrono::TimeDelta,
    },

    /// The interpolation limit must resolve to at least one bucket.
    #[snafu(display("Interpolation limit must be larger than the given resolution"))]
    InvalidInterpolationLimit {
        /// The resolved limit in buckets (non-positive here).
        buckets: i64,
    },

    /// At least one aggregation method is required for a join.
    #[snafu(display("At least one aggregation method is required"))]
    EmptyAggregations,

    /// A join was requested over an empty list of series.
    #[snafu(display("At least one input series is required"))]
    EmptySeriesList,

    /// A sensor tag has no asset while asset-based directory resolution is in
    /// effect (no base-directory override was supplied).
    #[snafu(display("'{tag}' tag has empty asset"))]
    MissingAsset {
        /// Name of the tag missing its asset.
        tag: String,
    },

    /// The asset catalog has no entry for an asset under the active storage.
    #[snafu(display("Unable to find asset '{asset}' in storage '{storage}'"))]
    UnknownAsset {
        /// The asset that could not be resolved.
        asset: String,
        /// The storage name the resolution ran against.
        storage: String,
    },

    /// The asset catalog points at storage this resolver can not interpret.
    #[snafu(display("Assets reader name should be equal '{expected}' and not '{actual}'"))]
    ReaderMismatch {
        /// The reader name this resolver requires.
        expected: String,
        /// The reader name found in the catalog entry.
        actual: String,
    },
}
