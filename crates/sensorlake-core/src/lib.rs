//! Core engine for partition-aware sensor time-series retrieval.
//!
//! This crate provides the foundational pieces for `sensorlake`:
//!
//! - Calendar partitions and range enumeration (`partition` module).
//! - Decoders for the Parquet and CSV layouts sensor files are stored in
//!   (`file_format` module) and the probes that know where those files live
//!   relative to a sensor directory (`probe` module).
//! - A storage contract with a local-filesystem backend (`storage` module)
//!   and the asset catalog mapping plants to lake directories (`assets`
//!   module).
//! - The partition-aware location resolver (`lookup` module) and the series
//!   loader built on top of it (`reader` module).
//! - The alignment engine: grid resampling with bounded gap filling
//!   (`resample` module) and the NaN-free inner join over several series
//!   (`join` module).
//!
//! Higher-level integration crates are expected to depend on this core crate
//! rather than re-implementing the retrieval and alignment logic.
#![deny(missing_docs)]
pub mod assets;
pub mod error;
pub mod file_format;
pub mod join;
pub mod lookup;
pub mod partition;
pub mod probe;
pub mod reader;
pub mod resample;
pub mod series;
pub mod storage;
