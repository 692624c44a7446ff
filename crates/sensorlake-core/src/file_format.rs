//! Decoders for the file formats sensor data is stored in.
//!
//! Each stored file carries one sensor's samples for one partition as rows of
//! (timestamp, value, optional status). This module defines the column-layout
//! descriptor, the [`FileFormat`] decoding trait, and the Parquet and CSV
//! implementations. Decoders are pure: bytes in, ordered sample rows out; all
//! fetching happens in the storage layer.
//!
//! Timestamps are normalized to UTC on the way in. Arrow timestamps are
//! epoch-relative instants, so a missing time zone annotation is read as UTC;
//! CSV timestamps may carry an explicit offset or be naive (also read as UTC).

use std::{fmt::Debug, io::Cursor, sync::Arc};

use arrow::{
    array::{
        Array, ArrayRef, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray,
        TimestampMillisecondArray, TimestampNanosecondArray, TimestampSecondArray,
    },
    compute::cast,
    datatypes::{DataType, Field, Schema, TimeUnit},
    error::ArrowError,
};
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use parquet::{
    arrow::{ProjectionMask, arrow_reader::ParquetRecordBatchReaderBuilder},
    errors::ParquetError,
};
use snafu::prelude::*;

/// Errors raised while decoding a stored file into sample rows.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FormatError {
    /// Parquet metadata or page decoding failed.
    #[snafu(display("Parquet read error: {source}"))]
    ParquetRead {
        /// Underlying Parquet error.
        source: ParquetError,
    },

    /// Arrow batch materialization or column casting failed.
    #[snafu(display("Arrow error while decoding batch: {source}"))]
    ArrowRead {
        /// Underlying Arrow error.
        source: ArrowError,
    },

    /// CSV decoding failed.
    #[snafu(display("CSV read error: {source}"))]
    CsvRead {
        /// Underlying Arrow CSV error.
        source: ArrowError,
    },

    /// A configured column is absent from the file.
    #[snafu(display("Missing column '{column}' in file"))]
    MissingColumn {
        /// Name of the expected column.
        column: String,
    },

    /// A configured column has a type this decoder can not interpret.
    #[snafu(display("Unsupported type {datatype} for column '{column}'"))]
    UnsupportedColumnType {
        /// Name of the offending column.
        column: String,
        /// The Arrow type that was found.
        datatype: String,
    },

    /// An epoch-relative timestamp falls outside the representable range.
    #[snafu(display("Timestamp value {value} is out of range"))]
    InvalidTimestamp {
        /// The raw epoch-relative value.
        value: i64,
    },

    /// A textual timestamp could not be parsed.
    #[snafu(display("Can not parse timestamp '{value}'"))]
    TimestampParse {
        /// The unparseable text.
        value: String,
    },

    /// A textual numeric field could not be parsed.
    #[snafu(display("Can not parse number '{value}' in column '{column}'"))]
    NumberParse {
        /// The unparseable text.
        value: String,
        /// Name of the column it came from.
        column: String,
    },
}

/// Names of the columns used in time series files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeriesColumns {
    /// Name of the timestamp column.
    pub datetime_column: String,
    /// Name of the value column.
    pub value_column: String,
    /// Name of the optional status column.
    pub status_column: Option<String>,
}

impl TimeSeriesColumns {
    /// Create a column layout with a status column.
    pub fn new(
        datetime_column: impl Into<String>,
        value_column: impl Into<String>,
        status_column: Option<&str>,
    ) -> Self {
        TimeSeriesColumns {
            datetime_column: datetime_column.into(),
            value_column: value_column.into(),
            status_column: status_column.map(str::to_string),
        }
    }

    /// All configured column names, timestamp first.
    pub fn columns(&self) -> Vec<&str> {
        let mut columns = vec![self.datetime_column.as_str(), self.value_column.as_str()];
        if let Some(status) = &self.status_column {
            columns.push(status.as_str());
        }
        columns
    }
}

/// One decoded sample row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    /// Sample timestamp, normalized to UTC.
    pub timestamp: DateTime<Utc>,
    /// Sample value.
    pub value: f64,
    /// Quality/status code, when the format carries one.
    pub status: Option<i64>,
}

/// Decoder for one stored file format.
///
/// Implementations are shared across lookup workers behind an `Arc`, so they
/// must be `Send + Sync` and hold no per-file state.
pub trait FileFormat: Debug + Send + Sync {
    /// File extension including the leading dot (for example `.parquet`).
    fn extension(&self) -> &'static str;

    /// The column layout this decoder reads.
    fn time_series_columns(&self) -> &TimeSeriesColumns;

    /// Decode file bytes into sample rows.
    ///
    /// Rows with a null timestamp or value are dropped; row order follows the
    /// file and is not re-sorted here.
    fn read_rows(&self, data: Bytes) -> Result<Vec<SamplePoint>, FormatError>;
}

/// Convert an Arrow timestamp column to UTC datetimes, nulls preserved.
fn timestamps_to_utc(
    col: &ArrayRef,
    column: &str,
) -> Result<Vec<Option<DateTime<Utc>>>, FormatError> {
    let unit = match col.data_type() {
        DataType::Timestamp(unit, _) => *unit,
        other => {
            return UnsupportedColumnTypeSnafu { column, datatype: other.to_string() }.fail();
        }
    };
    let raw: Vec<Option<i64>> = match unit {
        TimeUnit::Second => col
            .as_any()
            .downcast_ref::<TimestampSecondArray>()
            .map(|a| a.iter().collect()),
        TimeUnit::Millisecond => col
            .as_any()
            .downcast_ref::<TimestampMillisecondArray>()
            .map(|a| a.iter().collect()),
        TimeUnit::Microsecond => col
            .as_any()
            .downcast_ref::<TimestampMicrosecondArray>()
            .map(|a| a.iter().collect()),
        TimeUnit::Nanosecond => col
            .as_any()
            .downcast_ref::<TimestampNanosecondArray>()
            .map(|a| a.iter().collect()),
    }
    .ok_or_else(|| {
        UnsupportedColumnTypeSnafu { column, datatype: col.data_type().to_string() }.build()
    })?;

    raw.into_iter()
        .map(|opt| {
            opt.map(|value| match unit {
                TimeUnit::Second => {
                    DateTime::from_timestamp(value, 0).context(InvalidTimestampSnafu { value })
                }
                TimeUnit::Millisecond => {
                    DateTime::from_timestamp_millis(value).context(InvalidTimestampSnafu { value })
                }
                TimeUnit::Microsecond => {
                    DateTime::from_timestamp_micros(value).context(InvalidTimestampSnafu { value })
                }
                TimeUnit::Nanosecond => Ok(DateTime::from_timestamp_nanos(value)),
            })
            .transpose()
        })
        .collect()
}

/// Decoder for Parquet sensor files.
#[derive(Debug, Clone)]
pub struct ParquetFormat {
    columns: TimeSeriesColumns,
}

impl ParquetFormat {
    /// Create a Parquet decoder for the given column layout.
    pub fn new(columns: TimeSeriesColumns) -> Self {
        ParquetFormat { columns }
    }
}

impl FileFormat for ParquetFormat {
    fn extension(&self) -> &'static str {
        ".parquet"
    }

    fn time_series_columns(&self) -> &TimeSeriesColumns {
        &self.columns
    }

    fn read_rows(&self, data: Bytes) -> Result<Vec<SamplePoint>, FormatError> {
        let wanted = self.columns.columns();
        let builder = ParquetRecordBatchReaderBuilder::try_new(data).context(ParquetReadSnafu)?;

        let schema = builder.schema().clone();
        for column in &wanted {
            schema
                .index_of(column)
                .map_err(|_| MissingColumnSnafu { column: *column }.build())?;
        }

        let mask = ProjectionMask::columns(builder.parquet_schema(), wanted.iter().copied());
        let reader = builder.with_projection(mask).build().context(ParquetReadSnafu)?;

        let datetime_column = self.columns.datetime_column.as_str();
        let value_column = self.columns.value_column.as_str();

        let mut rows = Vec::new();
        for batch_result in reader {
            let batch = batch_result.context(ArrowReadSnafu)?;
            let batch_schema = batch.schema();

            let ts_idx = batch_schema
                .index_of(datetime_column)
                .map_err(|_| MissingColumnSnafu { column: datetime_column }.build())?;
            let timestamps = timestamps_to_utc(batch.column(ts_idx), datetime_column)?;

            let value_idx = batch_schema
                .index_of(value_column)
                .map_err(|_| MissingColumnSnafu { column: value_column }.build())?;
            let value_arr =
                cast(batch.column(value_idx), &DataType::Float64).context(ArrowReadSnafu)?;
            let values = value_arr
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| {
                    UnsupportedColumnTypeSnafu {
                        column: value_column,
                        datatype: batch.column(value_idx).data_type().to_string(),
                    }
                    .build()
                })?;

            let status_arr: Option<ArrayRef> = match &self.columns.status_column {
                Some(status_column) => {
                    let idx = batch_schema
                        .index_of(status_column)
                        .map_err(|_| MissingColumnSnafu { column: status_column }.build())?;
                    Some(cast(batch.column(idx), &DataType::Int64).context(ArrowReadSnafu)?)
                }
                None => None,
            };
            let status = status_arr
                .as_deref()
                .map(|a| {
                    a.as_any().downcast_ref::<Int64Array>().ok_or_else(|| {
                        UnsupportedColumnTypeSnafu {
                            column: self.columns.status_column.clone().unwrap_or_default(),
                            datatype: a.data_type().to_string(),
                        }
                        .build()
                    })
                })
                .transpose()?;

            for i in 0..batch.num_rows() {
                let Some(timestamp) = timestamps[i] else { continue };
                if values.is_null(i) {
                    continue;
                }
                let status_code = status
                    .filter(|a| !a.is_null(i))
                    .map(|a| a.value(i));
                rows.push(SamplePoint { timestamp, value: values.value(i), status: status_code });
            }
        }
        Ok(rows)
    }
}

/// Decoder for header-less delimited CSV sensor files.
///
/// The caller supplies the full column list of the file; only the configured
/// time-series columns are extracted.
#[derive(Debug, Clone)]
pub struct CsvFormat {
    header: Vec<String>,
    columns: TimeSeriesColumns,
    delimiter: u8,
}

impl CsvFormat {
    /// Create a CSV decoder with the default `;` delimiter.
    pub fn new(header: Vec<String>, columns: TimeSeriesColumns) -> Self {
        CsvFormat { header, columns, delimiter: b';' }
    }

    /// Override the field delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn column_index(&self, column: &str) -> Result<usize, FormatError> {
        self.header
            .iter()
            .position(|name| name == column)
            .ok_or_else(|| MissingColumnSnafu { column }.build())
    }
}

/// Parse a CSV timestamp, accepting RFC 3339, offset-suffixed, and naive-UTC
/// forms.
fn parse_csv_timestamp(value: &str) -> Result<DateTime<Utc>, FormatError> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }
    TimestampParseSnafu { value: trimmed }.fail()
}

impl FileFormat for CsvFormat {
    fn extension(&self) -> &'static str {
        ".csv"
    }

    fn time_series_columns(&self) -> &TimeSeriesColumns {
        &self.columns
    }

    fn read_rows(&self, data: Bytes) -> Result<Vec<SamplePoint>, FormatError> {
        let fields: Vec<Field> = self
            .header
            .iter()
            .map(|name| Field::new(name, DataType::Utf8, true))
            .collect();
        let schema = Arc::new(Schema::new(fields));

        let ts_idx = self.column_index(&self.columns.datetime_column)?;
        let value_idx = self.column_index(&self.columns.value_column)?;
        let status_idx = self
            .columns
            .status_column
            .as_deref()
            .map(|column| self.column_index(column))
            .transpose()?;

        let reader = arrow_csv::ReaderBuilder::new(schema)
            .with_header(false)
            .with_delimiter(self.delimiter)
            .build(Cursor::new(data))
            .context(CsvReadSnafu)?;

        let mut rows = Vec::new();
        for batch_result in reader {
            let batch = batch_result.context(CsvReadSnafu)?;
            let ts = string_column(&batch, ts_idx, &self.columns.datetime_column)?;
            let values = string_column(&batch, value_idx, &self.columns.value_column)?;
            let status = status_idx
                .map(|idx| {
                    string_column(&batch, idx, self.columns.status_column.as_deref().unwrap_or(""))
                })
                .transpose()?;

            for i in 0..batch.num_rows() {
                if ts.is_null(i) || values.is_null(i) {
                    continue;
                }
                let ts_text = ts.value(i);
                let value_text = values.value(i);
                if ts_text.trim().is_empty() || value_text.trim().is_empty() {
                    continue;
                }
                let timestamp = parse_csv_timestamp(ts_text)?;
                let value = value_text.trim().parse::<f64>().map_err(|_| {
                    NumberParseSnafu {
                        value: value_text,
                        column: self.columns.value_column.as_str(),
                    }
                    .build()
                })?;
                let status_code = match status {
                    Some(arr) if !arr.is_null(i) && !arr.value(i).trim().is_empty() => {
                        Some(parse_status(arr.value(i), self.columns.status_column.as_deref())?)
                    }
                    _ => None,
                };
                rows.push(SamplePoint { timestamp, value, status: status_code });
            }
        }
        Ok(rows)
    }
}

fn string_column<'a>(
    batch: &'a arrow::record_batch::RecordBatch,
    idx: usize,
    column: &str,
) -> Result<&'a StringArray, FormatError> {
    batch
        .column(idx)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| {
            UnsupportedColumnTypeSnafu {
                column,
                datatype: batch.column(idx).data_type().to_string(),
            }
            .build()
        })
}

fn parse_status(text: &str, column: Option<&str>) -> Result<i64, FormatError> {
    let trimmed = text.trim();
    if let Ok(code) = trimmed.parse::<i64>() {
        return Ok(code);
    }
    // Some producers write status codes as floats.
    trimmed
        .parse::<f64>()
        .map(|f| f as i64)
        .map_err(|_| NumberParseSnafu { value: trimmed, column: column.unwrap_or("") }.build())
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    //! Parquet fixture helpers shared by this crate's decoder and pipeline
    //! tests.

    use super::*;
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    /// Encode (timestamp ms, value, status) rows as Parquet bytes with the
    /// standard `Time`/`Value`/`Status` layout.
    pub(crate) fn parquet_bytes(rows: &[(i64, f64, i64)]) -> Vec<u8> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("Time", DataType::Timestamp(TimeUnit::Millisecond, None), false),
            Field::new("Value", DataType::Float64, false),
            Field::new("Status", DataType::Int64, false),
        ]));
        let ts = TimestampMillisecondArray::from(rows.iter().map(|r| r.0).collect::<Vec<_>>());
        let values = Float64Array::from(rows.iter().map(|r| r.1).collect::<Vec<_>>());
        let status = Int64Array::from(rows.iter().map(|r| r.2).collect::<Vec<_>>());
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(ts), Arc::new(values), Arc::new(status)],
        )
        .expect("fixture batch");

        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, schema, None).expect("fixture writer");
        writer.write(&batch).expect("fixture write");
        writer.close().expect("fixture close");
        buf
    }
}
