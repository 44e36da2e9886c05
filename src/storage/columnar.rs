//! Columnar encoding of metric datapoints.
//!
//! Rows are written as a single-row-group parquet file with snappy
//! compression; timestamps are epoch milliseconds.

use parquet::basic::Compression;
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::record::RecordWriter;
use parquet_derive::ParquetRecordWriter;
use std::sync::Arc;

use crate::error::{CollectorError, Result};
use crate::model::MetricDatapoint;

#[derive(ParquetRecordWriter)]
struct DatapointRow<'a> {
    resource_type: &'a str,
    resource_id: &'a str,
    metric_name: &'a str,
    timestamp_ms: i64,
    value: f64,
    unit: &'a str,
    statistic: &'a str,
}

/// Encode datapoints as a parquet file in memory.
pub fn encode_datapoints(datapoints: &[MetricDatapoint]) -> Result<Vec<u8>> {
    let rows: Vec<DatapointRow<'_>> = datapoints
        .iter()
        .map(|dp| DatapointRow {
            resource_type: &dp.resource_type,
            resource_id: &dp.resource_id,
            metric_name: &dp.metric_name,
            timestamp_ms: dp.timestamp.timestamp_millis(),
            value: dp.value,
            unit: &dp.unit,
            statistic: &dp.statistic,
        })
        .collect();

    let schema = rows.as_slice().schema().map_err(encode_err)?;
    let properties = Arc::new(
        WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build(),
    );

    let mut buffer = Vec::new();
    let mut writer =
        SerializedFileWriter::new(&mut buffer, schema, properties).map_err(encode_err)?;
    let mut row_group = writer.next_row_group().map_err(encode_err)?;
    rows.as_slice()
        .write_to_row_group(&mut row_group)
        .map_err(encode_err)?;
    row_group.close().map_err(encode_err)?;
    writer.close().map_err(encode_err)?;

    Ok(buffer)
}

fn encode_err(err: ParquetError) -> CollectorError {
    CollectorError::Encode(err.to_string())
}
