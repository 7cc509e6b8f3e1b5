//! Parquet encoding of dayroll views.

use std::io::Cursor;

use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use ::parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use ::parquet::arrow::ArrowWriter;
use ::parquet::file::properties::WriterProperties;
use ::parquet::format::KeyValue;

use crate::error::Result;
use crate::table::TableRow;

fn writer_properties() -> WriterProperties {
    let created_by = KeyValue {
        key: "created_by".to_string(),
        value: Some(format!("dayroll {}", env!("CARGO_PKG_VERSION"))),
    };
    WriterProperties::builder()
        .set_key_value_metadata(Some(vec![created_by]))
        .build()
}

/// Encodes `rows` as a single-row-group Parquet file.
///
/// # Errors
///
/// Returns an error if the record batch cannot be built or the Parquet write
/// fails.
pub fn write_rows<T: TableRow>(rows: &[T]) -> Result<Bytes> {
    let batch = T::to_batch(rows)?;
    let mut cursor = Cursor::new(Vec::<u8>::new());
    let mut writer = ArrowWriter::try_new(&mut cursor, T::schema(), Some(writer_properties()))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(Bytes::from(cursor.into_inner()))
}

fn read_batches(bytes: &Bytes) -> Result<Vec<RecordBatch>> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(bytes.clone())?.build()?;
    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch?);
    }
    Ok(batches)
}

/// Decodes a Parquet file written by [`write_rows`].
///
/// # Errors
///
/// Returns an error if the file is not valid Parquet or its columns do not
/// match the schema of `T`.
pub fn read_rows<T: TableRow>(bytes: &Bytes) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for batch in read_batches(bytes)? {
        out.extend(T::from_batch(&batch)?);
    }
    Ok(out)
}
