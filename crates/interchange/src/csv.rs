//! CSV encoding of dayroll views.
//!
//! Days are written as ISO `YYYY-MM-DD`; empty optional cells read back as
//! absent.

use std::io::Cursor;

use arrow::csv::{ReaderBuilder, WriterBuilder};
use bytes::Bytes;

use crate::error::Result;
use crate::table::TableRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions { delimiter: b',' }
    }
}

/// Encodes `rows` as CSV with a header line.
///
/// # Errors
///
/// Returns an error if the record batch cannot be built or encoded.
pub fn write_rows<T: TableRow>(rows: &[T], options: &CsvOptions) -> Result<Bytes> {
    let batch = T::to_batch(rows)?;
    let mut writer = WriterBuilder::new()
        .with_header(true)
        .with_delimiter(options.delimiter)
        .build(Vec::<u8>::new());
    writer.write(&batch)?;
    Ok(Bytes::from(writer.into_inner()))
}

/// Decodes CSV written by [`write_rows`] with the same options.
///
/// # Errors
///
/// Returns an error if a cell does not parse as its column type or a
/// required column is empty.
pub fn read_rows<T: TableRow>(bytes: &[u8], options: &CsvOptions) -> Result<Vec<T>> {
    let reader = ReaderBuilder::new(T::schema())
        .with_header(true)
        .with_delimiter(options.delimiter)
        .build(Cursor::new(bytes))?;
    let mut out = Vec::new();
    for batch in reader {
        out.extend(T::from_batch(&batch?)?);
    }
    Ok(out)
}
