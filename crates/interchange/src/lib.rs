//! dayroll-interchange: moving dayroll data in and out of files.
//!
//! - [`sheet`] reads daily field sheets (CSV) into raw rows for a
//!   [`dayroll_core::SnapshotStoreBuilder`]
//! - [`csv`] and [`parquet`] encode and decode every view losslessly
//! - [`bundle`] writes all views plus a `manifest.json` into a directory
//!
//! Column layouts live in [`table`]; each view row type implements
//! [`TableRow`].

pub mod bundle;
pub mod csv;
pub mod error;
pub mod parquet;
pub mod sheet;
pub mod table;

pub use bundle::{
    bundled_observed_days, read_manifest, write_bundle, BundleOptions, Format, Manifest,
    ManifestFile,
};
pub use csv::CsvOptions;
pub use error::{IngestError, InterchangeError};
pub use sheet::{
    load_sheet_dir, read_sheet, IngestOptions, LoadedSheets, Sheet, UnflaggedPolicy,
};
pub use table::TableRow;
