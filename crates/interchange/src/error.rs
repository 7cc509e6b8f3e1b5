use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Errors raised while encoding, decoding or writing dayroll tables.
#[derive(Debug, thiserror::Error)]
pub enum InterchangeError {
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] ParquetError),

    #[error("i/o error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not format manifest timestamp: {0}")]
    Timestamp(#[from] time::error::Format),

    /// A decoded table does not have the expected shape.
    #[error("column '{column}': {message}")]
    Schema { column: String, message: String },

    /// A column value could not be converted back into its row field.
    #[error("row {row}, column '{column}': {message}")]
    InvalidValue {
        row: usize,
        column: String,
        message: String,
    },
}

impl InterchangeError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        InterchangeError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Errors raised while reading daily sheets.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("could not decode sheet '{sheet}': {source}")]
    Csv {
        sheet: String,
        #[source]
        source: ArrowError,
    },

    #[error("i/o error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file name does not start with a `YYYY-MM-DD` day.
    #[error("cannot determine the sheet day from file name '{0}'")]
    UndatedSheet(String),
}

pub type Result<T, E = InterchangeError> = std::result::Result<T, E>;
