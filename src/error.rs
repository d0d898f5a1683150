use std::path::PathBuf;

use thiserror::Error;

use crate::ingestion::{SourceKind, TableFormat};

/// Boxed error used to carry backend-native causes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convenience result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Result type used inside format decoders, before the format is attached.
pub type DecodeResult<T> = Result<T, DecodeCause>;

/// Error type returned by every ingestion entrypoint.
///
/// This is a closed taxonomy: backend- and decoder-specific failures are translated into one of
/// these variants at the ingestion boundary, with the original failure kept as
/// [`std::error::Error::source`].
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The local path does not exist.
    #[error("path not found: {}", path.display())]
    PathNotFound { path: PathBuf },

    /// The local path exists but is not a regular file.
    #[error("not a file: {}", path.display())]
    NotAFile { path: PathBuf },

    /// The format hint or file extension is outside the supported set.
    #[error("unsupported format '{format}' (supported: csv, parquet, xlsx, json)")]
    UnsupportedFormat { format: String },

    /// Transport, authentication or query failure against object storage or a database.
    #[error("{backend} backend error: {message}")]
    BackendConnection {
        backend: SourceKind,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The payload could not be decoded as the declared format.
    #[error("failed to decode {format} payload: {cause}")]
    Decode {
        format: TableFormat,
        #[source]
        cause: DecodeCause,
    },

    /// Any other ingestion failure (I/O on an existing file, invalid source options).
    #[error("data loading failed: {message}")]
    DataLoading {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl IngestionError {
    /// Wrap a decoder failure for `format`.
    pub fn decode(format: TableFormat, cause: impl Into<DecodeCause>) -> Self {
        Self::Decode {
            format,
            cause: cause.into(),
        }
    }

    /// Wrap a backend failure, keeping `source` as the cause.
    pub fn backend<E>(backend: SourceKind, message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::BackendConnection {
            backend,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// An invalid or incomplete source option.
    pub fn invalid_option(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::DataLoading {
            source: Some(Box::new(InvalidOption(message.clone()))),
            message,
        }
    }
}

/// Cause attached to [`IngestionError::DataLoading`] when a source option is invalid.
#[derive(Debug, Error)]
#[error("invalid source option: {0}")]
pub struct InvalidOption(pub String);

impl From<std::io::Error> for IngestionError {
    fn from(e: std::io::Error) -> Self {
        Self::DataLoading {
            message: e.to_string(),
            source: Some(Box::new(e)),
        }
    }
}

/// Underlying reason a payload failed to decode.
#[derive(Debug, Error)]
pub enum DecodeCause {
    /// CSV parse error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parse error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Text payload that is not valid UTF-8.
    #[error("invalid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Parquet read error.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[cfg(feature = "excel")]
    /// Spreadsheet read error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    #[cfg(feature = "polars_engine")]
    /// Polars engine error (feature-gated behind `polars_engine`).
    #[error("polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// The input does not conform to the declared schema or has no usable shape.
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A value could not be parsed into the required [`crate::types::DataType`].
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// The parquet engine selection is not in the allow-list.
    #[error("invalid parquet engine '{engine}' (expected one of: auto, native, polars)")]
    UnknownEngine { engine: String },

    /// A requested sheet is not in the workbook.
    #[error("sheet '{sheet}' not found (available: {available:?})")]
    UnknownSheet {
        sheet: String,
        available: Vec<String>,
    },

    /// The decoder for this format is compiled out.
    #[error("{0}")]
    NotEnabled(String),
}
