//! Ingestion entrypoints and implementations.
//!
//! Most callers should build a [`SourceDescriptor`] and call [`load`] (from [`unified`]), which:
//!
//! - resolves the format from the location or an explicit hint ([`format`])
//! - fetches bytes or rows from the right [`backend`]
//! - decodes into in-memory [`crate::types::DataSet`]s ([`decoder`])
//! - optionally reports success/failure/alerts to an [`IngestionObserver`]
//!
//! Format-specific decoders are also available under:
//! - [`csv`]
//! - [`json`]
//! - [`parquet`]
//! - `excel` (feature `excel`)

pub mod backend;
pub mod csv;
pub mod decoder;
pub mod descriptor;
#[cfg(feature = "excel")]
pub mod excel;
pub mod format;
pub(crate) mod infer;
pub mod json;
pub mod observability;
pub mod parquet;
pub mod unified;

pub use backend::{Backend, Fetched};
pub use decoder::{decode, DecodeOptions, Decoded, NamedTable};
pub use descriptor::{SecretString, SourceConfig, SourceDescriptor, SourceKind};
pub use format::{resolve_format, TableFormat};
pub use observability::{
    CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats,
};
pub use parquet::ParquetEngine;
pub use unified::{
    ingest_from_path, load, load_with_backend, severity_for_error, IngestionOptions, IngestionRequest,
};
