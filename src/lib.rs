//! `tabular-intake` loads tabular data from heterogeneous sources into one in-memory
//! [`types::DataSet`] and profiles its quality.
//!
//! The primary entrypoint is [`ingestion::load`], which takes a [`ingestion::SourceDescriptor`]
//! describing *where* the data lives and *how* it is encoded. [`validation::generate_summary`]
//! then produces a [`validation::ValidationProfile`] for any table.
//!
//! ## Sources
//!
//! - **Local filesystem**: any path
//! - **S3** (feature `s3`): `s3://bucket/key` or `bucket/key`
//! - **Azure Blob** (feature `azure`): `azure://container/blob` plus a connection string
//! - **SQLite** (feature `database`, on by default): connection string + query
//!
//! ## Formats (resolved from the extension, or a `format` hint)
//!
//! - **CSV**: `.csv`
//! - **JSON**: `.json` (array of records)
//! - **Parquet**: `.parquet` (native reader; the `polars_engine` feature adds a Polars engine)
//! - **Spreadsheets** (feature `excel`, on by default): `.xlsx`, `.xls`; one table per sheet
//!
//! Without a declared [`types::Schema`], each column gets the narrowest of
//! [`types::DataType::Bool`], [`types::DataType::Int64`], [`types::DataType::Float64`] and
//! [`types::DataType::Utf8`] that holds every non-missing value. Empty cells and JSON `null`
//! become [`types::Value::Null`].
//!
//! ## Load and profile
//!
//! ```no_run
//! use tabular_intake::ingestion::{load, IngestionOptions, SourceDescriptor};
//! use tabular_intake::validation::generate_summary;
//!
//! # fn main() -> Result<(), tabular_intake::IngestionError> {
//! let source = SourceDescriptor::local("sales.csv")?;
//! let table = load(&source, &IngestionOptions::default())?
//!     .into_table()
//!     .unwrap_or_default();
//! let profile = generate_summary(&table);
//! println!("duplicates={}", profile.duplicate_row_count);
//! # Ok(())
//! # }
//! ```
//!
//! Configuration can also come as a string map, using the same option names as a JSON config:
//!
//! ```no_run
//! use tabular_intake::ingestion::{IngestionRequest, SourceConfig};
//! use tabular_intake::pipeline::profile_request;
//!
//! # fn main() -> Result<(), tabular_intake::IngestionError> {
//! let cfg = SourceConfig::from_params([
//!     ("data_path", "reports/q3.xlsx"),
//!     ("sheets", "Summary,Detail"),
//! ])?;
//! for report in profile_request(&IngestionRequest::new(cfg))? {
//!     println!("{}: {} rows", report.name, report.profile.row_count);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Profiling an in-memory table
//!
//! ```rust
//! use tabular_intake::types::{DataSet, DataType, Field, Schema, Value};
//! use tabular_intake::validation::generate_summary;
//!
//! let ds = DataSet::new(
//!     Schema::new(vec![Field::new("score", DataType::Float64)]),
//!     vec![
//!         vec![Value::Float64(1.0)],
//!         vec![Value::Float64(1.0)],
//!         vec![Value::Null],
//!     ],
//! );
//! let profile = generate_summary(&ds);
//! assert_eq!(profile.duplicate_row_count, 1);
//! assert_eq!(profile.missing["score"].count, 1);
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: descriptors, backends, decoders and the unified [`ingestion::load`]
//! - [`validation`]: the data-quality profile
//! - [`metadata`]: per-column metadata documents for downstream consumers
//! - [`pipeline`]: load + profile in one call
//! - [`batch`]: parallel loads over many sources
//! - [`logging`]: `tracing-subscriber` setup for binaries
//! - [`types`]: schema and in-memory dataset types
//! - [`error`]: the error taxonomy

pub mod batch;
pub mod error;
pub mod ingestion;
pub mod logging;
pub mod metadata;
pub mod pipeline;
pub mod types;
pub mod validation;

pub use error::{DecodeCause, IngestionError, IngestionResult};
