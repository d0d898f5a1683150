//! Unified ingestion entrypoint.
//!
//! Most callers should use [`load`] with a [`SourceDescriptor`], or [`ingest_from_path`] for a
//! local file. Every entrypoint here:
//!
//! - dispatches to the backend for the descriptor's [`super::SourceKind`]
//! - decodes raw payloads by the resolved [`super::TableFormat`]
//! - returns failures as one [`IngestionError`] variant, with the native error as its source
//! - optionally reports success/failure/alerts/warnings to an [`IngestionObserver`]

use std::error::Error as StdError;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::{DecodeCause, IngestionError, IngestionResult};
use crate::types::{Schema, Value};

use super::backend::{Backend, Fetched};
use super::decoder::{decode, Decoded};
use super::descriptor::{short_name, SourceConfig, SourceDescriptor, SourceKind};
use super::format::resolve_format;
use super::observability::{IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats};

/// Options controlling unified ingestion behavior.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct IngestionOptions {
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for IngestionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionOptions")
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

/// Load the source described by `descriptor`.
///
/// CSV, JSON and Parquet payloads and database queries produce [`Decoded::Table`];
/// spreadsheets produce [`Decoded::Sheets`].
///
/// When an observer is configured, this function reports:
///
/// - `on_success` on success, with row and table counts
/// - `on_warning` for every empty table
/// - `on_failure` on failure, with a computed severity
/// - `on_alert` on failure when the computed severity is >= `options.alert_at_or_above`
///
/// # Examples
///
/// ```no_run
/// use tabular_intake::ingestion::{load, IngestionOptions, SourceDescriptor};
///
/// # fn main() -> Result<(), tabular_intake::IngestionError> {
/// let source = SourceDescriptor::local("people.csv")?;
/// let decoded = load(&source, &IngestionOptions::default())?;
/// println!("rows={}", decoded.row_count());
/// # Ok(())
/// # }
/// ```
///
/// ```no_run
/// use tabular_intake::ingestion::{load, IngestionOptions, SourceDescriptor};
///
/// # fn main() -> Result<(), tabular_intake::IngestionError> {
/// let source = SourceDescriptor::database("sqlite://warehouse.db", "SELECT * FROM orders")?;
/// let orders = load(&source, &IngestionOptions::default())?;
/// # let _ = orders;
/// # Ok(())
/// # }
/// ```
pub fn load(descriptor: &SourceDescriptor, options: &IngestionOptions) -> IngestionResult<Decoded> {
    let ctx = context_for(descriptor, descriptor.kind());
    let result = Backend::for_source(descriptor).and_then(|backend| fetch_and_decode(descriptor, &backend));
    report(&ctx, result, options)
}

/// Like [`load`], with an already-built backend (e.g. an object store over an in-memory store).
pub fn load_with_backend(
    descriptor: &SourceDescriptor,
    backend: &Backend,
    options: &IngestionOptions,
) -> IngestionResult<Decoded> {
    let ctx = context_for(descriptor, backend.kind());
    report(&ctx, fetch_and_decode(descriptor, backend), options)
}

/// Load a local file, optionally parsing it into a declared `schema`.
///
/// Format comes from the extension. Descriptor validation failures (unsupported format,
/// missing path) are reported to the observer like any other failure.
pub fn ingest_from_path(
    path: impl AsRef<Path>,
    schema: Option<&Schema>,
    options: &IngestionOptions,
) -> IngestionResult<Decoded> {
    IngestionRequest {
        config: SourceConfig::new(path.as_ref().to_string_lossy()),
        schema: schema.cloned(),
        options: options.clone(),
    }
    .run()
}

fn fetch_and_decode(descriptor: &SourceDescriptor, backend: &Backend) -> IngestionResult<Decoded> {
    tracing::info!(
        backend = %backend.kind(),
        location = descriptor.location(),
        "loading source"
    );

    match backend.fetch(descriptor)? {
        Fetched::Table(table) => Ok(Decoded::Table(table)),
        Fetched::Payload(bytes) => {
            let format = descriptor.format().ok_or_else(|| {
                IngestionError::invalid_option("payload source has no resolved format")
            })?;
            tracing::debug!(bytes = bytes.len(), %format, "decoding payload");
            decode(bytes, format, &descriptor.decode_options())
        }
    }
}

fn context_for(descriptor: &SourceDescriptor, backend: SourceKind) -> IngestionContext {
    IngestionContext {
        location: descriptor.location().to_string(),
        backend,
        format: descriptor.format(),
    }
}

fn report(
    ctx: &IngestionContext,
    result: IngestionResult<Decoded>,
    options: &IngestionOptions,
) -> IngestionResult<Decoded> {
    match &result {
        Ok(decoded) => report_success(ctx, decoded, options),
        Err(e) => report_failure(ctx, e, options),
    }
    result
}

fn report_success(ctx: &IngestionContext, decoded: &Decoded, options: &IngestionOptions) {
    let (tables, missing) = match decoded {
        Decoded::Table(ds) => {
            let name = if ctx.location.is_empty() { "query" } else { ctx.location.as_str() };
            (vec![(name, ds)], count_missing(ds))
        }
        Decoded::Sheets(sheets) => (
            sheets.iter().map(|s| (s.name.as_str(), &s.table)).collect(),
            sheets.iter().map(|s| count_missing(&s.table)).sum(),
        ),
    };
    let stats = IngestionStats {
        rows: decoded.row_count(),
        tables: tables.len(),
    };

    tracing::info!(
        backend = %ctx.backend,
        format = ctx.format_label(),
        location = %ctx.location,
        rows = stats.rows,
        tables = stats.tables,
        "source loaded"
    );
    if missing > 0 {
        tracing::info!(missing, "dataset contains missing values");
    }

    for (name, table) in tables {
        if table.is_empty() {
            let message = format!("empty table loaded from '{name}'");
            tracing::warn!(location = %ctx.location, table = name, "loaded empty table");
            if let Some(obs) = options.observer.as_ref() {
                obs.on_warning(ctx, &message);
            }
        }
    }

    if let Some(obs) = options.observer.as_ref() {
        obs.on_success(ctx, stats);
    }
}

fn report_failure(ctx: &IngestionContext, e: &IngestionError, options: &IngestionOptions) {
    let sev = severity_for_error(e);
    tracing::error!(
        backend = %ctx.backend,
        format = ctx.format_label(),
        location = %ctx.location,
        severity = ?sev,
        error = %e,
        "failed to load source"
    );

    if let Some(obs) = options.observer.as_ref() {
        obs.on_failure(ctx, sev, e);
        if sev >= options.alert_at_or_above {
            obs.on_alert(ctx, sev, e);
        }
    }
}

fn count_missing(ds: &crate::types::DataSet) -> usize {
    ds.rows
        .iter()
        .flat_map(|row| row.iter())
        .filter(|v| matches!(v, Value::Null))
        .count()
}

/// Severity of a load failure.
///
/// Missing files, backend connectivity and I/O anywhere in the cause chain are `Critical`;
/// bad input (format, schema, parse errors) is `Error`.
pub fn severity_for_error(e: &IngestionError) -> IngestionSeverity {
    match e {
        IngestionError::PathNotFound { .. }
        | IngestionError::NotAFile { .. }
        | IngestionError::BackendConnection { .. } => IngestionSeverity::Critical,
        IngestionError::UnsupportedFormat { .. } => IngestionSeverity::Error,
        IngestionError::DataLoading { source, .. } => match source {
            Some(err) if error_chain_contains_io(err.as_ref()) => IngestionSeverity::Critical,
            _ => IngestionSeverity::Error,
        },
        IngestionError::Decode { cause, .. } => match cause {
            DecodeCause::Csv(err) => match err.kind() {
                ::csv::ErrorKind::Io(_) => IngestionSeverity::Critical,
                _ => IngestionSeverity::Error,
            },
            // Parquet errors often wrap IO, but not always in a structured way.
            DecodeCause::Parquet(err) if error_chain_contains_io(err) => IngestionSeverity::Critical,
            _ => IngestionSeverity::Error,
        },
    }
}

fn error_chain_contains_io(e: &(dyn StdError + 'static)) -> bool {
    let mut cur: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = cur {
        if err.is::<std::io::Error>() {
            return true;
        }
        cur = err.source();
    }
    false
}

/// An owned load request: raw source options, an optional declared schema, and options.
///
/// Validation happens in [`Self::run`], so a batch of requests can be built up front and
/// each failure is reported per request.
#[derive(Clone)]
pub struct IngestionRequest {
    /// Source options (validated into a [`SourceDescriptor`] on run).
    pub config: SourceConfig,
    /// Schema to project/parse values into; `None` infers.
    pub schema: Option<Schema>,
    /// Options controlling ingestion.
    pub options: IngestionOptions,
}

impl fmt::Debug for IngestionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionRequest")
            .field("data_path", &self.config.data_path)
            .field("data_source", &self.config.data_source)
            .field("schema_fields", &self.schema.as_ref().map(Schema::len))
            .field("options", &self.options)
            .finish()
    }
}

impl IngestionRequest {
    pub fn new(config: SourceConfig) -> Self {
        Self {
            config,
            schema: None,
            options: IngestionOptions::default(),
        }
    }

    /// A request for a local file.
    pub fn local(path: impl AsRef<Path>) -> Self {
        Self::new(SourceConfig::new(path.as_ref().to_string_lossy()))
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_options(mut self, options: IngestionOptions) -> Self {
        self.options = options;
        self
    }

    /// Location as configured, for labeling results.
    pub fn location(&self) -> &str {
        &self.config.data_path
    }

    /// Name for a single-table result: the file/object name, or `query` for databases.
    pub fn display_name(&self) -> String {
        match self.config.data_source.as_deref().map(str::parse::<SourceKind>) {
            Some(Ok(SourceKind::Database)) => "query".to_string(),
            _ => short_name(&self.config.data_path),
        }
    }

    /// Validate the config, then [`load`] it.
    pub fn run(&self) -> IngestionResult<Decoded> {
        let descriptor = match SourceDescriptor::from_config(self.config.clone()) {
            Ok(d) => d,
            Err(e) => {
                let ctx = IngestionContext {
                    location: self.config.data_path.clone(),
                    backend: self
                        .config
                        .data_source
                        .as_deref()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or_default(),
                    format: resolve_format(&self.config.data_path, self.config.format.as_deref()).ok(),
                };
                report_failure(&ctx, &e, &self.options);
                return Err(e);
            }
        };

        let descriptor = match &self.schema {
            Some(schema) => descriptor.with_schema(schema.clone()),
            None => descriptor,
        };
        load(&descriptor, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::TableFormat;

    #[test]
    fn severity_classification() {
        let missing = IngestionError::PathNotFound {
            path: "x.csv".into(),
        };
        assert_eq!(severity_for_error(&missing), IngestionSeverity::Critical);

        let unsupported = IngestionError::UnsupportedFormat {
            format: "txt".to_string(),
        };
        assert_eq!(severity_for_error(&unsupported), IngestionSeverity::Error);

        let schema = IngestionError::decode(
            TableFormat::Csv,
            DecodeCause::SchemaMismatch {
                message: "missing".to_string(),
            },
        );
        assert_eq!(severity_for_error(&schema), IngestionSeverity::Error);

        let io: IngestionError = std::io::Error::other("disk gone").into();
        assert_eq!(severity_for_error(&io), IngestionSeverity::Critical);
    }
}
