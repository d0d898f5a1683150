//! `tabular-intake` command line: load one source and print its quality profile as JSON.

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use serde_json::{Map, Value as Json};

use tabular_intake::ingestion::{IngestionRequest, SecretString, SourceConfig};
use tabular_intake::logging::{init_logging, LogConfig, LogFormat};
use tabular_intake::metadata::DEFAULT_SAMPLE_SIZE;
use tabular_intake::pipeline::{profile_request, TableReport};

#[derive(Parser)]
#[command(
    name = "tabular-intake",
    version,
    about = "Load a tabular source and print its data-quality profile",
    long_about = "Load CSV, JSON, Parquet or spreadsheet data from a local path, S3, Azure Blob \
                  or SQLite and print a data-quality profile (missing values, duplicates, \
                  dtypes, IQR outliers, cardinality) as JSON."
)]
struct Cli {
    /// Path, object URL (s3://bucket/key, azure://container/blob) or empty for databases.
    #[arg(value_name = "DATA_PATH")]
    data_path: Option<String>,

    /// Source kind: local, s3, azure or database.
    #[arg(long = "source", value_name = "KIND")]
    source: Option<String>,

    /// Format hint (csv, json, parquet, xlsx, xls); overrides the extension.
    #[arg(long = "format")]
    format: Option<String>,

    /// Spreadsheet sheet to load; repeat for several. All sheets when omitted.
    #[arg(long = "sheet", value_name = "NAME")]
    sheets: Vec<String>,

    /// Parquet engine: auto, native or polars.
    #[arg(long = "engine")]
    engine: Option<String>,

    /// SQL query for database sources.
    #[arg(long = "query")]
    query: Option<String>,

    /// Database or Azure connection string.
    #[arg(long = "connection-string")]
    connection_string: Option<String>,

    /// Azure container (when DATA_PATH is a bare blob name).
    #[arg(long = "container")]
    container: Option<String>,

    /// JSON file with source options; command-line flags take precedence.
    #[arg(long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print a metadata document published under this name instead of the bare profile.
    #[arg(long = "metadata", value_name = "NAME")]
    metadata: Option<String>,

    /// Sample values per column in the metadata document.
    #[arg(long = "samples", default_value_t = DEFAULT_SAMPLE_SIZE)]
    samples: usize,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "pretty")]
    log_format: LogFormatArg,

    #[command(flatten)]
    verbosity: Verbosity<WarnLevel>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_config = LogConfig::default()
        .with_level(cli.verbosity.tracing_level())
        .with_format(cli.log_format.into())
        .with_ansi(io::stderr().is_terminal());
    init_logging(&log_config).context("failed to initialize logging")?;

    let config = source_config(&cli)?;
    let request = IngestionRequest::new(config);
    let reports = profile_request(&request)
        .with_context(|| format!("failed to load '{}'", request.location()))?;

    let out = render(&reports, cli.metadata.as_deref(), cli.samples)?;
    println!("{out}");
    Ok(())
}

/// Merge the optional config file with command-line flags.
fn source_config(cli: &Cli) -> Result<SourceConfig> {
    let mut cfg = match &cli.config {
        Some(path) => SourceConfig::from_json_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => SourceConfig::default(),
    };

    if let Some(path) = &cli.data_path {
        cfg.data_path = path.clone();
    }
    if cli.source.is_some() {
        cfg.data_source = cli.source.clone();
    }
    if cli.format.is_some() {
        cfg.format = cli.format.clone();
    }
    if !cli.sheets.is_empty() {
        cfg.sheets = Some(cli.sheets.clone());
    }
    if cli.engine.is_some() {
        cfg.engine = cli.engine.clone();
    }
    if cli.query.is_some() {
        cfg.query = cli.query.clone();
    }
    if let Some(conn) = &cli.connection_string {
        cfg.connection_string = Some(SecretString::new(conn.as_str()));
    }
    if cli.container.is_some() {
        cfg.container = cli.container.clone();
    }

    let is_database = cfg.data_source.as_deref().is_some_and(|s| s.eq_ignore_ascii_case("database"));
    if cfg.data_path.is_empty() && !is_database {
        bail!("DATA_PATH is required (positionally or via --config)");
    }
    Ok(cfg)
}

/// One table prints as a bare document; several as an object keyed by table name.
fn render(reports: &[TableReport], metadata: Option<&str>, samples: usize) -> Result<String> {
    let docs = reports
        .iter()
        .map(|r| -> serde_json::Result<(String, Json)> {
            let doc = match metadata {
                Some(name) => serde_json::to_value(r.metadata(name, samples)),
                None => serde_json::to_value(&r.profile),
            }?;
            Ok((r.name.clone(), doc))
        })
        .collect::<serde_json::Result<Vec<(String, Json)>>>()?;

    let value = match <[_; 1]>::try_from(docs) {
        Ok([(_, doc)]) => doc,
        Err(docs) => Json::Object(docs.into_iter().collect::<Map<String, Json>>()),
    };
    Ok(serde_json::to_string_pretty(&value)?)
}
