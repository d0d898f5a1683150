//! Source descriptors and their serde-loadable configuration.
//!
//! A [`SourceDescriptor`] is validated once, at construction: the format is resolved (purely
//! lexically) first, then backend-specific checks run. For `local` sources the path must be an
//! existing regular file; remote sources are only checked when fetched.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use zeroize::ZeroizeOnDrop;

use crate::error::{IngestionError, IngestionResult};
use crate::types::Schema;

use super::decoder::DecodeOptions;
use super::format::{resolve_format, TableFormat};
use super::parquet::ParquetEngine;

/// Which physical backend a source lives in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Local,
    S3,
    Azure,
    Database,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::S3 => "s3",
            Self::Azure => "azure",
            Self::Database => "database",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = IngestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "local" => Ok(Self::Local),
            "s3" => Ok(Self::S3),
            "azure" => Ok(Self::Azure),
            "database" => Ok(Self::Database),
            other => Err(IngestionError::invalid_option(format!(
                "unknown data_source '{other}' (expected local, s3, azure or database)"
            ))),
        }
    }
}

/// A credential string that is zeroized on drop and never printed.
#[derive(Clone, PartialEq, Eq, Deserialize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The secret value. Avoid storing the result.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(***)")
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Raw source options, as read from a JSON config file or a string map.
///
/// Field names are the option names accepted everywhere (CLI `--config` files included).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// File path or object/location identifier. Ignored for `database` sources.
    #[serde(default)]
    pub data_path: String,
    /// `local` (default), `s3`, `azure` or `database`.
    pub data_source: Option<String>,
    /// Explicit format hint, overriding the extension.
    pub format: Option<String>,
    pub connection_string: Option<SecretString>,
    /// Azure container, when not part of the location.
    pub container: Option<String>,
    /// The single read query of a `database` source.
    pub query: Option<String>,
    pub sheets: Option<Vec<String>>,
    /// Parquet engine: `auto`, `native` or `polars`.
    pub engine: Option<String>,
    pub aws_access_key: Option<String>,
    pub aws_secret_key: Option<SecretString>,
    pub aws_region: Option<String>,
    /// Custom object-store endpoint (S3-compatible stores, emulators).
    pub endpoint: Option<String>,
}

impl SourceConfig {
    /// Config for a local file.
    pub fn new(data_path: impl Into<String>) -> Self {
        Self {
            data_path: data_path.into(),
            ..Default::default()
        }
    }

    /// Load a config from a JSON document on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> IngestionResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| IngestionError::DataLoading {
            message: format!("invalid source config {}: {e}", path.display()),
            source: Some(Box::new(e)),
        })
    }

    /// Build a config from `option -> value` pairs. `sheets` is a comma-separated list.
    pub fn from_params<K, V>(params: impl IntoIterator<Item = (K, V)>) -> IngestionResult<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut cfg = Self::default();
        for (key, value) in params {
            let value = value.as_ref().to_string();
            match key.as_ref() {
                "data_path" => cfg.data_path = value,
                "data_source" => cfg.data_source = Some(value),
                "format" => cfg.format = Some(value),
                "connection_string" => cfg.connection_string = Some(value.into()),
                "container" => cfg.container = Some(value),
                "query" => cfg.query = Some(value),
                "sheets" => {
                    cfg.sheets = Some(
                        value
                            .split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                            .collect(),
                    )
                }
                "engine" => cfg.engine = Some(value),
                "aws_access_key" => cfg.aws_access_key = Some(value),
                "aws_secret_key" => cfg.aws_secret_key = Some(value.into()),
                "aws_region" => cfg.aws_region = Some(value),
                "endpoint" => cfg.endpoint = Some(value),
                other => {
                    return Err(IngestionError::invalid_option(format!(
                        "unknown source option '{other}'"
                    )));
                }
            }
        }
        Ok(cfg)
    }
}

impl TryFrom<HashMap<String, String>> for SourceConfig {
    type Error = IngestionError;

    fn try_from(params: HashMap<String, String>) -> Result<Self, Self::Error> {
        Self::from_params(params)
    }
}

/// Bucket (or container) plus object key of a remote source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

/// Explicit S3 settings; anything unset falls back to the standard `AWS_*` environment.
#[derive(Debug, Clone, Default)]
pub struct S3Settings {
    pub access_key: Option<String>,
    pub secret_key: Option<SecretString>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

/// A validated, immutable description of where and how to load one source.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    location: String,
    kind: SourceKind,
    format: Option<TableFormat>,
    object: Option<ObjectLocation>,
    connection_string: Option<SecretString>,
    query: Option<String>,
    sheets: Option<Vec<String>>,
    engine: ParquetEngine,
    schema: Option<Schema>,
    s3: S3Settings,
}

impl SourceDescriptor {
    /// A local file; format from its extension.
    pub fn local(path: impl AsRef<Path>) -> IngestionResult<Self> {
        Self::from_config(SourceConfig::new(path.as_ref().to_string_lossy()))
    }

    /// An S3 object at `s3://bucket/key` (or `bucket/key`). Credentials come from the
    /// environment.
    pub fn s3(location: impl Into<String>) -> IngestionResult<Self> {
        Self::from_config(SourceConfig {
            data_path: location.into(),
            data_source: Some(SourceKind::S3.to_string()),
            ..Default::default()
        })
    }

    /// An Azure blob at `azure://container/blob`, authenticated by `connection_string`.
    pub fn azure(
        location: impl Into<String>,
        connection_string: impl Into<SecretString>,
    ) -> IngestionResult<Self> {
        Self::from_config(SourceConfig {
            data_path: location.into(),
            data_source: Some(SourceKind::Azure.to_string()),
            connection_string: Some(connection_string.into()),
            ..Default::default()
        })
    }

    /// The result set of one `query` against the database at `connection_string`.
    pub fn database(
        connection_string: impl Into<SecretString>,
        query: impl Into<String>,
    ) -> IngestionResult<Self> {
        Self::from_config(SourceConfig {
            data_source: Some(SourceKind::Database.to_string()),
            connection_string: Some(connection_string.into()),
            query: Some(query.into()),
            ..Default::default()
        })
    }

    /// Validate `cfg` into a descriptor.
    ///
    /// Order of checks: data source, format (no I/O), engine, then backend-specific options
    /// and, for local sources, the path itself.
    pub fn from_config(cfg: SourceConfig) -> IngestionResult<Self> {
        let kind = match cfg.data_source.as_deref() {
            Some(s) => s.parse()?,
            None => SourceKind::Local,
        };

        let format = match kind {
            SourceKind::Database => None,
            _ => Some(resolve_format(&cfg.data_path, cfg.format.as_deref())?),
        };

        let engine = match cfg.engine.as_deref() {
            Some(e) => e
                .parse::<ParquetEngine>()
                .map_err(|cause| IngestionError::decode(TableFormat::Parquet, cause))?,
            None => ParquetEngine::default(),
        };

        let object = match kind {
            SourceKind::Local => {
                check_local_file(Path::new(&cfg.data_path))?;
                None
            }
            SourceKind::S3 => Some(parse_s3_location(&cfg.data_path)?),
            SourceKind::Azure => Some(parse_azure_location(&cfg.data_path, cfg.container.as_deref())?),
            SourceKind::Database => {
                if cfg.connection_string.is_none() {
                    return Err(IngestionError::invalid_option(
                        "database source requires 'connection_string'",
                    ));
                }
                if cfg.query.as_deref().is_none_or(|q| q.trim().is_empty()) {
                    return Err(IngestionError::invalid_option("database source requires 'query'"));
                }
                None
            }
        };

        Ok(Self {
            location: cfg.data_path,
            kind,
            format,
            object,
            connection_string: cfg.connection_string,
            query: cfg.query,
            sheets: cfg.sheets,
            engine,
            schema: None,
            s3: S3Settings {
                access_key: cfg.aws_access_key,
                secret_key: cfg.aws_secret_key,
                region: cfg.aws_region,
                endpoint: cfg.endpoint,
            },
        })
    }

    /// Restrict spreadsheet decoding to these sheets, in this order.
    pub fn with_sheets<I, S>(mut self, sheets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sheets = Some(sheets.into_iter().map(Into::into).collect());
        self
    }

    /// Parse exactly these columns into these types instead of inferring.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Resolved format; `None` for database sources.
    pub fn format(&self) -> Option<TableFormat> {
        self.format
    }

    pub fn object(&self) -> Option<&ObjectLocation> {
        self.object.as_ref()
    }

    pub fn connection_string(&self) -> Option<&SecretString> {
        self.connection_string.as_ref()
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn sheets(&self) -> Option<&[String]> {
        self.sheets.as_deref()
    }

    pub fn engine(&self) -> ParquetEngine {
        self.engine
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn s3_settings(&self) -> &S3Settings {
        &self.s3
    }

    /// Short name used for single-table results: the file/object name, or `query`.
    pub fn display_name(&self) -> String {
        match self.kind {
            SourceKind::Database => "query".to_string(),
            _ => short_name(&self.location),
        }
    }

    pub(crate) fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            sheets: self.sheets.clone(),
            engine: self.engine,
            schema: self.schema.clone(),
        }
    }
}

/// Last path segment of `location` (the whole location if it has none).
pub(crate) fn short_name(location: &str) -> String {
    match location.rsplit(['/', '\\']).next() {
        Some(last) if !last.is_empty() => last.to_string(),
        _ => location.to_string(),
    }
}

/// `PathNotFound` / `NotAFile` before any read.
pub(crate) fn check_local_file(path: &Path) -> IngestionResult<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(IngestionError::NotAFile {
            path: path.to_path_buf(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(IngestionError::PathNotFound {
            path: PathBuf::from(path),
        }),
        Err(e) => Err(e.into()),
    }
}

fn split_bucket_key(rest: &str, what: &str, location: &str) -> IngestionResult<ObjectLocation> {
    match rest.split_once('/') {
        Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok(ObjectLocation {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }),
        _ => Err(IngestionError::invalid_option(format!(
            "{what} location '{location}' must look like <bucket>/<key>"
        ))),
    }
}

fn parse_s3_location(location: &str) -> IngestionResult<ObjectLocation> {
    let rest = location.strip_prefix("s3://").unwrap_or(location);
    split_bucket_key(rest, "s3", location)
}

fn parse_azure_location(location: &str, container: Option<&str>) -> IngestionResult<ObjectLocation> {
    let prefixed = location
        .strip_prefix("azure://")
        .or_else(|| location.strip_prefix("az://"));
    match (prefixed, container) {
        (Some(rest), _) => split_bucket_key(rest, "azure", location),
        (None, Some(container)) if !container.is_empty() && !location.is_empty() => {
            Ok(ObjectLocation {
                bucket: container.to_string(),
                key: location.to_string(),
            })
        }
        _ => Err(IngestionError::invalid_option(format!(
            "azure location '{location}' needs a 'container' option or an azure://<container>/<blob> path"
        ))),
    }
}
