//! Relational sources. SQLite through `rusqlite` (cargo feature `database`).
//!
//! Connection strings: `sqlite://<path>`, `sqlite::memory:` or a bare file path. File databases
//! are opened read-only. The connection lives for exactly one [`DatabaseBackend::fetch`].

use std::path::PathBuf;

use crate::error::{IngestionError, IngestionResult};
use crate::ingestion::descriptor::{SecretString, SourceDescriptor, SourceKind};
use crate::types::{DataSet, Schema};

/// Runs one read query and materializes the full result set.
#[derive(Debug, Clone)]
pub struct DatabaseBackend {
    connection_string: SecretString,
    query: String,
}

/// Where a connection string points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SqliteTarget {
    Memory,
    File(PathBuf),
}

impl DatabaseBackend {
    pub fn new(connection_string: impl Into<SecretString>, query: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            query: query.into(),
        }
    }

    pub(crate) fn from_descriptor(descriptor: &SourceDescriptor) -> IngestionResult<Self> {
        match (descriptor.connection_string(), descriptor.query()) {
            (Some(conn), Some(query)) => Ok(Self::new(conn.clone(), query)),
            _ => Err(IngestionError::invalid_option(
                "database source requires 'connection_string' and 'query'",
            )),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Open, run the query, close. With a declared `schema` the result columns are projected
    /// and parsed like any decoded table.
    pub fn fetch(&self, schema: Option<&Schema>) -> IngestionResult<DataSet> {
        let target = parse_connection_string(self.connection_string.expose())?;
        sqlite::fetch(&target, &self.query, schema)
    }
}

/// Classify a connection string. Any driver other than sqlite is rejected.
pub(crate) fn parse_connection_string(input: &str) -> IngestionResult<SqliteTarget> {
    let trimmed = input.trim();
    let rest = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"));

    match rest {
        Some(":memory:") => Ok(SqliteTarget::Memory),
        Some("") => Err(IngestionError::BackendConnection {
            backend: SourceKind::Database,
            message: "sqlite connection string has no database path".to_string(),
            source: None,
        }),
        Some(path) => Ok(SqliteTarget::File(PathBuf::from(path))),
        None if trimmed == ":memory:" => Ok(SqliteTarget::Memory),
        None => match trimmed.split_once("://") {
            Some((scheme, _)) => Err(IngestionError::BackendConnection {
                backend: SourceKind::Database,
                message: format!("unsupported database driver '{scheme}' (only sqlite is available)"),
                source: None,
            }),
            None => Ok(SqliteTarget::File(PathBuf::from(trimmed))),
        },
    }
}

#[cfg(feature = "database")]
mod sqlite {
    use rusqlite::types::ValueRef;
    use rusqlite::{Connection, OpenFlags};

    use super::*;
    use crate::ingestion::infer::{build_dataset, RawTable, RowLabels, Scalar};

    fn db_err(message: &str, e: rusqlite::Error) -> IngestionError {
        IngestionError::backend(SourceKind::Database, message, e)
    }

    pub(super) fn fetch(
        target: &SqliteTarget,
        query: &str,
        schema: Option<&Schema>,
    ) -> IngestionResult<DataSet> {
        let conn = match target {
            SqliteTarget::Memory => Connection::open_in_memory(),
            SqliteTarget::File(path) => Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            ),
        }
        .map_err(|e| db_err("failed to open connection", e))?;

        let raw = run_query(&conn, query).map_err(|e| db_err("query failed", e))?;
        conn.close().map_err(|(_, e)| db_err("failed to close connection", e))?;

        build_dataset(raw, schema, None, &RowLabels::default()).map_err(|cause| {
            IngestionError::DataLoading {
                message: format!("query result could not be converted: {cause}"),
                source: Some(Box::new(cause)),
            }
        })
    }

    fn run_query(conn: &Connection, query: &str) -> rusqlite::Result<RawTable<Scalar>> {
        let mut stmt = conn.prepare(query)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            let mut cells = Vec::with_capacity(width);
            for idx in 0..width {
                cells.push(match row.get_ref(idx)? {
                    ValueRef::Null => Scalar::Null,
                    ValueRef::Integer(v) => Scalar::Int(v),
                    ValueRef::Real(v) => Scalar::Float(v),
                    ValueRef::Text(t) => Scalar::Text(String::from_utf8_lossy(t).into_owned()),
                    ValueRef::Blob(b) => Scalar::Text(b.iter().map(|byte| format!("{byte:02x}")).collect()),
                });
            }
            rows.push(cells);
        }
        Ok(RawTable { columns, rows })
    }
}

#[cfg(not(feature = "database"))]
mod sqlite {
    use super::*;

    pub(super) fn fetch(
        _target: &SqliteTarget,
        _query: &str,
        _schema: Option<&Schema>,
    ) -> IngestionResult<DataSet> {
        Err(IngestionError::BackendConnection {
            backend: SourceKind::Database,
            message: "database support not enabled (enable cargo feature 'database')".to_string(),
            source: None,
        })
    }
}
