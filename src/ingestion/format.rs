//! Format resolution.
//!
//! The supported set is closed; anything outside it fails with
//! [`IngestionError::UnsupportedFormat`] before any I/O happens.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{IngestionError, IngestionResult};

/// Supported serialization formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    /// Comma-separated values.
    Csv,
    /// Apache Parquet.
    Parquet,
    /// Spreadsheet/workbook (`.xlsx` and friends).
    Spreadsheet,
    /// JSON records, column objects or NDJSON.
    Json,
}

impl TableFormat {
    /// Parse a format from a file extension (case-insensitive, leading `.` allowed).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" | "ndjson" => Some(Self::Json),
            "parquet" | "pq" => Some(Self::Parquet),
            "xlsx" | "xlsm" | "xls" | "ods" => Some(Self::Spreadsheet),
            _ => None,
        }
    }

    /// Canonical lower-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
            Self::Spreadsheet => "xlsx",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for TableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableFormat {
    type Err = IngestionError;

    /// Validate an explicit format hint.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hint = s.trim();
        if hint.eq_ignore_ascii_case("spreadsheet") || hint.eq_ignore_ascii_case("excel") {
            return Ok(Self::Spreadsheet);
        }
        Self::from_extension(hint).ok_or_else(|| IngestionError::UnsupportedFormat {
            format: hint.to_ascii_lowercase(),
        })
    }
}

/// Resolve the format of `location`.
///
/// An explicit `hint` wins over the extension; otherwise the trailing extension of `location`
/// is used. Purely lexical: the location is never touched on disk.
pub fn resolve_format(location: &str, hint: Option<&str>) -> IngestionResult<TableFormat> {
    if let Some(hint) = hint {
        return hint.parse();
    }

    let ext = Path::new(location)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    TableFormat::from_extension(ext).ok_or_else(|| IngestionError::UnsupportedFormat {
        format: ext.to_ascii_lowercase(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_from_extension_case_insensitively() {
        assert_eq!(resolve_format("data.CSV", None).unwrap(), TableFormat::Csv);
        assert_eq!(resolve_format("dir/x.parquet", None).unwrap(), TableFormat::Parquet);
        assert_eq!(resolve_format("book.xlsx", None).unwrap(), TableFormat::Spreadsheet);
        assert_eq!(resolve_format("s3://bucket/k/events.json", None).unwrap(), TableFormat::Json);
    }

    #[test]
    fn hint_overrides_extension() {
        assert_eq!(resolve_format("data.csv", Some("parquet")).unwrap(), TableFormat::Parquet);
        assert_eq!(resolve_format("no_extension", Some("spreadsheet")).unwrap(), TableFormat::Spreadsheet);
    }

    #[test]
    fn rejects_unsupported_extension_and_hint() {
        let err = resolve_format("notes.txt", None).unwrap_err();
        assert!(matches!(err, IngestionError::UnsupportedFormat { ref format } if format == "txt"));

        let err = resolve_format("data.csv", Some("avro")).unwrap_err();
        assert!(matches!(err, IngestionError::UnsupportedFormat { .. }));

        let err = resolve_format("no_extension", None).unwrap_err();
        assert!(matches!(err, IngestionError::UnsupportedFormat { .. }));
    }
}
