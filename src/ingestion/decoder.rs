//! Format dispatch: raw payload bytes of a known [`TableFormat`] into canonical tables.

use bytes::Bytes;
use serde::Serialize;

use crate::error::{DecodeCause, IngestionError, IngestionResult};
use crate::types::{DataSet, Schema};

use super::format::TableFormat;
use super::parquet::ParquetEngine;
use super::{csv, json, parquet};

/// Decoder options carried over from the source descriptor.
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Spreadsheet sheets to read, in order. `None` reads every sheet.
    pub sheets: Option<Vec<String>>,
    /// Parquet engine.
    pub engine: ParquetEngine,
    /// Optional declared schema; `None` infers column types.
    pub schema: Option<Schema>,
}

/// A table tagged with its name (sheet name, or the source name for single-table formats).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedTable {
    pub name: String,
    #[serde(skip)]
    pub table: DataSet,
}

/// Decoder output: one table, or one table per spreadsheet sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Table(DataSet),
    Sheets(Vec<NamedTable>),
}

impl Decoded {
    /// Total rows across all produced tables.
    pub fn row_count(&self) -> usize {
        match self {
            Self::Table(ds) => ds.row_count(),
            Self::Sheets(sheets) => sheets.iter().map(|s| s.table.row_count()).sum(),
        }
    }

    /// Flatten into named tables; a single table is named `name`.
    pub fn into_tables(self, name: &str) -> Vec<NamedTable> {
        match self {
            Self::Table(table) => vec![NamedTable {
                name: name.to_string(),
                table,
            }],
            Self::Sheets(sheets) => sheets,
        }
    }

    /// The single table, if this is not a multi-sheet result.
    pub fn into_table(self) -> Option<DataSet> {
        match self {
            Self::Table(ds) => Some(ds),
            Self::Sheets(_) => None,
        }
    }
}

/// Decode `bytes` as `format`.
///
/// `csv`, `parquet` and `json` produce [`Decoded::Table`]; spreadsheets produce
/// [`Decoded::Sheets`] in requested (or workbook) order. Every failure is an
/// [`IngestionError::Decode`] carrying the format and the underlying cause.
pub fn decode(bytes: Bytes, format: TableFormat, options: &DecodeOptions) -> IngestionResult<Decoded> {
    let schema = options.schema.as_ref();
    let wrap = |cause: DecodeCause| IngestionError::decode(format, cause);

    match format {
        TableFormat::Csv => csv::decode_csv(&bytes, schema).map(Decoded::Table).map_err(wrap),
        TableFormat::Json => json::decode_json(&bytes, schema).map(Decoded::Table).map_err(wrap),
        TableFormat::Parquet => parquet::decode_parquet(bytes, schema, options.engine)
            .map(Decoded::Table)
            .map_err(wrap),
        TableFormat::Spreadsheet => decode_spreadsheet(bytes, options).map_err(wrap),
    }
}

#[cfg(feature = "excel")]
fn decode_spreadsheet(bytes: Bytes, options: &DecodeOptions) -> Result<Decoded, DecodeCause> {
    let sheets = super::excel::decode_workbook(
        bytes,
        options.sheets.as_deref(),
        options.schema.as_ref(),
    )?;
    Ok(Decoded::Sheets(
        sheets
            .into_iter()
            .map(|(name, table)| NamedTable { name, table })
            .collect(),
    ))
}

#[cfg(not(feature = "excel"))]
fn decode_spreadsheet(_bytes: Bytes, _options: &DecodeOptions) -> Result<Decoded, DecodeCause> {
    Err(DecodeCause::NotEnabled(
        "spreadsheet decoding not enabled (enable cargo feature 'excel')".to_string(),
    ))
}
