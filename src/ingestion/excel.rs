#![cfg(feature = "excel")]

use std::io::Cursor;

use bytes::Bytes;
use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::error::{DecodeCause, DecodeResult};
use crate::types::{DataSet, Schema};

use super::infer::{build_dataset, parse_bool, CellKind, RawCell, RawTable, RowLabels};

/// Decode a workbook (`.xlsx`, `.xlsm`, `.xls`, `.ods`) into one [`DataSet`] per sheet.
///
/// Behavior:
/// - `sheets = None` reads every sheet in workbook order; otherwise the named sheets, in the
///   given order
/// - Detects the first non-empty row of each sheet as its header row
/// - A sheet with no non-empty rows decodes to an empty table
pub fn decode_workbook(
    bytes: Bytes,
    sheets: Option<&[String]>,
    declared: Option<&Schema>,
) -> DecodeResult<Vec<(String, DataSet)>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let available = workbook.sheet_names();
    let names: Vec<String> = match sheets {
        Some(names) => {
            if let Some(missing) = names.iter().find(|n| !available.contains(n)) {
                return Err(DecodeCause::UnknownSheet {
                    sheet: missing.clone(),
                    available,
                });
            }
            names.to_vec()
        }
        None => available,
    };
    if names.is_empty() {
        return Err(DecodeCause::SchemaMismatch {
            message: "workbook has no sheets".to_string(),
        });
    }

    let mut out = Vec::with_capacity(names.len());
    for sheet in names {
        let range = workbook.worksheet_range(&sheet)?;
        let ds = decode_sheet_range(&sheet, &range, declared)
            .map_err(|e| wrap_schema_err_with_sheet(&sheet, e))?;
        out.push((sheet, ds));
    }
    Ok(out)
}

fn decode_sheet_range(
    sheet: &str,
    range: &calamine::Range<Data>,
    declared: Option<&Schema>,
) -> DecodeResult<DataSet> {
    let header_row_idx = range
        .rows()
        .position(|row| row.iter().any(|c| !matches!(c, Data::Empty)));

    let raw = match header_row_idx {
        Some(header_idx) => {
            let mut rows = range.rows().skip(header_idx);
            let columns = rows
                .next()
                .map(|row| row.iter().map(cell_to_header_string).collect())
                .unwrap_or_default();
            RawTable {
                columns,
                rows: rows.map(<[Data]>::to_vec).collect(),
            }
        }
        None => RawTable {
            columns: Vec::new(),
            rows: Vec::new(),
        },
    };

    // Report 1-based row numbers (Excel-like): the row right after the header.
    let labels = RowLabels {
        first_row: header_row_idx.map_or(1, |idx| idx + 2),
        column_prefix: Some(sheet.to_string()),
    };
    build_dataset(raw, declared, None, &labels)
}

fn wrap_schema_err_with_sheet(sheet: &str, err: DecodeCause) -> DecodeCause {
    match err {
        DecodeCause::SchemaMismatch { message } => DecodeCause::SchemaMismatch {
            message: format!("sheet '{sheet}': {message}"),
        },
        other => other,
    }
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.trim().to_string(),
        other => other.to_text(),
    }
}

impl RawCell for Data {
    fn kind(&self) -> CellKind {
        match self {
            Data::Empty | Data::Error(_) => CellKind::Null,
            Data::Int(_) => CellKind::Int,
            Data::Float(f) if f.fract() == 0.0 && f.is_finite() => CellKind::Int,
            Data::Float(_) => CellKind::Float,
            Data::Bool(_) => CellKind::Bool,
            Data::String(s) => s.kind(),
            _ => CellKind::Text,
        }
    }

    fn to_i64(&self) -> Result<i64, String> {
        match self {
            Data::Int(i) => Ok(*i),
            Data::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
            Data::Float(_) => Err("expected integer (got non-integer float)".to_string()),
            Data::String(s) => s.trim().parse::<i64>().map_err(|e| e.to_string()),
            _ => Err("expected integer".to_string()),
        }
    }

    fn to_f64(&self) -> Result<f64, String> {
        match self {
            Data::Float(f) => Ok(*f),
            Data::Int(i) => Ok(*i as f64),
            Data::String(s) => s.trim().parse::<f64>().map_err(|e| e.to_string()),
            _ => Err("expected number".to_string()),
        }
    }

    fn to_bool(&self) -> Result<bool, String> {
        match self {
            Data::Bool(b) => Ok(*b),
            Data::Int(i) => Ok(*i != 0),
            Data::Float(f) => Ok(*f != 0.0),
            Data::String(s) => parse_bool(s),
            _ => Err("expected bool".to_string()),
        }
    }

    fn to_text(&self) -> String {
        match self {
            Data::String(s) => s.clone(),
            Data::Float(f) if f.fract() == 0.0 && f.is_finite() => (*f as i64).to_string(),
            Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
            Data::Empty => String::new(),
            other => other.to_string(),
        }
    }
}
