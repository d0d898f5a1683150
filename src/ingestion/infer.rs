//! Shared column typing for every decoder.
//!
//! Decoders first collect a [`RawTable`] of format-native cells (CSV text, JSON values,
//! spreadsheet cells, parquet fields, SQL values), then [`build_dataset`] turns it into a
//! [`DataSet`]:
//!
//! - with a declared [`Schema`], the declared columns are projected by name and every cell is
//!   parsed into the declared type;
//! - otherwise each column gets the narrowest of `Int64 -> Float64 -> Bool -> Utf8` that all
//!   of its non-missing cells fit.

use crate::error::{DecodeCause, DecodeResult};
use crate::types::{dedupe_column_names, DataSet, DataType, Field, Schema, Value};

/// What a raw cell looks like before typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CellKind {
    Null,
    Int,
    Float,
    Bool,
    Text,
}

/// A format-native cell that can be classified and converted into a [`Value`].
pub(crate) trait RawCell {
    fn kind(&self) -> CellKind;
    fn to_i64(&self) -> Result<i64, String>;
    fn to_f64(&self) -> Result<f64, String>;
    fn to_bool(&self) -> Result<bool, String>;
    fn to_text(&self) -> String;
}

/// Header plus row-major raw cells. Rows may be shorter than the header; absent cells are
/// missing values.
#[derive(Debug)]
pub(crate) struct RawTable<C> {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<C>>,
}

/// How rows are numbered in parse errors.
#[derive(Debug, Clone)]
pub(crate) struct RowLabels {
    /// User-facing number of the first data row.
    pub first_row: usize,
    /// Prefix for column names in errors (e.g. the sheet name).
    pub column_prefix: Option<String>,
}

impl Default for RowLabels {
    fn default() -> Self {
        Self {
            first_row: 1,
            column_prefix: None,
        }
    }
}

impl RowLabels {
    fn column(&self, name: &str) -> String {
        match &self.column_prefix {
            Some(prefix) => format!("{prefix}:{name}"),
            None => name.to_string(),
        }
    }
}

/// Text tokens read as missing values by the text formats.
pub(crate) const NULL_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// Build a typed [`DataSet`] from raw cells.
///
/// `native_types` supplies column types from the source's own metadata (parquet physical
/// types); it is only consulted when no schema is declared.
pub(crate) fn build_dataset<C: RawCell>(
    raw: RawTable<C>,
    declared: Option<&Schema>,
    native_types: Option<Vec<DataType>>,
    labels: &RowLabels,
) -> DecodeResult<DataSet> {
    match declared {
        Some(schema) => build_declared(raw, schema, labels),
        None => build_inferred(raw, native_types, labels),
    }
}

fn build_declared<C: RawCell>(
    raw: RawTable<C>,
    schema: &Schema,
    labels: &RowLabels,
) -> DecodeResult<DataSet> {
    // Map schema fields -> raw column indexes (allows re-ordered source columns).
    let mut col_idxs = Vec::with_capacity(schema.fields.len());
    for field in &schema.fields {
        match raw.columns.iter().position(|h| h.trim() == field.name) {
            Some(idx) => col_idxs.push(idx),
            None => {
                return Err(DecodeCause::SchemaMismatch {
                    message: format!(
                        "missing required column '{}'. headers={:?}",
                        field.name, raw.columns
                    ),
                });
            }
        }
    }

    let mut rows = Vec::with_capacity(raw.rows.len());
    for (idx0, raw_row) in raw.rows.iter().enumerate() {
        let user_row = labels.first_row + idx0;
        let mut row = Vec::with_capacity(schema.fields.len());
        for (field, &col_idx) in schema.fields.iter().zip(col_idxs.iter()) {
            row.push(convert_cell(
                user_row,
                &labels.column(&field.name),
                field.data_type,
                raw_row.get(col_idx),
            )?);
        }
        rows.push(row);
    }

    Ok(DataSet::new(schema.clone(), rows))
}

fn build_inferred<C: RawCell>(
    raw: RawTable<C>,
    native_types: Option<Vec<DataType>>,
    labels: &RowLabels,
) -> DecodeResult<DataSet> {
    let width = raw.columns.len();
    let types: Vec<DataType> = match native_types {
        Some(types) if types.len() == width => types,
        _ => (0..width)
            .map(|idx| infer_column_type(raw.rows.iter().filter_map(|row| row.get(idx))))
            .collect(),
    };

    let names = dedupe_column_names(raw.columns);
    let schema = Schema::new(
        names
            .into_iter()
            .zip(types.iter())
            .map(|(name, dt)| Field::new(name, *dt))
            .collect(),
    );

    let mut rows = Vec::with_capacity(raw.rows.len());
    for (idx0, raw_row) in raw.rows.iter().enumerate() {
        let user_row = labels.first_row + idx0;
        let mut row = Vec::with_capacity(width);
        for (idx, field) in schema.fields.iter().enumerate() {
            row.push(convert_cell(
                user_row,
                &labels.column(&field.name),
                field.data_type,
                raw_row.get(idx),
            )?);
        }
        rows.push(row);
    }

    Ok(DataSet::new(schema, rows))
}

/// Narrowest type every non-missing cell fits; all-missing columns are `Utf8`.
pub(crate) fn infer_column_type<'a, C, I>(cells: I) -> DataType
where
    C: RawCell + 'a,
    I: Iterator<Item = &'a C>,
{
    let mut current: Option<DataType> = None;
    for cell in cells {
        current = match (cell.kind(), current) {
            (CellKind::Null, cur) => cur,
            (CellKind::Text, _) => return DataType::Utf8,
            (CellKind::Int, None | Some(DataType::Int64)) => Some(DataType::Int64),
            (CellKind::Int | CellKind::Float, Some(DataType::Float64)) => Some(DataType::Float64),
            (CellKind::Float, None | Some(DataType::Int64)) => Some(DataType::Float64),
            (CellKind::Bool, None | Some(DataType::Bool)) => Some(DataType::Bool),
            _ => return DataType::Utf8,
        };
    }
    current.unwrap_or(DataType::Utf8)
}

fn convert_cell<C: RawCell>(
    row: usize,
    column: &str,
    data_type: DataType,
    cell: Option<&C>,
) -> DecodeResult<Value> {
    let cell = match cell {
        Some(c) if c.kind() != CellKind::Null => c,
        _ => return Ok(Value::Null),
    };

    let parse_err = |message: String| DecodeCause::ParseError {
        row,
        column: column.to_string(),
        raw: cell.to_text(),
        message,
    };

    match data_type {
        DataType::Utf8 => Ok(Value::Utf8(cell.to_text())),
        DataType::Int64 => cell.to_i64().map(Value::Int64).map_err(parse_err),
        DataType::Float64 => cell.to_f64().map(Value::Float64).map_err(parse_err),
        DataType::Bool => cell.to_bool().map(Value::Bool).map_err(parse_err),
    }
}

/// Lenient boolean parsing used for declared `Bool` columns.
pub(crate) fn parse_bool(s: &str) -> Result<bool, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        _ => Err("expected bool (true/false/1/0/yes/no)".to_string()),
    }
}

/// Text cells (CSV fields and similar).
impl RawCell for String {
    fn kind(&self) -> CellKind {
        let trimmed = self.trim();
        if NULL_TOKENS.contains(&trimmed) {
            CellKind::Null
        } else if trimmed.parse::<i64>().is_ok() {
            CellKind::Int
        } else if trimmed.parse::<f64>().is_ok() {
            CellKind::Float
        } else if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
            CellKind::Bool
        } else {
            CellKind::Text
        }
    }

    fn to_i64(&self) -> Result<i64, String> {
        self.trim().parse::<i64>().map_err(|e| e.to_string())
    }

    fn to_f64(&self) -> Result<f64, String> {
        self.trim().parse::<f64>().map_err(|e| e.to_string())
    }

    fn to_bool(&self) -> Result<bool, String> {
        parse_bool(self)
    }

    fn to_text(&self) -> String {
        self.trim().to_owned()
    }
}

/// Owned, already-typed cell used by sources that hand over native scalars (SQL rows, Polars
/// columns).
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Scalar {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl RawCell for Scalar {
    fn kind(&self) -> CellKind {
        match self {
            Self::Null => CellKind::Null,
            Self::Int(_) => CellKind::Int,
            Self::Float(_) => CellKind::Float,
            Self::Bool(_) => CellKind::Bool,
            Self::Text(_) => CellKind::Text,
        }
    }

    fn to_i64(&self) -> Result<i64, String> {
        match self {
            Self::Int(v) => Ok(*v),
            Self::Float(v) if v.fract() == 0.0 => Ok(*v as i64),
            Self::Text(s) => s.trim().parse::<i64>().map_err(|e| e.to_string()),
            _ => Err("expected integer".to_string()),
        }
    }

    fn to_f64(&self) -> Result<f64, String> {
        match self {
            Self::Int(v) => Ok(*v as f64),
            Self::Float(v) => Ok(*v),
            Self::Text(s) => s.trim().parse::<f64>().map_err(|e| e.to_string()),
            _ => Err("expected number".to_string()),
        }
    }

    fn to_bool(&self) -> Result<bool, String> {
        match self {
            Self::Bool(b) => Ok(*b),
            Self::Int(v) => Ok(*v != 0),
            Self::Text(s) => parse_bool(s),
            _ => Err("expected bool".to_string()),
        }
    }

    fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Bool(v) => v.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}
