//! Data-quality profiling.
//!
//! Five independent checks, each a pure function of one [`DataSet`]:
//!
//! - [`check_missing_values`]: per-column null count and percentage of rows
//! - [`check_duplicates`]: rows repeating an earlier row
//! - [`check_data_types`]: per-column type tag
//! - [`check_outliers`]: IQR bounds and out-of-bounds count for numeric columns
//! - [`check_unique_values`]: distinct non-null values per column
//!
//! [`generate_summary`] runs all five and composes a [`ValidationProfile`].
//!
//! ```rust
//! use tabular_intake::types::{DataSet, DataType, Field, Schema, Value};
//! use tabular_intake::validation::generate_summary;
//!
//! let ds = DataSet::new(
//!     Schema::new(vec![Field::new("x", DataType::Int64)]),
//!     [1, 2, 2, 3, 4, 5, 100].into_iter().map(|v| vec![Value::Int64(v)]).collect(),
//! );
//! let profile = generate_summary(&ds);
//! assert_eq!(profile.outliers["x"].outlier_count, 1);
//! assert_eq!(profile.duplicate_row_count, 1);
//! ```

mod duplicates;
mod missing;
mod outliers;
mod uniques;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{DataSet, DataType, Value};

pub use duplicates::check_duplicates;
pub use missing::{check_missing_values, MissingStat};
pub use outliers::{check_outliers, quantile, OutlierStat};
pub use uniques::check_unique_values;

/// Non-fatal conditions noticed while profiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileWarning {
    /// The table has zero rows; every statistic is zero.
    EmptyTable,
}

/// Aggregate quality profile of one table snapshot.
///
/// Maps are keyed by column name (sorted), so the serialized form is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationProfile {
    pub missing: BTreeMap<String, MissingStat>,
    pub duplicate_row_count: usize,
    pub dtype: BTreeMap<String, DataType>,
    /// Numeric (`int64`/`float64`) columns only.
    pub outliers: BTreeMap<String, OutlierStat>,
    pub unique_counts: BTreeMap<String, usize>,
    pub row_count: usize,
    pub warnings: Vec<ProfileWarning>,
}

/// Per-column type tags, as declared by the table schema.
pub fn check_data_types(table: &DataSet) -> BTreeMap<String, DataType> {
    table
        .schema
        .fields
        .iter()
        .map(|f| (f.name.clone(), f.data_type))
        .collect()
}

/// Run every check over `table`.
///
/// Pure: the same table always yields an equal profile. An empty table is not an error; it
/// yields zero counts and a [`ProfileWarning::EmptyTable`].
pub fn generate_summary(table: &DataSet) -> ValidationProfile {
    let mut warnings = Vec::new();
    if table.is_empty() {
        tracing::warn!(columns = table.column_count(), "profiling an empty table");
        warnings.push(ProfileWarning::EmptyTable);
    }

    let missing = check_missing_values(table);
    tracing::debug!(columns = missing.len(), "missing-value census done");

    let duplicate_row_count = check_duplicates(table);
    tracing::debug!(duplicate_row_count, "duplicate check done");

    let dtype = check_data_types(table);

    let outliers = check_outliers(table);
    tracing::debug!(numeric_columns = outliers.len(), "outlier check done");

    let unique_counts = check_unique_values(table);
    tracing::debug!(columns = unique_counts.len(), "unique-value count done");

    ValidationProfile {
        missing,
        duplicate_row_count,
        dtype,
        outliers,
        unique_counts,
        row_count: table.row_count(),
        warnings,
    }
}

/// Hashable view of a [`Value`]. Floats compare by bit pattern with `-0.0` folded into `0.0`
/// and every NaN folded into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ValueKey<'a> {
    Null,
    Int(i64),
    Float(u64),
    Bool(bool),
    Str(&'a str),
}

impl<'a> From<&'a Value> for ValueKey<'a> {
    fn from(v: &'a Value) -> Self {
        match v {
            Value::Null => Self::Null,
            Value::Int64(i) => Self::Int(*i),
            Value::Float64(f) if f.is_nan() => Self::Float(f64::NAN.to_bits()),
            Value::Float64(f) if *f == 0.0 => Self::Float(0.0f64.to_bits()),
            Value::Float64(f) => Self::Float(f.to_bits()),
            Value::Bool(b) => Self::Bool(*b),
            Value::Utf8(s) => Self::Str(s.as_str()),
        }
    }
}
