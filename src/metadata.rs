//! Per-column metadata documents handed to downstream consumers (dashboards, planners).

use serde::Serialize;

use crate::types::{DataSet, DataType, Value};
use crate::validation::ValidationProfile;

/// Default number of sample values per column.
pub const DEFAULT_SAMPLE_SIZE: usize = 5;

/// Name, type and a few example values of one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMetadata {
    pub column_name: String,
    pub data_type: DataType,
    pub sample_values: Vec<Value>,
}

/// Metadata document for one named dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetMetadata {
    pub dashboard_name: String,
    pub columns: Vec<ColumnMetadata>,
    pub data_summary: ValidationProfile,
}

/// Build the metadata document for `table` under `name`.
///
/// Samples are the first `sample_size` non-missing values of each column, top to bottom, so
/// the same table always yields the same document.
pub fn generate_metadata(
    name: &str,
    table: &DataSet,
    profile: ValidationProfile,
    sample_size: usize,
) -> DatasetMetadata {
    tracing::info!(dashboard = name, columns = table.column_count(), "generating metadata");

    let columns = table
        .schema
        .fields
        .iter()
        .enumerate()
        .map(|(idx, field)| ColumnMetadata {
            column_name: field.name.clone(),
            data_type: field.data_type,
            sample_values: table
                .column_values(idx)
                .filter(|v| !v.is_missing())
                .take(sample_size)
                .cloned()
                .collect(),
        })
        .collect();

    DatasetMetadata {
        dashboard_name: name.to_string(),
        columns,
        data_summary: profile,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Field, Schema};
    use crate::validation::generate_summary;

    #[test]
    fn samples_skip_missing_values() {
        let ds = DataSet::new(
            Schema::new(vec![Field::new("n", DataType::Int64)]),
            vec![
                vec![Value::Null],
                vec![Value::Int64(1)],
                vec![Value::Int64(2)],
                vec![Value::Null],
                vec![Value::Int64(3)],
            ],
        );
        let doc = generate_metadata("sales", &ds, generate_summary(&ds), 2);
        assert_eq!(doc.columns[0].sample_values, vec![Value::Int64(1), Value::Int64(2)]);

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["dashboard_name"], "sales");
        assert_eq!(json["columns"][0]["data_type"], "int64");
        assert_eq!(json["data_summary"]["missing"]["n"]["count"], 2);
    }

    #[test]
    fn samples_skip_nan() {
        let ds = DataSet::new(
            Schema::new(vec![Field::new("f", DataType::Float64)]),
            vec![vec![Value::Float64(f64::NAN)], vec![Value::Float64(0.5)]],
        );
        let doc = generate_metadata("sales", &ds, generate_summary(&ds), 5);
        assert_eq!(doc.columns[0].sample_values, vec![Value::Float64(0.5)]);
        assert_eq!(doc.data_summary.missing["f"].count, 1);
    }
}
