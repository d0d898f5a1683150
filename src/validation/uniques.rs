use std::collections::{BTreeMap, HashSet};

use crate::types::DataSet;

use super::ValueKey;

/// Distinct non-missing values per column; NaN is missing, not a value.
pub fn check_unique_values(table: &DataSet) -> BTreeMap<String, usize> {
    table
        .schema
        .fields
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let distinct: HashSet<ValueKey<'_>> = table
                .column_values(idx)
                .filter(|v| !v.is_missing())
                .map(ValueKey::from)
                .collect();
            (field.name.clone(), distinct.len())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, Value};
    use crate::validation::test_support::column;

    #[test]
    fn nulls_are_not_counted() {
        let ds = column(
            "c",
            DataType::Utf8,
            vec![
                Value::Utf8("a".to_string()),
                Value::Null,
                Value::Utf8("b".to_string()),
                Value::Utf8("a".to_string()),
                Value::Null,
            ],
        );
        assert_eq!(check_unique_values(&ds)["c"], 2);
    }

    #[test]
    fn nan_is_not_a_distinct_value() {
        let ds = column(
            "f",
            DataType::Float64,
            vec![Value::Float64(1.0), Value::Float64(f64::NAN), Value::Null, Value::Float64(1.0)],
        );
        assert_eq!(check_unique_values(&ds)["f"], 1);
    }
}
