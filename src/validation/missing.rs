use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::DataSet;

/// Missing (null or NaN) count of one column and its share of all rows, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MissingStat {
    pub count: usize,
    /// `count / rows * 100`, rounded to two decimals; `0.0` for a zero-row table.
    pub percentage: f64,
}

/// Missing-value census for every column.
pub fn check_missing_values(table: &DataSet) -> BTreeMap<String, MissingStat> {
    let rows = table.row_count();
    table
        .schema
        .fields
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let count = table.column_values(idx).filter(|v| v.is_missing()).count();
            (
                field.name.clone(),
                MissingStat {
                    count,
                    percentage: percentage(count, rows),
                },
            )
        })
        .collect()
}

fn percentage(count: usize, rows: usize) -> f64 {
    if rows == 0 {
        return 0.0;
    }
    let pct = count as f64 * 100.0 / rows as f64;
    (pct * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, Value};
    use crate::validation::test_support::column;

    #[test]
    fn two_of_ten_is_twenty_percent() {
        let mut values = vec![Value::Int64(1); 8];
        values.extend([Value::Null, Value::Null]);
        let stats = check_missing_values(&column("a", DataType::Int64, values));
        assert_eq!(stats["a"], MissingStat { count: 2, percentage: 20.0 });
    }

    #[test]
    fn nan_counts_as_missing() {
        let values = vec![Value::Float64(1.0), Value::Float64(f64::NAN), Value::Null];
        let stats = check_missing_values(&column("f", DataType::Float64, values));
        assert_eq!(stats["f"], MissingStat { count: 2, percentage: 66.67 });
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(0, 0), 0.0);
    }
}
