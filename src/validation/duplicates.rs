use std::collections::HashSet;

use crate::types::DataSet;

use super::ValueKey;

/// Number of rows that repeat an earlier row exactly (all columns, nulls equal).
///
/// Always `rows - distinct rows`.
pub fn check_duplicates(table: &DataSet) -> usize {
    let mut seen: HashSet<Vec<ValueKey<'_>>> = HashSet::with_capacity(table.row_count());
    table
        .rows
        .iter()
        .filter(|row| !seen.insert(row.iter().map(ValueKey::from).collect()))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, Field, Schema, Value};

    #[test]
    fn nulls_compare_equal() {
        let ds = DataSet::new(
            Schema::new(vec![
                Field::new("a", DataType::Int64),
                Field::new("b", DataType::Utf8),
            ]),
            vec![
                vec![Value::Null, Value::Utf8("x".to_string())],
                vec![Value::Null, Value::Utf8("x".to_string())],
                vec![Value::Int64(1), Value::Null],
                vec![Value::Null, Value::Utf8("x".to_string())],
            ],
        );
        assert_eq!(check_duplicates(&ds), 2);
    }

    #[test]
    fn no_rows_no_duplicates() {
        assert_eq!(check_duplicates(&DataSet::default()), 0);
    }
}
