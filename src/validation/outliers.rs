use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::DataSet;

/// IQR outlier statistics of one numeric column.
///
/// Bounds are `Q1 - 1.5 * IQR` and `Q3 + 1.5 * IQR`; both are `None` when the column has no
/// non-missing values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutlierStat {
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
    /// Values strictly outside the bounds.
    pub outlier_count: usize,
}

const IQR_FACTOR: f64 = 1.5;

/// IQR outlier detection over every `int64`/`float64` column.
pub fn check_outliers(table: &DataSet) -> BTreeMap<String, OutlierStat> {
    table
        .schema
        .fields
        .iter()
        .enumerate()
        .filter(|(_, field)| field.data_type.is_numeric())
        .map(|(idx, field)| {
            let mut values: Vec<f64> = table
                .column_values(idx)
                .filter_map(|v| v.as_f64())
                .filter(|v| !v.is_nan())
                .collect();
            values.sort_by(f64::total_cmp);
            (field.name.clone(), outlier_stat(&values))
        })
        .collect()
}

fn outlier_stat(sorted: &[f64]) -> OutlierStat {
    let (Some(q1), Some(q3)) = (quantile(sorted, 0.25), quantile(sorted, 0.75)) else {
        return OutlierStat {
            lower_bound: None,
            upper_bound: None,
            outlier_count: 0,
        };
    };

    let iqr = q3 - q1;
    let lower = q1 - IQR_FACTOR * iqr;
    let upper = q3 + IQR_FACTOR * iqr;
    OutlierStat {
        lower_bound: Some(lower),
        upper_bound: Some(upper),
        outlier_count: sorted.iter().filter(|&&v| v < lower || v > upper).count(),
    }
}

/// Quantile `q` (0..=1) of ascending `sorted`, interpolating linearly between the two
/// nearest ranks. `None` for an empty slice.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let pos = q.clamp(0.0, 1.0) * last as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let (a, b) = (sorted[lo], sorted[hi]);
    Some(a + (b - a) * (pos - lo as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, Value};
    use crate::validation::test_support::column;

    #[test]
    fn iqr_bounds_flag_the_far_value() {
        let values = [1, 2, 2, 3, 4, 5, 100].into_iter().map(Value::Int64).collect();
        let stat = check_outliers(&column("x", DataType::Int64, values))["x"];
        assert_eq!(stat.lower_bound, Some(-1.75));
        assert_eq!(stat.upper_bound, Some(8.25));
        assert_eq!(stat.outlier_count, 1);
    }

    #[test]
    fn linear_interpolation_quantiles() {
        let sorted = [1.0, 2.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        assert_eq!(quantile(&sorted, 0.25), Some(2.0));
        assert_eq!(quantile(&sorted, 0.75), Some(4.5));
        assert_eq!(quantile(&[7.0], 0.5), Some(7.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn all_missing_column_has_no_bounds() {
        let stat = check_outliers(&column("x", DataType::Float64, vec![Value::Null, Value::Null]))["x"];
        assert_eq!(stat, OutlierStat { lower_bound: None, upper_bound: None, outlier_count: 0 });
    }

    #[test]
    fn non_numeric_columns_are_skipped() {
        let ds = column("flag", DataType::Bool, vec![Value::Bool(true)]);
        assert!(check_outliers(&ds).is_empty());
    }
}
