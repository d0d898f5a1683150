//! CSV decoding.

use std::io::Read;

use crate::error::DecodeResult;
use crate::types::{DataSet, Schema};

use super::infer::{build_dataset, RawTable, RowLabels};

/// Decode a CSV payload into a [`DataSet`].
///
/// Rules:
///
/// - The first record is the header row.
/// - Without a declared schema every header becomes a column with an inferred type.
/// - With a declared schema, headers must contain all schema fields (order can differ).
pub fn decode_csv(bytes: &[u8], declared: Option<&Schema>) -> DecodeResult<DataSet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);
    decode_csv_from_reader(&mut rdr, declared)
}

/// Decode CSV data from an existing CSV reader.
pub fn decode_csv_from_reader<R: Read>(
    rdr: &mut csv::Reader<R>,
    declared: Option<&Schema>,
) -> DecodeResult<DataSet> {
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    // Report 1-based row numbers for users; +1 again because header is row 1.
    let labels = RowLabels {
        first_row: 2,
        column_prefix: None,
    };
    build_dataset(RawTable { columns: headers, rows }, declared, None, &labels)
}
