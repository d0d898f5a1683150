//! Load-then-profile: raw source to canonical tables to quality profiles.

use serde::Serialize;

use crate::error::IngestionResult;
use crate::ingestion::{load, Decoded, IngestionOptions, IngestionRequest, SourceDescriptor};
use crate::metadata::{generate_metadata, DatasetMetadata};
use crate::types::DataSet;
use crate::validation::{generate_summary, ValidationProfile};

/// One produced table together with its profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableReport {
    /// Sheet name for spreadsheets; file/object name (or `query`) otherwise.
    pub name: String,
    #[serde(skip)]
    pub table: DataSet,
    pub profile: ValidationProfile,
}

impl TableReport {
    /// Metadata document for this table, published under `dashboard_name`.
    pub fn metadata(&self, dashboard_name: &str, sample_size: usize) -> DatasetMetadata {
        generate_metadata(dashboard_name, &self.table, self.profile.clone(), sample_size)
    }
}

/// Profile every table in `decoded`; a single table is reported under `name`.
pub fn profile_decoded(decoded: Decoded, name: &str) -> Vec<TableReport> {
    decoded
        .into_tables(name)
        .into_iter()
        .map(|t| {
            let profile = generate_summary(&t.table);
            TableReport {
                name: t.name,
                table: t.table,
                profile,
            }
        })
        .collect()
}

/// [`load`] `descriptor`, then profile each produced table.
pub fn profile_source(
    descriptor: &SourceDescriptor,
    options: &IngestionOptions,
) -> IngestionResult<Vec<TableReport>> {
    let decoded = load(descriptor, options)?;
    Ok(profile_decoded(decoded, &descriptor.display_name()))
}

/// Run `request`, then profile each produced table.
pub fn profile_request(request: &IngestionRequest) -> IngestionResult<Vec<TableReport>> {
    let decoded = request.run()?;
    Ok(profile_decoded(decoded, &request.display_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::NamedTable;

    #[test]
    fn sheets_keep_their_names_and_order() {
        let decoded = Decoded::Sheets(vec![
            NamedTable {
                name: "B".to_string(),
                table: DataSet::default(),
            },
            NamedTable {
                name: "A".to_string(),
                table: DataSet::default(),
            },
        ]);
        let names: Vec<String> = profile_decoded(decoded, "book.xlsx")
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["B", "A"]);
    }
}
