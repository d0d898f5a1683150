//! JSON decoding.
//!
//! Supported inputs:
//! - A JSON array of objects: `[{"a":1}, {"a":2}]`
//! - A single object, read as one record: `{"a":1}`
//! - A column-oriented object: `{"a":[1,2]}` or `{"a":{"0":1,"1":2}}`
//! - Newline-delimited JSON (NDJSON): `{"a":1}\n{"a":2}\n`
//!
//! Nested fields are reachable using dot paths in declared schema field names (e.g. `user.name`).
//! Without a declared schema the columns are the top-level keys, in first-seen order.

use serde_json::Map;

use crate::error::{DecodeCause, DecodeResult};
use crate::types::{DataSet, Schema};

use super::infer::{build_dataset, CellKind, RawCell, RawTable, RowLabels};

type JsonObject = Map<String, serde_json::Value>;

/// Decode a JSON payload into a [`DataSet`].
pub fn decode_json(bytes: &[u8], declared: Option<&Schema>) -> DecodeResult<DataSet> {
    let input = std::str::from_utf8(bytes)?;
    decode_json_from_str(input, declared)
}

/// Decode JSON from an in-memory string into a [`DataSet`].
pub fn decode_json_from_str(input: &str, declared: Option<&Schema>) -> DecodeResult<DataSet> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DecodeCause::SchemaMismatch {
            message: "json input is empty".to_string(),
        });
    }

    // First try parsing as a single JSON value (array or object).
    let records = match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Array(items)) => items,
        Ok(serde_json::Value::Object(obj)) => match columns_to_records(&obj)? {
            Some(records) => records,
            None => vec![serde_json::Value::Object(obj)],
        },
        Ok(_) => {
            return Err(DecodeCause::SchemaMismatch {
                message: "json must be an object, an array of objects, or NDJSON".to_string(),
            });
        }
        Err(first_err) => parse_ndjson(trimmed, first_err)?,
    };

    let objects = records
        .iter()
        .enumerate()
        .map(|(idx0, v)| {
            v.as_object().ok_or_else(|| DecodeCause::SchemaMismatch {
                message: format!("row {} is not a json object", idx0 + 1),
            })
        })
        .collect::<DecodeResult<Vec<&JsonObject>>>()?;

    let raw = match declared {
        Some(schema) => declared_projection(&objects, schema)?,
        None => top_level_projection(&objects),
    };
    build_dataset(raw, declared, None, &RowLabels::default())
}

/// NDJSON fallback. A document whose first line is not a JSON value on its own is malformed
/// JSON, and the original error is returned.
fn parse_ndjson(
    input: &str,
    first_err: serde_json::Error,
) -> DecodeResult<Vec<serde_json::Value>> {
    let mut lines = input.lines().map(str::trim).filter(|l| !l.is_empty());
    let first = match lines.next().map(serde_json::from_str::<serde_json::Value>) {
        Some(Ok(v)) => v,
        _ => return Err(DecodeCause::Json(first_err)),
    };

    let mut values = vec![first];
    for line in lines {
        values.push(serde_json::from_str::<serde_json::Value>(line)?);
    }
    Ok(values)
}

/// Turn a column-oriented object into records. Returns `None` when the object is a plain record.
fn columns_to_records(obj: &JsonObject) -> DecodeResult<Option<Vec<serde_json::Value>>> {
    if obj.is_empty() {
        return Ok(None);
    }

    if obj.values().all(serde_json::Value::is_array) {
        let mut len: Option<usize> = None;
        for (name, col) in obj {
            let n = col.as_array().map_or(0, Vec::len);
            match len {
                Some(expected) if expected != n => {
                    return Err(DecodeCause::SchemaMismatch {
                        message: format!(
                            "column '{name}' has {n} values, expected {expected}"
                        ),
                    });
                }
                _ => len = Some(n),
            }
        }

        let len = len.unwrap_or(0);
        let records = (0..len)
            .map(|i| {
                let mut rec = JsonObject::new();
                for (name, col) in obj {
                    let v = col
                        .as_array()
                        .and_then(|a| a.get(i))
                        .cloned()
                        .unwrap_or(serde_json::Value::Null);
                    rec.insert(name.clone(), v);
                }
                serde_json::Value::Object(rec)
            })
            .collect();
        return Ok(Some(records));
    }

    if obj.values().all(serde_json::Value::is_object) {
        // Index keys in first-seen order across all columns.
        let mut index: Vec<&String> = Vec::new();
        for col in obj.values() {
            if let Some(map) = col.as_object() {
                for key in map.keys() {
                    if !index.contains(&key) {
                        index.push(key);
                    }
                }
            }
        }

        let records = index
            .iter()
            .map(|key| {
                let mut rec = JsonObject::new();
                for (name, col) in obj {
                    let v = col
                        .get(key.as_str())
                        .cloned()
                        .unwrap_or(serde_json::Value::Null);
                    rec.insert(name.clone(), v);
                }
                serde_json::Value::Object(rec)
            })
            .collect();
        return Ok(Some(records));
    }

    Ok(None)
}

fn top_level_projection(objects: &[&JsonObject]) -> RawTable<serde_json::Value> {
    let mut columns: Vec<String> = Vec::new();
    for obj in objects {
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let rows = objects
        .iter()
        .map(|obj| {
            columns
                .iter()
                .map(|c| obj.get(c).cloned().unwrap_or(serde_json::Value::Null))
                .collect()
        })
        .collect();

    RawTable { columns, rows }
}

fn declared_projection(
    objects: &[&JsonObject],
    schema: &Schema,
) -> DecodeResult<RawTable<serde_json::Value>> {
    let mut rows = Vec::with_capacity(objects.len());
    for (idx0, obj) in objects.iter().enumerate() {
        let row_num = idx0 + 1;
        let mut row = Vec::with_capacity(schema.fields.len());
        for field in &schema.fields {
            let jv = get_by_dot_path(obj, &field.name).ok_or_else(|| {
                DecodeCause::SchemaMismatch {
                    message: format!("row {row_num} missing required field '{}'", field.name),
                }
            })?;
            row.push(jv.clone());
        }
        rows.push(row);
    }

    Ok(RawTable {
        columns: schema.field_names().map(str::to_string).collect(),
        rows,
    })
}

fn get_by_dot_path<'a>(root: &'a JsonObject, path: &str) -> Option<&'a serde_json::Value> {
    // An exact top-level key wins over a nested interpretation.
    if let Some(v) = root.get(path) {
        return Some(v);
    }

    let mut segments = path.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        match current {
            serde_json::Value::Object(map) => current = map.get(segment)?,
            _ => return None,
        }
    }
    Some(current)
}

impl RawCell for serde_json::Value {
    fn kind(&self) -> CellKind {
        match self {
            Self::Null => CellKind::Null,
            Self::Bool(_) => CellKind::Bool,
            Self::Number(n) if n.is_i64() => CellKind::Int,
            Self::Number(_) => CellKind::Float,
            Self::String(_) | Self::Array(_) | Self::Object(_) => CellKind::Text,
        }
    }

    fn to_i64(&self) -> Result<i64, String> {
        if let Some(n) = self.as_i64() {
            Ok(n)
        } else if self.as_u64().is_some() {
            Err("u64 out of range for i64".to_string())
        } else {
            Err("expected integer number".to_string())
        }
    }

    fn to_f64(&self) -> Result<f64, String> {
        self.as_f64().ok_or_else(|| "expected number".to_string())
    }

    fn to_bool(&self) -> Result<bool, String> {
        self.as_bool().ok_or_else(|| "expected bool".to_string())
    }

    fn to_text(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
