use tabular_intake::ingestion::json::decode_json_from_str;
use tabular_intake::ingestion::{ingest_from_path, IngestionOptions};
use tabular_intake::types::{DataType, Field, Schema, Value};

#[test]
fn json_array_of_records_infers_columns() {
    let ds = ingest_from_path("tests/fixtures/people.json", None, &IngestionOptions::default())
        .unwrap()
        .into_table()
        .unwrap();

    assert_eq!(ds.row_count(), 3);
    assert_eq!(
        ds.schema.field_names().collect::<Vec<_>>(),
        vec!["id", "name", "score", "active", "address"]
    );
    assert_eq!(ds.rows[2][1], Value::Null);
    assert_eq!(ds.rows[1][3], Value::Bool(false));
}

#[test]
fn json_nested_fields_via_dot_paths() {
    let schema = Schema::new(vec![
        Field::new("id", DataType::Int64),
        Field::new("address.city", DataType::Utf8),
    ]);
    let ds = ingest_from_path("tests/fixtures/people.json", Some(&schema), &IngestionOptions::default())
        .unwrap()
        .into_table()
        .unwrap();

    assert_eq!(ds.rows[1], vec![Value::Int64(2), Value::Utf8("New York".to_string())]);
}

#[test]
fn json_ndjson_and_column_oriented_inputs() {
    let ndjson = decode_json_from_str("{\"a\":1}\n{\"a\":2}\n", None).unwrap();
    assert_eq!(ndjson.row_count(), 2);

    let columns = decode_json_from_str(r#"{"a":[1,2,3],"b":["x","y","z"]}"#, None).unwrap();
    assert_eq!(columns.row_count(), 3);
    assert_eq!(columns.rows[2], vec![Value::Int64(3), Value::Utf8("z".to_string())]);
}

#[test]
fn json_scalar_document_is_rejected() {
    assert!(decode_json_from_str("42", None).is_err());
}
