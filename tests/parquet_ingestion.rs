use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parquet::column::writer::ColumnWriter;
use parquet::data_type::ByteArray;
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;

use tabular_intake::ingestion::{
    ingest_from_path, load, IngestionOptions, ParquetEngine, SourceConfig, SourceDescriptor,
};
use tabular_intake::types::{DataType, Field, Schema, Value};
use tabular_intake::IngestionError;

fn tmp_file(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("tabular-intake-{name}-{nanos}.parquet"))
}

fn people_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Int64),
        Field::new("name", DataType::Utf8),
        Field::new("score", DataType::Float64),
        Field::new("active", DataType::Bool),
    ])
}

/// Three rows; `score` is optional and missing in the second row.
fn write_people_parquet(path: &PathBuf, id_as_binary: bool) {
    let schema_str = if id_as_binary {
        r#"
        message schema {
          REQUIRED BINARY id (UTF8);
          REQUIRED BINARY name (UTF8);
          OPTIONAL DOUBLE score;
          REQUIRED BOOLEAN active;
        }
        "#
    } else {
        r#"
        message schema {
          REQUIRED INT64 id;
          REQUIRED BINARY name (UTF8);
          OPTIONAL DOUBLE score;
          REQUIRED BOOLEAN active;
        }
        "#
    };

    let schema = Arc::new(parse_message_type(schema_str).unwrap());
    let props = Arc::new(WriterProperties::builder().build());
    let file = File::create(path).unwrap();
    let mut writer = SerializedFileWriter::new(file, schema, props).unwrap();

    let mut rg = writer.next_row_group().unwrap();
    let mut col_idx: usize = 0;
    while let Some(mut col) = rg.next_column().unwrap() {
        match col.untyped() {
            ColumnWriter::Int64ColumnWriter(w) => {
                w.write_batch(&[1_i64, 2, 3], None, None).unwrap();
            }
            ColumnWriter::ByteArrayColumnWriter(w) => {
                let values: Vec<ByteArray> = if id_as_binary && col_idx == 0 {
                    vec!["1".into(), "two".into(), "3".into()]
                } else {
                    vec!["Ada".into(), "Grace".into(), "Linus".into()]
                };
                w.write_batch(&values, None, None).unwrap();
            }
            ColumnWriter::DoubleColumnWriter(w) => {
                w.write_batch(&[98.5_f64, 87.25], Some(&[1, 0, 1]), None).unwrap();
            }
            ColumnWriter::BoolColumnWriter(w) => {
                w.write_batch(&[true, false, true], None, None).unwrap();
            }
            _ => panic!("unexpected column writer in test"),
        }
        col.close().unwrap();
        col_idx += 1;
    }
    rg.close().unwrap();
    writer.close().unwrap();
}

#[test]
fn parquet_types_come_from_the_file_schema() {
    let path = tmp_file("people");
    write_people_parquet(&path, false);

    let ds = ingest_from_path(&path, None, &IngestionOptions::default())
        .unwrap()
        .into_table()
        .unwrap();
    assert_eq!(ds.schema, people_schema());
    assert_eq!(ds.row_count(), 3);
    assert_eq!(ds.rows[0][1], Value::Utf8("Ada".to_string()));
    assert_eq!(ds.rows[1][2], Value::Null);
    assert_eq!(ds.rows[2][2], Value::Float64(87.25));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn parquet_declared_schema_missing_column() {
    let path = tmp_file("missing");
    write_people_parquet(&path, false);

    let mut schema = people_schema();
    schema.fields.push(Field::new("email", DataType::Utf8));
    let err = ingest_from_path(&path, Some(&schema), &IngestionOptions::default()).unwrap_err();
    assert!(matches!(err, IngestionError::Decode { .. }));
    assert!(err.to_string().contains("missing required column 'email'"));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn parquet_declared_type_mismatch_names_the_column() {
    let path = tmp_file("type-mismatch");
    write_people_parquet(&path, true);

    let err = ingest_from_path(&path, Some(&people_schema()), &IngestionOptions::default()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("failed to parse value"), "{msg}");
    assert!(msg.contains("column 'id'"), "{msg}");
    assert!(msg.contains("two"), "{msg}");

    let _ = std::fs::remove_file(&path);
}

#[test]
fn parquet_engine_is_validated_before_any_io() {
    let cfg = SourceConfig::from_params([
        ("data_path", "/nowhere/at/all.parquet"),
        ("engine", "duckdb"),
    ])
    .unwrap();
    let err = SourceDescriptor::from_config(cfg).unwrap_err();
    assert!(err.to_string().contains("duckdb"), "{err}");
}

#[test]
fn parquet_explicit_native_engine() {
    let path = tmp_file("native");
    write_people_parquet(&path, false);

    let location = path.to_string_lossy().into_owned();
    let cfg = SourceConfig::from_params([
        ("data_path", location.as_str()),
        ("engine", "native"),
    ])
    .unwrap();
    let source = SourceDescriptor::from_config(cfg).unwrap();
    assert_eq!(source.engine(), ParquetEngine::Native);
    let decoded = load(&source, &IngestionOptions::default()).unwrap();
    assert_eq!(decoded.row_count(), 3);

    let _ = std::fs::remove_file(&path);
}

#[cfg(not(feature = "polars_engine"))]
#[test]
fn parquet_polars_engine_without_feature_is_a_decode_error() {
    let path = tmp_file("polars-off");
    write_people_parquet(&path, false);

    let location = path.to_string_lossy().into_owned();
    let cfg = SourceConfig::from_params([
        ("data_path", location.as_str()),
        ("engine", "polars"),
    ])
    .unwrap();
    let source = SourceDescriptor::from_config(cfg).unwrap();
    let err = load(&source, &IngestionOptions::default()).unwrap_err();
    assert!(matches!(err, IngestionError::Decode { .. }));

    let _ = std::fs::remove_file(&path);
}

fn write_parquet(path: &PathBuf, schema_str: &str, mut write_column: impl FnMut(usize, &mut ColumnWriter<'_>)) {
    let schema = Arc::new(parse_message_type(schema_str).unwrap());
    let props = Arc::new(WriterProperties::builder().build());
    let file = File::create(path).unwrap();
    let mut writer = SerializedFileWriter::new(file, schema, props).unwrap();

    let mut rg = writer.next_row_group().unwrap();
    let mut col_idx: usize = 0;
    while let Some(mut col) = rg.next_column().unwrap() {
        write_column(col_idx, col.untyped());
        col.close().unwrap();
        col_idx += 1;
    }
    rg.close().unwrap();
    writer.close().unwrap();
}

#[test]
fn parquet_decimal_time_and_nested_columns() {
    let path = tmp_file("logical");
    write_parquet(
        &path,
        r#"
        message schema {
          REQUIRED INT32 t (TIME_MILLIS);
          OPTIONAL INT32 d (DECIMAL(9,2));
          OPTIONAL group address {
            OPTIONAL BINARY city (UTF8);
          }
        }
        "#,
        |idx, col| match (idx, col) {
            (0, ColumnWriter::Int32ColumnWriter(w)) => {
                w.write_batch(&[1_000, 61_000], None, None).unwrap();
            }
            (1, ColumnWriter::Int32ColumnWriter(w)) => {
                w.write_batch(&[1_000, 250], Some(&[1, 1]), None).unwrap();
            }
            (2, ColumnWriter::ByteArrayColumnWriter(w)) => {
                let values: Vec<ByteArray> = vec!["Paris".into()];
                w.write_batch(&values, Some(&[2, 0]), None).unwrap();
            }
            _ => panic!("unexpected column writer in test"),
        },
    );

    let ds = ingest_from_path(&path, None, &IngestionOptions::default())
        .unwrap()
        .into_table()
        .unwrap();
    assert_eq!(
        ds.schema,
        Schema::new(vec![
            Field::new("t", DataType::Utf8),
            Field::new("d", DataType::Float64),
            Field::new("address.city", DataType::Utf8),
        ])
    );
    assert_eq!(ds.rows[0][0], Value::Utf8("00:00:01.000".to_string()));
    assert_eq!(ds.rows[0][1], Value::Float64(10.0));
    assert_eq!(ds.rows[1][1], Value::Float64(2.5));
    assert_eq!(ds.rows[0][2], Value::Utf8("Paris".to_string()));
    assert_eq!(ds.rows[1][2], Value::Null);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn parquet_repeated_columns_are_rejected() {
    let path = tmp_file("repeated");
    write_parquet(
        &path,
        r#"
        message schema {
          REQUIRED INT64 id;
          REPEATED INT64 tags;
        }
        "#,
        |idx, col| match (idx, col) {
            (0, ColumnWriter::Int64ColumnWriter(w)) => {
                w.write_batch(&[1_i64], None, None).unwrap();
            }
            (1, ColumnWriter::Int64ColumnWriter(w)) => {
                w.write_batch(&[7_i64, 8], Some(&[1, 1]), Some(&[0, 1])).unwrap();
            }
            _ => panic!("unexpected column writer in test"),
        },
    );

    let err = ingest_from_path(&path, None, &IngestionOptions::default()).unwrap_err();
    assert!(matches!(err, IngestionError::Decode { .. }));
    assert!(err.to_string().contains("repeated column 'tags'"), "{err}");

    let _ = std::fs::remove_file(&path);
}
