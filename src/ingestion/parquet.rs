//! Parquet decoding.

use std::str::FromStr;

use bytes::Bytes;
use parquet::basic::{ConvertedType, Type as PhysicalType};
use parquet::file::reader::{ChunkReader, FileReader};
use parquet::file::serialized_reader::SerializedFileReader;
use parquet::record::{Field, Row};

use crate::error::{DecodeCause, DecodeResult};
use crate::types::{DataSet, DataType, Schema};

use super::infer::{build_dataset, CellKind, RawCell, RawTable, RowLabels};

/// Parquet decode engine. `Auto` resolves to the built-in record reader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParquetEngine {
    #[default]
    Auto,
    Native,
    Polars,
}

impl ParquetEngine {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Native => "native",
            Self::Polars => "polars",
        }
    }
}

impl FromStr for ParquetEngine {
    type Err = DecodeCause;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "native" => Ok(Self::Native),
            "polars" => Ok(Self::Polars),
            other => Err(DecodeCause::UnknownEngine {
                engine: other.to_string(),
            }),
        }
    }
}

/// Decode a Parquet payload into a [`DataSet`].
///
/// Columns of nested groups are flattened into their leaf paths (`a.b`); a null group yields
/// nulls for all of its leaves. Repeated (list or map) columns are rejected. Without a declared
/// schema the column types come from the parquet physical and converted types rather than value
/// inspection.
pub fn decode_parquet(
    bytes: Bytes,
    declared: Option<&Schema>,
    engine: ParquetEngine,
) -> DecodeResult<DataSet> {
    match engine {
        ParquetEngine::Auto | ParquetEngine::Native => decode_native(bytes, declared),
        ParquetEngine::Polars => decode_polars(bytes, declared),
    }
}

fn decode_native(bytes: Bytes, declared: Option<&Schema>) -> DecodeResult<DataSet> {
    let reader = SerializedFileReader::new(bytes)?;
    let leaves = leaf_columns(&reader)?;

    let mut rows: Vec<Vec<Field>> = Vec::new();
    for (idx0, row_res) in reader.get_row_iter(None)?.enumerate() {
        let row_num = idx0 + 1;
        let row = row_res?;

        let mut out_row = Vec::with_capacity(leaves.len());
        for leaf in &leaves {
            let v = lookup_leaf(&row, &leaf.parts).ok_or_else(|| DecodeCause::SchemaMismatch {
                message: format!("row {row_num} missing column '{}'", leaf.name),
            })?;
            out_row.push(v);
        }
        rows.push(out_row);
    }

    let (columns, native_types): (Vec<String>, Vec<DataType>) = leaves
        .into_iter()
        .map(|l| (l.name, l.data_type))
        .unzip();
    build_dataset(
        RawTable { columns, rows },
        declared,
        Some(native_types),
        &RowLabels::default(),
    )
}

struct LeafColumn {
    name: String,
    parts: Vec<String>,
    data_type: DataType,
}

fn leaf_columns<R: ChunkReader + 'static>(
    reader: &SerializedFileReader<R>,
) -> DecodeResult<Vec<LeafColumn>> {
    reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .map(|c| {
            let name = c.path().string();
            if c.max_rep_level() > 0 {
                return Err(DecodeCause::SchemaMismatch {
                    message: format!("repeated column '{name}' is not supported"),
                });
            }
            Ok(LeafColumn {
                parts: c.path().parts().to_vec(),
                data_type: column_data_type(c.physical_type(), c.converted_type()),
                name,
            })
        })
        .collect()
}

/// Walk nested groups down to the leaf at `parts`.
fn lookup_leaf(row: &Row, parts: &[String]) -> Option<Field> {
    let (first, rest) = parts.split_first()?;
    let field = row
        .get_column_iter()
        .find(|(name, _)| *name == first)
        .map(|(_, field)| field)?;
    match field {
        _ if rest.is_empty() => Some(field.clone()),
        Field::Group(inner) => lookup_leaf(inner, rest),
        Field::Null => Some(Field::Null),
        _ => None,
    }
}

fn column_data_type(physical: PhysicalType, converted: ConvertedType) -> DataType {
    match (physical, converted) {
        (_, ConvertedType::DECIMAL) => DataType::Float64,
        (_, ConvertedType::TIME_MILLIS | ConvertedType::TIME_MICROS) => DataType::Utf8,
        (PhysicalType::BOOLEAN, _) => DataType::Bool,
        (PhysicalType::INT32 | PhysicalType::INT64, _) => DataType::Int64,
        (PhysicalType::FLOAT | PhysicalType::DOUBLE, _) => DataType::Float64,
        _ => DataType::Utf8,
    }
}

impl RawCell for Field {
    fn kind(&self) -> CellKind {
        match self {
            Field::Null => CellKind::Null,
            Field::Bool(_) => CellKind::Bool,
            Field::Byte(_)
            | Field::Short(_)
            | Field::Int(_)
            | Field::Long(_)
            | Field::UByte(_)
            | Field::UShort(_)
            | Field::UInt(_)
            | Field::ULong(_) => CellKind::Int,
            Field::Float16(_) | Field::Float(_) | Field::Double(_) | Field::Decimal(_) => {
                CellKind::Float
            }
            _ => CellKind::Text,
        }
    }

    fn to_i64(&self) -> Result<i64, String> {
        match self {
            Field::Byte(v) => Ok(i64::from(*v)),
            Field::Short(v) => Ok(i64::from(*v)),
            Field::Int(v) => Ok(i64::from(*v)),
            Field::Long(v) => Ok(*v),
            Field::UByte(v) => Ok(i64::from(*v)),
            Field::UShort(v) => Ok(i64::from(*v)),
            Field::UInt(v) => Ok(i64::from(*v)),
            Field::ULong(v) => i64::try_from(*v).map_err(|_| "u64 out of range for i64".to_string()),
            Field::Date(v) => Ok(i64::from(*v)),
            Field::TimeMillis(v) => Ok(i64::from(*v)),
            Field::TimestampMillis(v) | Field::TimestampMicros(v) | Field::TimeMicros(v) => Ok(*v),
            Field::Str(s) => s.trim().parse::<i64>().map_err(|e| e.to_string()),
            _ => Err("expected integer".to_string()),
        }
    }

    fn to_f64(&self) -> Result<f64, String> {
        match self {
            Field::Float16(v) => Ok(v.to_f64()),
            Field::Float(v) => Ok(f64::from(*v)),
            Field::Double(v) => Ok(*v),
            Field::Decimal(_) => self
                .to_string()
                .parse::<f64>()
                .map_err(|e| format!("decimal out of range: {e}")),
            Field::Str(s) => s.trim().parse::<f64>().map_err(|e| e.to_string()),
            other => other.to_i64().map(|v| v as f64).map_err(|_| "expected number".to_string()),
        }
    }

    fn to_bool(&self) -> Result<bool, String> {
        match self {
            Field::Bool(b) => Ok(*b),
            Field::Str(s) => super::infer::parse_bool(s),
            other => other.to_i64().map(|v| v != 0).map_err(|_| "expected bool".to_string()),
        }
    }

    fn to_text(&self) -> String {
        match self {
            Field::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(feature = "polars_engine")]
fn decode_polars(bytes: Bytes, declared: Option<&Schema>) -> DecodeResult<DataSet> {
    use polars::prelude::{DataType as PlDataType, ParquetReader, SerReader};

    use super::infer::Scalar;

    let df = ParquetReader::new(std::io::Cursor::new(bytes.to_vec())).finish()?;

    let mut columns = Vec::with_capacity(df.width());
    let mut native_types = Vec::with_capacity(df.width());
    let mut cells: Vec<std::vec::IntoIter<Scalar>> = Vec::with_capacity(df.width());
    for col in df.get_columns() {
        let series = col.as_materialized_series();
        let dtype = series.dtype();
        let (data_type, values): (DataType, Vec<Scalar>) = if dtype.is_bool() {
            let ca = series.bool()?;
            (
                DataType::Bool,
                ca.into_iter().map(|v| v.map_or(Scalar::Null, Scalar::Bool)).collect(),
            )
        } else if dtype.is_integer() {
            let cast = series.cast(&PlDataType::Int64)?;
            (
                DataType::Int64,
                cast.i64()?.into_iter().map(|v| v.map_or(Scalar::Null, Scalar::Int)).collect(),
            )
        } else if dtype.is_float() {
            let cast = series.cast(&PlDataType::Float64)?;
            (
                DataType::Float64,
                cast.f64()?.into_iter().map(|v| v.map_or(Scalar::Null, Scalar::Float)).collect(),
            )
        } else {
            let cast = series.cast(&PlDataType::String)?;
            (
                DataType::Utf8,
                cast.str()?
                    .into_iter()
                    .map(|v| v.map_or(Scalar::Null, |s| Scalar::Text(s.to_string())))
                    .collect(),
            )
        };
        columns.push(col.name().to_string());
        native_types.push(data_type);
        cells.push(values.into_iter());
    }

    let rows = (0..df.height())
        .map(|_| {
            cells
                .iter_mut()
                .map(|c| c.next().unwrap_or(Scalar::Null))
                .collect()
        })
        .collect();

    build_dataset(
        RawTable { columns, rows },
        declared,
        Some(native_types),
        &RowLabels::default(),
    )
}

#[cfg(not(feature = "polars_engine"))]
fn decode_polars(_bytes: Bytes, _declared: Option<&Schema>) -> DecodeResult<DataSet> {
    Err(DecodeCause::NotEnabled(
        "parquet engine 'polars' requires the 'polars_engine' feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_names_are_an_allow_list() {
        assert_eq!("auto".parse::<ParquetEngine>().unwrap(), ParquetEngine::Auto);
        assert_eq!(" Native ".parse::<ParquetEngine>().unwrap(), ParquetEngine::Native);
        let err = "fastparquet".parse::<ParquetEngine>().unwrap_err();
        assert!(matches!(err, DecodeCause::UnknownEngine { ref engine } if engine == "fastparquet"));
    }

    #[test]
    fn garbage_bytes_are_a_parquet_error() {
        let err = decode_parquet(Bytes::from_static(b"not parquet"), None, ParquetEngine::Auto)
            .unwrap_err();
        assert!(matches!(err, DecodeCause::Parquet(_)));
    }

    #[test]
    fn field_cells_classify_like_their_physical_types() {
        assert_eq!(Field::Int(3).kind(), CellKind::Int);
        assert_eq!(Field::Double(1.5).kind(), CellKind::Float);
        assert_eq!(Field::Str("x".to_string()).kind(), CellKind::Text);
        assert_eq!(Field::ULong(u64::MAX).to_i64().unwrap_err(), "u64 out of range for i64");
    }

    #[test]
    fn converted_types_refine_physical_types() {
        assert_eq!(
            column_data_type(PhysicalType::INT32, ConvertedType::DECIMAL),
            DataType::Float64
        );
        assert_eq!(
            column_data_type(PhysicalType::FIXED_LEN_BYTE_ARRAY, ConvertedType::DECIMAL),
            DataType::Float64
        );
        assert_eq!(
            column_data_type(PhysicalType::INT32, ConvertedType::TIME_MILLIS),
            DataType::Utf8
        );
        assert_eq!(
            column_data_type(PhysicalType::INT32, ConvertedType::DATE),
            DataType::Int64
        );
        assert_eq!(Field::TimeMillis(1_000).to_i64().unwrap(), 1_000);
    }
}
