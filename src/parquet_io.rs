use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use parquet::basic::{Compression, ConvertedType, Repetition, Type as PhysicalType};
use parquet::data_type::{BoolType, ByteArray, ByteArrayType, DoubleType};
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::writer::{SerializedColumnWriter, SerializedFileWriter};
use parquet::record::Field;
use parquet::schema::types::Type;

use crate::schema::ColumnKind;
use crate::table::{Column, Table, Value};

fn parquet_schema(table: &Table) -> Result<Type> {
    let mut fields = Vec::with_capacity(table.column_count());
    for column in table.columns() {
        let builder = match column.kind {
            ColumnKind::Numeric => Type::primitive_type_builder(&column.name, PhysicalType::DOUBLE),
            ColumnKind::Boolean => {
                Type::primitive_type_builder(&column.name, PhysicalType::BOOLEAN)
            }
            ColumnKind::Text => Type::primitive_type_builder(&column.name, PhysicalType::BYTE_ARRAY)
                .with_converted_type(ConvertedType::UTF8),
        };
        let field = builder
            .with_repetition(Repetition::OPTIONAL)
            .build()
            .with_context(|| format!("parquet field for column {}", column.name))?;
        fields.push(Arc::new(field));
    }
    Type::group_type_builder("dataset")
        .with_fields(fields)
        .build()
        .context("build parquet schema")
}

// Single row group; every column is OPTIONAL.
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    if table.column_count() == 0 {
        return Err(anyhow!("refusing to write a table without columns"));
    }
    let schema = Arc::new(parquet_schema(table)?);
    let props = Arc::new(
        WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build(),
    );
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer =
        SerializedFileWriter::new(file, schema, props).context("open parquet writer")?;
    let mut row_group = writer.next_row_group().context("start row group")?;
    let mut columns = table.columns().iter();
    while let Some(mut col_writer) = row_group.next_column().context("next parquet column")? {
        let column = columns
            .next()
            .ok_or_else(|| anyhow!("parquet schema has more columns than the table"))?;
        write_column(&mut col_writer, column)?;
        col_writer
            .close()
            .with_context(|| format!("close column {}", column.name))?;
    }
    row_group.close().context("close row group")?;
    writer.close().context("finish parquet file")?;
    Ok(())
}

fn write_column(writer: &mut SerializedColumnWriter<'_>, column: &Column) -> Result<()> {
    let mut def_levels = Vec::with_capacity(column.values.len());
    let written = match column.kind {
        ColumnKind::Numeric => {
            let mut values = Vec::with_capacity(column.values.len());
            for value in &column.values {
                let present = value.as_number();
                def_levels.push(i16::from(present.is_some()));
                values.extend(present);
            }
            writer
                .typed::<DoubleType>()
                .write_batch(&values, Some(&def_levels), None)
        }
        ColumnKind::Boolean => {
            let mut values = Vec::with_capacity(column.values.len());
            for value in &column.values {
                let present = value.as_bool();
                def_levels.push(i16::from(present.is_some()));
                values.extend(present);
            }
            writer
                .typed::<BoolType>()
                .write_batch(&values, Some(&def_levels), None)
        }
        ColumnKind::Text => {
            let mut values = Vec::with_capacity(column.values.len());
            for value in &column.values {
                let present = value.as_str();
                def_levels.push(i16::from(present.is_some()));
                values.extend(present.map(ByteArray::from));
            }
            writer
                .typed::<ByteArrayType>()
                .write_batch(&values, Some(&def_levels), None)
        }
    };
    written.with_context(|| format!("write column {}", column.name))?;
    Ok(())
}

pub fn read_table(path: &Path) -> Result<Table> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = SerializedFileReader::new(file).context("open parquet reader")?;
    let metadata = reader.metadata().file_metadata();
    let expected_rows = usize::try_from(metadata.num_rows()).unwrap_or_default();

    let mut columns = metadata
        .schema_descr()
        .columns()
        .iter()
        .map(|desc| {
            let kind = match desc.physical_type() {
                PhysicalType::DOUBLE | PhysicalType::FLOAT => ColumnKind::Numeric,
                PhysicalType::INT32 | PhysicalType::INT64 => ColumnKind::Numeric,
                PhysicalType::BOOLEAN => ColumnKind::Boolean,
                _ => ColumnKind::Text,
            };
            let mut column = Column::new(desc.name(), kind);
            column.values.reserve(expected_rows);
            column
        })
        .collect::<Vec<_>>();

    for row in reader.get_row_iter(None).context("iterate cached rows")? {
        let row = row.context("decode cached row")?;
        for (idx, (_, field)) in row.get_column_iter().enumerate() {
            let column = columns
                .get_mut(idx)
                .ok_or_else(|| anyhow!("cached row wider than schema"))?;
            column.values.push(field_value(field));
        }
    }

    let table = Table::from_columns(columns)?;
    if table.column_count() > 0 && table.row_count() != expected_rows {
        return Err(anyhow!(
            "cached table has {} rows, footer says {}",
            table.row_count(),
            expected_rows
        ));
    }
    Ok(table)
}

fn field_value(field: &Field) -> Value {
    match field {
        Field::Null => Value::Null,
        Field::Bool(b) => Value::Bool(*b),
        Field::Double(v) => Value::Number(*v),
        Field::Float(v) => Value::Number(f64::from(*v)),
        Field::Int(v) => Value::Number(f64::from(*v)),
        Field::Long(v) => Value::Number(*v as f64),
        Field::Str(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}
