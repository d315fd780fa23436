use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::table::{Column, Table, Value, format_number};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Text,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.kind)
    }
}

pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Some(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Kind of a column judged on its non-null cells. A column with no values
/// at all is numeric.
pub fn infer_kind(values: &[Value]) -> ColumnKind {
    let mut all_bool = true;
    let mut all_numeric = true;
    let mut any = false;
    for value in values {
        match value {
            Value::Null => continue,
            Value::Bool(_) => all_numeric = false,
            Value::Number(_) => all_bool = false,
            Value::Text(raw) => {
                all_bool &= parse_bool(raw).is_some();
                all_numeric &= parse_number(raw).is_some();
            }
        }
        any = true;
        if !all_bool && !all_numeric {
            return ColumnKind::Text;
        }
    }
    if any && all_bool {
        ColumnKind::Boolean
    } else if all_numeric {
        ColumnKind::Numeric
    } else {
        ColumnKind::Text
    }
}

pub fn infer_schema(table: &Table) -> Schema {
    Schema {
        fields: table
            .columns()
            .iter()
            .map(|column| Field {
                name: column.name.clone(),
                kind: infer_kind(&column.values),
            })
            .collect(),
    }
}

pub fn apply_schema(table: Table, schema: &Schema) -> Result<Table> {
    let mut columns = Vec::with_capacity(table.column_count());
    for column in table.into_columns() {
        let kind = schema
            .kind_of(&column.name)
            .ok_or_else(|| anyhow!("column {} missing from schema", column.name))?;
        columns.push(coerce_column(column, kind)?);
    }
    Table::from_columns(columns)
}

pub fn coerce(table: Table) -> Result<Table> {
    let schema = infer_schema(&table);
    apply_schema(table, &schema)
}

fn coerce_column(column: Column, kind: ColumnKind) -> Result<Column> {
    let name = column.name;
    let mut values = Vec::with_capacity(column.values.len());
    for value in column.values {
        let converted = match (kind, value) {
            (_, Value::Null) => Value::Null,
            (ColumnKind::Numeric, Value::Number(v)) => Value::Number(v),
            (ColumnKind::Numeric, Value::Text(raw)) => match parse_number(&raw) {
                Some(v) => Value::Number(v),
                None => return Err(anyhow!("column {name}: {raw:?} is not numeric")),
            },
            (ColumnKind::Boolean, Value::Bool(b)) => Value::Bool(b),
            (ColumnKind::Boolean, Value::Text(raw)) => match parse_bool(&raw) {
                Some(b) => Value::Bool(b),
                None => return Err(anyhow!("column {name}: {raw:?} is not boolean")),
            },
            (ColumnKind::Text, Value::Text(raw)) => Value::Text(raw),
            (ColumnKind::Text, Value::Number(v)) => Value::Text(format_number(v)),
            (ColumnKind::Text, Value::Bool(b)) => Value::Text(b.to_string()),
            (kind, other) => {
                return Err(anyhow!("column {name}: {other:?} does not fit {kind:?}"));
            }
        };
        values.push(converted);
    }
    Ok(Column::with_values(name, kind, values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(raw: &[&str]) -> Vec<Value> {
        raw.iter().map(|s| Value::from_cell(s)).collect()
    }

    #[test]
    fn mixed_column_is_text() {
        assert_eq!(infer_kind(&texts(&["5", "7", "abc"])), ColumnKind::Text);
    }

    #[test]
    fn numeric_ignores_blanks() {
        assert_eq!(infer_kind(&texts(&["5", "", " 7.5 "])), ColumnKind::Numeric);
    }

    #[test]
    fn all_null_is_numeric() {
        assert_eq!(infer_kind(&texts(&["", ""])), ColumnKind::Numeric);
    }

    #[test]
    fn true_false_is_boolean() {
        assert_eq!(infer_kind(&texts(&["True", "false"])), ColumnKind::Boolean);
    }

    #[test]
    fn coerce_keeps_nulls() {
        let table = Table::from_records(
            vec!["k".to_string()],
            vec![texts(&["3"]), texts(&[""]), texts(&["4"])],
        );
        let out = coerce(table).unwrap();
        let column = out.column("k").unwrap();
        assert_eq!(column.kind, ColumnKind::Numeric);
        assert_eq!(
            column.values,
            vec![Value::Number(3.0), Value::Null, Value::Number(4.0)]
        );
    }
}
