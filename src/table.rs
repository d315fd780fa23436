use std::collections::{HashMap, HashSet};
use std::fmt;

use anyhow::{Result, anyhow};

use crate::schema::ColumnKind;

pub const METADATA_COLUMNS: [&str; 5] = ["season", "date", "home", "away", "team"];
pub const SOURCE_FILE_COLUMN: &str = "source_file";
pub const UNKNOWN: &str = "Unknown";
pub const HISTORICAL_SOURCE: &str = "historical data";

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    pub fn text(raw: impl Into<String>) -> Self {
        Value::Text(raw.into())
    }

    pub fn from_cell(raw: &str) -> Self {
        if raw.trim().is_empty() {
            Value::Null
        } else {
            Value::Text(raw.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Number(v) => f.write_str(&format_number(*v)),
            Value::Text(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

pub fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            values: Vec::new(),
        }
    }

    pub fn with_values(name: impl Into<String>, kind: ColumnKind, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    pub fn filled(name: impl Into<String>, kind: ColumnKind, value: Value, len: usize) -> Self {
        Self::with_values(name, kind, vec![value; len])
    }

    pub fn non_null(&self) -> impl Iterator<Item = &Value> {
        self.values.iter().filter(|v| !v.is_null())
    }
}

/// Column-major table. Every column holds exactly `row_count` values and
/// column names are unique.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map(|c| c.values.len()).unwrap_or(0);
        let mut seen = HashSet::new();
        for column in &columns {
            if column.values.len() != row_count {
                return Err(anyhow!(
                    "column {} has {} values, expected {}",
                    column.name,
                    column.values.len(),
                    row_count
                ));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(anyhow!("duplicate column name {}", column.name));
            }
        }
        Ok(Self { columns, row_count })
    }

    pub fn from_records(headers: Vec<String>, records: Vec<Vec<Value>>) -> Self {
        let row_count = records.len();
        let mut columns = headers
            .into_iter()
            .map(|name| Column {
                name,
                kind: ColumnKind::Text,
                values: Vec::with_capacity(row_count),
            })
            .collect::<Vec<_>>();
        for mut record in records {
            record.resize(columns.len(), Value::Null);
            for (column, value) in columns.iter_mut().zip(record) {
                column.values.push(value);
            }
        }
        Self { columns, row_count }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn cell(&self, row: usize, name: &str) -> Option<&Value> {
        self.column(name)?.values.get(row)
    }

    pub fn row(&self, row: usize) -> Vec<&Value> {
        self.columns
            .iter()
            .filter_map(|c| c.values.get(row))
            .collect()
    }

    // Replaces an existing column of the same name.
    pub fn insert_constant(&mut self, idx: usize, name: &str, value: Value) {
        self.remove_column(name);
        let idx = idx.min(self.columns.len());
        self.columns.insert(
            idx,
            Column::filled(name, ColumnKind::Text, value, self.row_count),
        );
    }

    pub fn push_constant(&mut self, name: &str, value: Value) {
        self.insert_constant(self.columns.len(), name, value);
    }

    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.position(name)?;
        Some(self.columns.remove(idx))
    }

    pub fn retain_columns(&mut self, keep: impl FnMut(&Column) -> bool) {
        self.columns.retain(keep);
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        if from == to || self.has_column(to) {
            return false;
        }
        match self.columns.iter_mut().find(|c| c.name == from) {
            Some(column) => {
                column.name = to.to_string();
                true
            }
            None => false,
        }
    }

    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Table, usize) -> bool,
    {
        let mask = (0..self.row_count)
            .map(|idx| keep(self, idx))
            .collect::<Vec<_>>();
        for column in &mut self.columns {
            let mut flags = mask.iter();
            column.values.retain(|_| *flags.next().unwrap_or(&false));
        }
        self.row_count = mask.iter().filter(|keep| **keep).count();
    }

    pub fn ensure_column(&mut self, name: &str) {
        if !self.has_column(name) {
            self.columns.push(Column::filled(
                name,
                ColumnKind::Text,
                Value::Null,
                self.row_count,
            ));
        }
    }

    pub fn conform_to(&mut self, names: &[String]) {
        let mut old = std::mem::take(&mut self.columns);
        for name in names {
            match old.iter().position(|c| &c.name == name) {
                Some(idx) => self.columns.push(old.swap_remove(idx)),
                None => self.columns.push(Column::filled(
                    name.as_str(),
                    ColumnKind::Text,
                    Value::Null,
                    self.row_count,
                )),
            }
        }
    }

    pub fn append(&mut self, other: Table) -> Result<()> {
        if self.column_names() != other.column_names() {
            return Err(anyhow!("cannot append tables with different columns"));
        }
        self.row_count += other.row_count;
        for (column, incoming) in self.columns.iter_mut().zip(other.columns) {
            column.values.extend(incoming.values);
        }
        Ok(())
    }
}

/// First occurrence keeps its name; the k-th repeat becomes `<name>.k`.
/// A generated name that collides with an earlier header keeps counting.
pub fn dedup_headers(raw: &[String]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut repeats: HashMap<&str, usize> = HashMap::new();
    let mut out = Vec::with_capacity(raw.len());
    for name in raw {
        if used.insert(name.clone()) {
            out.push(name.clone());
            continue;
        }
        let counter = repeats.entry(name.as_str()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{name}.{counter}");
            if used.insert(candidate.clone()) {
                out.push(candidate);
                break;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn dedup_suffixes_repeats_in_order() {
        let out = dedup_headers(&names(&["Kills", "Errors", "Kills", "Kills"]));
        assert_eq!(out, names(&["Kills", "Errors", "Kills.1", "Kills.2"]));
    }

    #[test]
    fn dedup_skips_taken_suffix() {
        let out = dedup_headers(&names(&["Kills", "Kills.1", "Kills"]));
        assert_eq!(out, names(&["Kills", "Kills.1", "Kills.2"]));
    }

    #[test]
    fn records_are_padded_and_truncated() {
        let table = Table::from_records(
            names(&["a", "b"]),
            vec![
                vec![Value::text("1")],
                vec![Value::text("2"), Value::text("3"), Value::text("4")],
            ],
        );
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(0, "b"), Some(&Value::Null));
        assert_eq!(table.cell(1, "b"), Some(&Value::text("3")));
    }

    #[test]
    fn retain_rows_keeps_columns_aligned() {
        let mut table = Table::from_records(
            names(&["a", "b"]),
            vec![
                vec![Value::text("x"), Value::text("1")],
                vec![Value::text("y"), Value::text("2")],
                vec![Value::text("z"), Value::text("3")],
            ],
        );
        table.retain_rows(|t, idx| t.cell(idx, "a") != Some(&Value::text("y")));
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(1, "b"), Some(&Value::text("3")));
    }

    #[test]
    fn insert_constant_replaces_existing_name() {
        let mut table = Table::from_records(
            names(&["team", "k"]),
            vec![vec![Value::text("old"), Value::text("1")]],
        );
        table.insert_constant(0, "team", Value::text("new"));
        assert_eq!(table.column_names(), vec!["team", "k"]);
        assert_eq!(table.cell(0, "team"), Some(&Value::text("new")));
    }

    #[test]
    fn format_number_drops_integral_fraction() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(0.25), "0.25");
    }
}
