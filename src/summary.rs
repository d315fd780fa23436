use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::table::{HISTORICAL_SOURCE, SOURCE_FILE_COLUMN, Table, UNKNOWN, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub total_records: usize,
    pub historical_records: usize,
    pub recent_records: usize,
    pub columns: usize,
    pub seasons: Vec<String>,
    pub latest_date: Option<NaiveDate>,
}

pub fn summarize(table: &Table) -> DatasetSummary {
    let historical_records = table
        .column(SOURCE_FILE_COLUMN)
        .map(|c| {
            c.values
                .iter()
                .filter(|v| v.as_str() == Some(HISTORICAL_SOURCE))
                .count()
        })
        .unwrap_or(0);
    DatasetSummary {
        total_records: table.row_count(),
        historical_records,
        recent_records: table.row_count() - historical_records,
        columns: table.column_count(),
        seasons: distinct_values(table, "season"),
        latest_date: latest_date(table),
    }
}

pub fn distinct_values(table: &Table, column: &str) -> Vec<String> {
    let Some(column) = table.column(column) else {
        return Vec::new();
    };
    column
        .non_null()
        .map(Value::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn latest_date(table: &Table) -> Option<NaiveDate> {
    table
        .column("date")?
        .non_null()
        .filter_map(|v| NaiveDate::parse_from_str(&v.to_string(), "%Y-%m-%d").ok())
        .max()
}

/// Row filter over the metadata columns. Empty selections match everything.
#[derive(Debug, Clone, Default)]
pub struct RowFilter {
    pub seasons: Vec<String>,
    pub teams: Vec<String>,
    pub homes: Vec<String>,
    pub aways: Vec<String>,
    /// Case-insensitive substring of `team`.
    pub search: Option<String>,
    pub exclude_unknown: bool,
}

impl RowFilter {
    pub fn is_empty(&self) -> bool {
        self.seasons.is_empty()
            && self.teams.is_empty()
            && self.homes.is_empty()
            && self.aways.is_empty()
            && self.search.as_deref().is_none_or(|s| s.trim().is_empty())
            && !self.exclude_unknown
    }

    pub fn matches(&self, table: &Table, row: usize) -> bool {
        let text = |name: &str| {
            table
                .cell(row, name)
                .map(Value::to_string)
                .unwrap_or_default()
        };
        let selected = |choices: &[String], name: &str| {
            choices.is_empty() || choices.iter().any(|c| *c == text(name))
        };
        if !selected(&self.seasons, "season")
            || !selected(&self.teams, "team")
            || !selected(&self.homes, "home")
            || !selected(&self.aways, "away")
        {
            return false;
        }
        if let Some(search) = self.search.as_deref().map(str::trim)
            && !search.is_empty()
            && !text("team")
                .to_lowercase()
                .contains(&search.to_lowercase())
        {
            return false;
        }
        !(self.exclude_unknown && text("season") == UNKNOWN)
    }

    pub fn apply(&self, table: &Table) -> Table {
        let mut out = table.clone();
        if !self.is_empty() {
            out.retain_rows(|t, row| self.matches(t, row));
        }
        out
    }
}
