use std::fs;
use std::path::Path;

use csv::ReaderBuilder;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{DomainProfile, ExcludeRows};
use crate::file_meta::{self, FileMetadata};
use crate::table::{METADATA_COLUMNS, SOURCE_FILE_COLUMN, Table, Value, dedup_headers};

/// Why a source file was left out of aggregation.
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not valid UTF-8")]
    Encoding { path: String },
    #[error("{path} is empty")]
    Empty { path: String },
    #[error("{path} has no header row")]
    NoHeader { path: String },
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Normalized table for one export, or `None` when the file has to be
/// skipped. The skip is logged.
pub fn normalize_file(path: &Path, profile: &DomainProfile) -> Option<Table> {
    match try_normalize(path, profile) {
        Ok(table) => Some(table),
        Err(err) => {
            warn!(domain = %profile.domain, error = %err, "skipping source file");
            None
        }
    }
}

pub fn try_normalize(path: &Path, profile: &DomainProfile) -> Result<Table, SkipReason> {
    let bytes = fs::read(path).map_err(|source| SkipReason::Io {
        path: path.display().to_string(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    normalize_bytes(&file_name, &bytes, profile)
}

pub fn normalize_bytes(
    file_name: &str,
    bytes: &[u8],
    profile: &DomainProfile,
) -> Result<Table, SkipReason> {
    let mut table = read_raw_table(file_name, bytes, profile.title_rows)?;
    apply_profile_rules(&mut table, profile.renames, profile.exclude_rows);
    drop_index_columns(&mut table);

    let meta = file_meta::extract(file_name, profile.perspective);
    debug!(file = file_name, ?meta, rows = table.row_count(), "normalized source file");
    attach_metadata(&mut table, &meta, file_name);
    Ok(table)
}

/// Parses CSV text after skipping `title_rows` physical lines, blank or not.
/// The next record is the header; blank header cells become `Unnamed: <idx>`
/// and repeats are suffixed.
pub fn read_raw_table(name: &str, bytes: &[u8], title_rows: usize) -> Result<Table, SkipReason> {
    let text = std::str::from_utf8(bytes).map_err(|_| SkipReason::Encoding {
        path: name.to_string(),
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.trim().is_empty() {
        return Err(SkipReason::Empty {
            path: name.to_string(),
        });
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(skip_lines(text, title_rows).as_bytes());
    let mut records = reader.records();

    let header = match records.next() {
        Some(record) => record.map_err(|source| SkipReason::Csv {
            path: name.to_string(),
            source,
        })?,
        None => {
            return Err(SkipReason::NoHeader {
                path: name.to_string(),
            });
        }
    };
    let raw_headers = header
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let trimmed = cell.trim();
            if trimmed.is_empty() {
                format!("Unnamed: {idx}")
            } else {
                trimmed.to_string()
            }
        })
        .collect::<Vec<_>>();
    if raw_headers.is_empty() {
        return Err(SkipReason::NoHeader {
            path: name.to_string(),
        });
    }

    let mut rows = Vec::new();
    for record in records {
        let record = record.map_err(|source| SkipReason::Csv {
            path: name.to_string(),
            source,
        })?;
        rows.push(record.iter().map(Value::from_cell).collect::<Vec<_>>());
    }

    Ok(Table::from_records(dedup_headers(&raw_headers), rows))
}

fn skip_lines(text: &str, count: usize) -> &str {
    let mut rest = text;
    for _ in 0..count {
        match rest.find('\n') {
            Some(idx) => rest = &rest[idx + 1..],
            None => return "",
        }
    }
    rest
}

pub(crate) fn apply_profile_rules(
    table: &mut Table,
    renames: &[(&str, &str)],
    exclude: Option<ExcludeRows>,
) {
    for (from, to) in renames {
        if table.has_column(from) && !table.rename_column(from, to) {
            debug!(from, to, "rename skipped, target column exists");
        }
    }
    if let Some(rule) = exclude
        && table.has_column(rule.column)
    {
        table.retain_rows(|t, idx| {
            let cell = t
                .cell(idx, rule.column)
                .map(|v| v.to_string())
                .unwrap_or_default();
            cell.trim().to_lowercase() != rule.value
        });
    }
}

/// Stray index columns in the exports show up with names starting with "0".
pub(crate) fn drop_index_columns(table: &mut Table) {
    table.retain_columns(|c| !c.name.starts_with('0'));
}

/// Metadata first in fixed order, `source_file` last.
pub(crate) fn attach_metadata(table: &mut Table, meta: &FileMetadata, source: &str) {
    for (idx, (name, value)) in METADATA_COLUMNS.iter().zip(meta.values()).enumerate() {
        table.insert_constant(idx, name, Value::text(value));
    }
    table.push_constant(SOURCE_FILE_COLUMN, Value::text(source));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;

    #[test]
    fn title_row_is_skipped_before_header() {
        let csv = "Report title,,\nPlayer,Kills,Kills\nAna,3,4\n";
        let table = read_raw_table("t.csv", csv.as_bytes(), 1).unwrap();
        assert_eq!(table.column_names(), vec!["Player", "Kills", "Kills.1"]);
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn skip_lines_counts_blank_and_crlf_lines() {
        assert_eq!(skip_lines("\nPlayer\n", 1), "Player\n");
        assert_eq!(skip_lines("t\r\nPlayer", 1), "Player");
        assert_eq!(skip_lines("only title", 1), "");
        assert_eq!(skip_lines("a\nb", 0), "a\nb");
    }

    #[test]
    fn blank_header_cells_are_named() {
        let table = read_raw_table("t.csv", b",Kills\n0,5\n", 0).unwrap();
        assert_eq!(table.column_names(), vec!["Unnamed: 0", "Kills"]);
    }

    #[test]
    fn invalid_utf8_is_skipped() {
        let err = read_raw_table("bad.csv", &[0xff, 0xfe, 0x00, b','], 0).unwrap_err();
        assert!(matches!(err, SkipReason::Encoding { .. }));
    }

    #[test]
    fn title_only_file_has_no_header() {
        let err = read_raw_table("t.csv", b"Just a title\n", 1).unwrap_err();
        assert!(matches!(err, SkipReason::NoHeader { .. }));
    }

    #[test]
    fn raw_metadata_names_do_not_duplicate() {
        let csv = "title\nteam,Kills\nX,1\n";
        let table = normalize_bytes(
            "A vs B Totals A (2024-10-01).csv",
            csv.as_bytes(),
            Domain::Athlete.profile(),
        )
        .unwrap();
        assert_eq!(
            table.column_names(),
            vec!["season", "date", "home", "away", "team", "Kills", "source_file"]
        );
        assert_eq!(table.cell(0, "team"), Some(&Value::text("A")));
    }
}
