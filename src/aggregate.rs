use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::domain::DomainProfile;
use crate::file_meta::FileMetadata;
use crate::normalize::{
    apply_profile_rules, attach_metadata, drop_index_columns, normalize_file, read_raw_table,
};
use crate::schema;
use crate::table::{HISTORICAL_SOURCE, SOURCE_FILE_COLUMN, Table};

const HISTORICAL_INDEX_COLUMN: &str = "Unnamed: 0";

pub fn collect_source_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "source directory missing");
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("list {}", dir.display()))? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(
                    dir = %dir.display(),
                    error = %err,
                    "skipping unreadable directory entry"
                );
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "csv");
        if is_csv {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

pub fn normalize_all(files: &[PathBuf], profile: &DomainProfile) -> Vec<Table> {
    files
        .par_iter()
        .map(|path| normalize_file(path, profile))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}

/// Legacy table for the domain, or `None` when the profile has no historical
/// file, the file is missing, or it cannot be read (logged).
pub fn load_historical(root: &Path, profile: &DomainProfile) -> Option<Table> {
    let path = profile.historical_path(root)?;
    if !path.is_file() {
        return None;
    }
    match read_historical(&path, profile) {
        Ok(table) if table.is_empty() => None,
        Ok(table) => Some(table),
        Err(err) => {
            warn!(domain = %profile.domain, error = %err, "failed to load historical data");
            None
        }
    }
}

fn read_historical(path: &Path, profile: &DomainProfile) -> Result<Table> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let mut table = read_raw_table(&path.display().to_string(), &bytes, 0)?;
    table.remove_column(HISTORICAL_INDEX_COLUMN);
    apply_profile_rules(&mut table, profile.historical_renames, profile.exclude_rows);
    drop_index_columns(&mut table);
    attach_metadata(&mut table, &FileMetadata::unknown(), HISTORICAL_SOURCE);
    Ok(table)
}

pub fn reconcile_historical(tables: &mut [Table], historical: &mut Table) {
    let Some(first) = tables.first() else {
        return;
    };
    let normalized = first
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    for name in &normalized {
        historical.ensure_column(name);
    }
    let legacy = historical
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    for table in tables.iter_mut() {
        for name in &legacy {
            table.ensure_column(name);
        }
    }
}

/// Union of column names in order of first appearance, `source_file` last.
pub fn union_columns(tables: &[Table]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for table in tables {
        for name in table.column_names() {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    if let Some(idx) = names.iter().position(|n| n == SOURCE_FILE_COLUMN) {
        let source = names.remove(idx);
        names.push(source);
    }
    names
}

pub fn concat(tables: Vec<Table>) -> Result<Table> {
    let names = union_columns(&tables);
    let mut combined: Option<Table> = None;
    for mut table in tables {
        table.conform_to(&names);
        match combined.as_mut() {
            Some(acc) => acc.append(table)?,
            None => combined = Some(table),
        }
    }
    Ok(combined.unwrap_or_default())
}

/// Combines per-file tables (in order) and the legacy table (last), then
/// coerces every column to a single kind.
pub fn aggregate(mut tables: Vec<Table>, historical: Option<Table>) -> Result<Table> {
    if let Some(mut historical) = historical {
        reconcile_historical(&mut tables, &mut historical);
        tables.push(historical);
    }
    if tables.is_empty() {
        return Ok(Table::new());
    }
    let combined = concat(tables)?;
    schema::coerce(combined).context("coerce combined columns")
}

pub fn build_domain(root: &Path, profile: &DomainProfile) -> Result<Table> {
    let files = collect_source_files(&profile.source_dir(root))?;
    let tables = normalize_all(&files, profile);
    let historical = load_historical(root, profile);
    info!(
        domain = %profile.domain,
        files = files.len(),
        normalized = tables.len(),
        historical = historical.is_some(),
        "aggregating domain"
    );
    aggregate(tables, historical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::from_records(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| Value::from_cell(c)).collect())
                .collect(),
        )
    }

    #[test]
    fn union_moves_source_file_last() {
        let a = table(&["A", "source_file"], &[]);
        let b = table(&["B", "source_file", "C"], &[]);
        assert_eq!(union_columns(&[a, b]), vec!["A", "B", "C", "source_file"]);
    }

    #[test]
    fn reconcile_adds_columns_both_ways() {
        let mut tables = vec![table(&["A", "B"], &[&["1", "2"]])];
        let mut historical = table(&["B", "C"], &[&["3", "4"]]);
        reconcile_historical(&mut tables, &mut historical);
        assert_eq!(tables[0].column_names(), vec!["A", "B", "C"]);
        assert_eq!(historical.column_names(), vec!["B", "C", "A"]);
        assert_eq!(tables[0].cell(0, "C"), Some(&Value::Null));
    }

    #[test]
    fn listing_skips_directories_and_dangling_links() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.csv"), "t\nA\n1\n").unwrap();
        fs::create_dir(dir.path().join("a.csv")).unwrap();
        #[cfg(unix)]
        std::os::unix::fs::symlink(dir.path().join("gone.csv"), dir.path().join("c.csv")).unwrap();

        let files = collect_source_files(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("b.csv")]);
    }

    #[test]
    fn aggregate_of_nothing_is_empty() {
        let out = aggregate(Vec::new(), None).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.column_count(), 0);
    }
}
