use std::path::Path;

use anyhow::{Context, Result, anyhow};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::table::{Table, Value};

// Excel caps sheet names at 31 characters.
const MAX_SHEET_NAME: usize = 31;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub rows: usize,
    pub columns: usize,
}

/// Picks the format from the extension: `.csv` or `.xlsx`.
pub fn export_table(table: &Table, path: &Path, sheet_name: &str) -> Result<ExportReport> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("csv") => export_csv(table, path),
        Some("xlsx") => export_xlsx(table, path, sheet_name),
        _ => Err(anyhow!(
            "unsupported export format for {} (use .csv or .xlsx)",
            path.display()
        )),
    }
}

pub fn export_csv(table: &Table, path: &Path) -> Result<ExportReport> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    writer
        .write_record(table.column_names())
        .context("write csv header")?;
    for row in 0..table.row_count() {
        let record = table
            .row(row)
            .into_iter()
            .map(Value::to_string)
            .collect::<Vec<_>>();
        writer
            .write_record(&record)
            .with_context(|| format!("write csv row {row}"))?;
    }
    writer.flush().context("flush csv export")?;
    Ok(report(table))
}

pub fn export_xlsx(table: &Table, path: &Path, sheet_name: &str) -> Result<ExportReport> {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_label(sheet_name))?;
        write_table(sheet, table)?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(report(table))
}

fn write_table(worksheet: &mut Worksheet, table: &Table) -> Result<()> {
    for (col_idx, name) in table.column_names().into_iter().enumerate() {
        let (_, col) = sheet_cell(0, col_idx)?;
        worksheet
            .write_string(0, col, name)
            .with_context(|| format!("write header ({col_idx})"))?;
    }
    for (col_idx, column) in table.columns().iter().enumerate() {
        for (row_idx, value) in column.values.iter().enumerate() {
            let (row, col) = sheet_cell(row_idx + 1, col_idx)?;
            let written = match value {
                Value::Null => continue,
                Value::Number(v) => worksheet.write_number(row, col, *v),
                Value::Bool(b) => worksheet.write_boolean(row, col, *b),
                Value::Text(s) => worksheet.write_string(row, col, s),
            };
            written.with_context(|| format!("write cell ({row},{col})"))?;
        }
    }
    Ok(())
}

fn sheet_cell(row_idx: usize, col_idx: usize) -> Result<(u32, u16)> {
    let row = u32::try_from(row_idx).with_context(|| format!("row {row_idx} exceeds sheet"))?;
    let col = u16::try_from(col_idx).with_context(|| format!("column {col_idx} exceeds sheet"))?;
    Ok((row, col))
}

fn sheet_label(raw: &str) -> String {
    let cleaned = raw
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            other => other,
        })
        .take(MAX_SHEET_NAME)
        .collect::<String>();
    if cleaned.trim().is_empty() {
        "Data".to_string()
    } else {
        cleaned
    }
}

fn report(table: &Table) -> ExportReport {
    ExportReport {
        rows: table.row_count(),
        columns: table.column_count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_positions_are_errors_not_wrapped() {
        assert_eq!(sheet_cell(1, 2).unwrap(), (1, 2));
        assert!(sheet_cell(0, usize::from(u16::MAX) + 1).is_err());
        assert!(sheet_cell(u32::MAX as usize + 1, 0).is_err());
    }

    #[test]
    fn sheet_label_strips_reserved_chars() {
        assert_eq!(sheet_label("Overall: 2024/25"), "Overall_ 2024_25");
        assert_eq!(sheet_label(""), "Data");
        assert_eq!(sheet_label(&"x".repeat(40)).len(), MAX_SHEET_NAME);
    }
}
