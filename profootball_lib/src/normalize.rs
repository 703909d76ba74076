//! Turns a located raw table into a rectangular, typed [`Table`].

use crate::locate::{RawRow, RawTable};
use crate::rules::{CellMode, TableRule};
use crate::table::{SchemaError, Table, Value};

/// Applies `rule` to `raw`: picks the header row, drops preamble rows and the
/// rows whose key cell matches one of `removal_keys`, then cleans names and
/// values and infers column types.
///
/// A removal key that matches nothing is not an error; most tables simply
/// have no such row. A row that has cells but not as many as the header is a
/// [`SchemaError::RaggedRow`]. A row with no cells at all is a spacer (the
/// site repeats header rows inside long leaderboards) and comes through as an
/// all-missing row.
pub fn normalize(
    raw: &RawTable,
    rule: &TableRule,
    removal_keys: &[&str],
) -> Result<Table, SchemaError> {
    let header = raw
        .rows
        .get(rule.header_row)
        .ok_or(SchemaError::HeaderRowMissing {
            header_row: rule.header_row,
            rows: raw.rows.len(),
        })?;

    let mut labels: Vec<String> = header
        .cells
        .iter()
        .map(|c| c.text.trim_end_matches('\n').to_string())
        .collect();
    if rule.cells == CellMode::Data && !labels.is_empty() {
        labels.remove(0);
    }
    let labels = unique_labels(labels);

    let key_idx = labels
        .iter()
        .position(|l| *l == rule.key)
        .ok_or_else(|| SchemaError::MissingKeyColumn(rule.key.clone()))?;

    let width = labels.len();
    let mut table = Table::new(labels)?;
    let mut dropped = 0;

    for (row_idx, row) in raw.rows.iter().enumerate().skip(rule.skip_rows) {
        let cells = row_cells(row, rule.cells);

        if cells.is_empty() {
            table.push_row(vec![Value::Missing; width])?;
            continue;
        }

        if let Some(key) = cells.get(key_idx) {
            if removal_keys.contains(key) {
                dropped += 1;
                continue;
            }
        }

        if cells.len() != width {
            return Err(SchemaError::RaggedRow {
                row: row_idx,
                expected: width,
                found: cells.len(),
            });
        }

        table.push_row(cells.into_iter().map(Value::from_cell).collect())?;
    }

    tracing::debug!(
        "normalized {}: {} rows kept, {} summary rows dropped",
        rule.id,
        table.len(),
        dropped
    );

    clean(table)
}

/// Column and value cleanup shared by every table: `%` in names becomes
/// `_perc`, trailing `%` is stripped from text values, then column types are
/// inferred.
pub fn clean(table: Table) -> Result<Table, SchemaError> {
    Ok(table
        .rename_columns(|c| c.replace('%', "_perc"))?
        .map_text(|s| s.trim_end_matches('%').to_string())
        .infer_types())
}

fn row_cells(row: &RawRow, mode: CellMode) -> Vec<&str> {
    row.cells
        .iter()
        .filter(|c| mode == CellMode::All || !c.header)
        .map(|c| c.text.as_str())
        .collect()
}

/// Blank labels become `Unnamed: {index}`; repeats get `.1`, `.2`, ... in
/// order of appearance, the naming pandas uses when it reads the files back.
pub fn unique_labels(labels: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(labels.len());
    for (idx, label) in labels.into_iter().enumerate() {
        let base = if label.trim().is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            label
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while out.contains(&candidate) {
            candidate = format!("{}.{}", base, n);
            n += 1;
        }
        out.push(candidate);
    }
    out
}
