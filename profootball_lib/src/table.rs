//! Rectangular, typed tables produced by the normalizer and consumed by the
//! merge engine, the assembler and the persister.

use std::collections::HashSet;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Errors raised when a table would stop being rectangular or its column
/// names would stop being unique.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("header row {header_row} is missing ({rows} rows in table)")]
    HeaderRowMissing { header_row: usize, rows: usize },
    #[error("row {row} has {found} cells, header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),
    #[error("key column {0} not found in header")]
    MissingKeyColumn(String),
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    /// Wraps scraped cell text; empty text becomes `Missing`.
    pub fn from_cell(text: &str) -> Self {
        if text.is_empty() {
            Value::Missing
        } else {
            Value::Text(text.to_string())
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Missing => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Missing => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                serializer.serialize_i64(*n as i64)
            }
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Missing => serializer.serialize_none(),
        }
    }
}

/// Inferred type of a whole column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Numeric,
    Text,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Numeric => f.write_str("numeric"),
            ColumnType::Text => f.write_str("text"),
        }
    }
}

/// An ordered set of uniquely named columns and rows of equal width.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.as_str()) {
                return Err(SchemaError::DuplicateColumn(col.clone()));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// A table with no columns and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), SchemaError> {
        if row.len() != self.columns.len() {
            return Err(SchemaError::RaggedRow {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Values of one column, top to bottom.
    pub fn column_values<'a>(&'a self, column: &str) -> Option<impl Iterator<Item = &'a Value>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(move |r| &r[idx]))
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(|values| Record {
            columns: &self.columns,
            values,
        })
    }

    /// Sets `name` to `value` on every row, appending the column if it does not exist.
    pub fn with_constant(mut self, name: &str, value: Value) -> Self {
        match self.column_index(name) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = value.clone();
                }
            }
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(value.clone());
                }
            }
        }
        self
    }

    /// Rewrites every value of one column. A missing column is left alone.
    pub fn map_column<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&Value) -> Value,
    {
        if let Some(idx) = self.column_index(name) {
            for row in &mut self.rows {
                row[idx] = f(&row[idx]);
            }
        }
        self
    }

    /// Rewrites every text value in the table.
    pub fn map_text<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String,
    {
        for row in &mut self.rows {
            for value in row.iter_mut() {
                if let Value::Text(s) = value {
                    *value = Value::from_cell(&f(s));
                }
            }
        }
        self
    }

    /// Renames every column, failing if the new names collide.
    pub fn rename_columns<F>(self, f: F) -> Result<Self, SchemaError>
    where
        F: Fn(&str) -> String,
    {
        let columns = self.columns.iter().map(|c| f(c.as_str())).collect();
        let mut renamed = Table::new(columns)?;
        renamed.rows = self.rows;
        Ok(renamed)
    }

    pub fn retain_rows<F>(mut self, keep: F) -> Self
    where
        F: Fn(Record<'_>) -> bool,
    {
        let columns = &self.columns;
        self.rows.retain(|values| keep(Record { columns, values }));
        self
    }

    /// Drops rows whose `column` value is missing.
    pub fn drop_missing(self, column: &str) -> Self {
        match self.column_index(column) {
            Some(idx) => self.retain_rows(|r| !r.values[idx].is_missing()),
            None => self,
        }
    }

    /// Appends `other` below `self`. Columns are the union of both tables in
    /// first-seen order; cells for columns a side lacks are `Missing`.
    pub fn append(mut self, other: Table) -> Self {
        if self.columns.is_empty() && self.rows.is_empty() {
            return other;
        }
        let mapping: Vec<usize> = other
            .columns
            .iter()
            .map(|col| match self.column_index(col) {
                Some(idx) => idx,
                None => {
                    self.columns.push(col.clone());
                    for row in &mut self.rows {
                        row.push(Value::Missing);
                    }
                    self.columns.len() - 1
                }
            })
            .collect();

        let width = self.columns.len();
        for other_row in other.rows {
            let mut row = vec![Value::Missing; width];
            for (value, &idx) in other_row.into_iter().zip(&mapping) {
                row[idx] = value;
            }
            self.rows.push(row);
        }
        self
    }

    /// Column type as inferred from the current values.
    pub fn column_type(&self, column: &str) -> Option<ColumnType> {
        let values = self.column_values(column)?;
        Some(infer_column(values))
    }

    /// Converts every all-numeric column to `Number` values and every other
    /// column to `Text` values. Running it twice changes nothing.
    pub fn infer_types(mut self) -> Self {
        for idx in 0..self.columns.len() {
            let ty = infer_column(self.rows.iter().map(|r| &r[idx]));
            if ty == ColumnType::Text {
                let numeric = self
                    .rows
                    .iter()
                    .filter(|r| r[idx].as_f64().is_some())
                    .count();
                if numeric > 0 {
                    tracing::warn!(
                        "column {} is partially numeric ({} of {} rows); keeping it as text",
                        self.columns[idx],
                        numeric,
                        self.rows.len()
                    );
                }
            }
            for row in &mut self.rows {
                let cell = std::mem::replace(&mut row[idx], Value::Missing);
                row[idx] = match (ty, cell) {
                    (_, Value::Missing) => Value::Missing,
                    (ColumnType::Numeric, Value::Text(s)) => match s.trim().parse::<f64>() {
                        Ok(n) => Value::Number(n),
                        Err(_) => Value::Text(s),
                    },
                    (ColumnType::Text, Value::Number(n)) => Value::Text(n.to_string()),
                    (_, cell) => cell,
                };
            }
        }
        self
    }
}

fn infer_column<'a>(values: impl Iterator<Item = &'a Value>) -> ColumnType {
    let mut present = 0;
    for value in values {
        match value {
            Value::Missing => continue,
            Value::Number(_) => present += 1,
            Value::Text(s) => {
                if !is_numeric(s) {
                    return ColumnType::Text;
                }
                present += 1;
            }
        }
    }
    if present == 0 {
        ColumnType::Text
    } else {
        ColumnType::Numeric
    }
}

fn is_numeric(s: &str) -> bool {
    let s = s.trim();
    // f64 parsing also accepts "inf" and "NaN", which are names, not stats.
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        && s.parse::<f64>().is_ok()
}

/// A borrowed view of one row, addressable by column name.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> Record<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Tables keyed by table identifier, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    entries: Vec<(String, Table)>,
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the table stored under `id`, keeping its position.
    pub fn insert(&mut self, id: &str, table: Table) {
        match self.entries.iter_mut().find(|(k, _)| k == id) {
            Some(entry) => entry.1 = table,
            None => self.entries.push((id.to_string(), table)),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Table> {
        self.entries.iter().find(|(k, _)| k == id).map(|(_, t)| t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.entries.iter().map(|(k, t)| (k.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends `table` below whatever is already stored under `id`.
    pub fn append(&mut self, id: &str, table: Table) {
        let merged = match self.remove_in_place(id) {
            Some(existing) => existing.append(table),
            None => table,
        };
        self.insert(id, merged);
    }

    fn remove_in_place(&mut self, id: &str) -> Option<Table> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == id)
            .map(|(_, t)| std::mem::take(t))
    }
}

impl IntoIterator for TableSet {
    type Item = (String, Table);
    type IntoIter = std::vec::IntoIter<(String, Table)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        let mut t = Table::new(columns.iter().map(|c| c.to_string()).collect()).unwrap();
        for row in rows {
            t.push_row(row.iter().map(|c| Value::from_cell(c)).collect())
                .unwrap();
        }
        t
    }

    #[test]
    fn duplicate_columns_rejected() {
        let result = Table::new(vec!["Tm".into(), "Yds".into(), "Yds".into()]);
        assert_eq!(result, Err(SchemaError::DuplicateColumn("Yds".into())));
    }

    #[test]
    fn ragged_row_rejected() {
        let mut t = Table::new(vec!["Tm".into(), "Yds".into()]).unwrap();
        let err = t.push_row(vec![Value::from("NE")]).unwrap_err();
        assert_eq!(
            err,
            SchemaError::RaggedRow {
                row: 0,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn infer_numeric_and_text_columns() {
        let t = table(&["Tm", "Yds", "Y/P"], &[&["NE", "100", "5.4"], &["BUF", "", "6"]])
            .infer_types();
        assert_eq!(t.get(0, "Yds"), Some(&Value::Number(100.0)));
        assert_eq!(t.get(1, "Yds"), Some(&Value::Missing));
        assert_eq!(t.get(0, "Y/P"), Some(&Value::Number(5.4)));
        assert_eq!(t.get(0, "Tm"), Some(&Value::Text("NE".into())));
        assert_eq!(t.column_type("Yds"), Some(ColumnType::Numeric));
        assert_eq!(t.column_type("Tm"), Some(ColumnType::Text));
    }

    #[test]
    fn mixed_column_stays_text() {
        let t = table(&["QBrec"], &[&["13-4-0"], &["7"]]).infer_types();
        assert_eq!(t.get(1, "QBrec"), Some(&Value::Text("7".into())));
        assert_eq!(t.column_type("QBrec"), Some(ColumnType::Text));
    }

    #[test]
    fn infer_types_is_idempotent() {
        let t = table(&["Tm", "Yds"], &[&["NE", "100"]]).infer_types();
        assert_eq!(t.clone().infer_types(), t);
    }

    #[test]
    fn numbers_demoted_when_column_turns_text() {
        let early = table(&["Rate"], &[&["88.5"]]).infer_types();
        let late = table(&["Rate"], &[&["n/a"]]);
        let t = early.append(late).infer_types();
        assert_eq!(t.get(0, "Rate"), Some(&Value::Text("88.5".into())));
        assert_eq!(t.get(1, "Rate"), Some(&Value::Text("n/a".into())));
    }

    #[test]
    fn infinity_is_not_numeric() {
        let t = table(&["Player"], &[&["inf"], &["NaN"]]).infer_types();
        assert_eq!(t.column_type("Player"), Some(ColumnType::Text));
    }

    #[test]
    fn append_unions_columns() {
        let a = table(&["Tm", "Yds"], &[&["NE", "100"]]);
        let b = table(&["Tm", "EXP"], &[&["NE", "12.5"]]);
        let t = a.append(b);
        assert_eq!(t.columns(), &["Tm", "Yds", "EXP"]);
        assert_eq!(t.get(0, "EXP"), Some(&Value::Missing));
        assert_eq!(t.get(1, "Yds"), Some(&Value::Missing));
        assert_eq!(t.get(1, "EXP"), Some(&Value::Text("12.5".into())));
    }

    #[test]
    fn append_to_empty_takes_other() {
        let b = table(&["Tm"], &[&["NE"]]);
        assert_eq!(Table::empty().append(b.clone()), b);
    }

    #[test]
    fn with_constant_appends_column() {
        let t = table(&["Tm"], &[&["NE"], &["BUF"]]).with_constant("Year", Value::from(2021i64));
        assert_eq!(t.columns(), &["Tm", "Year"]);
        assert_eq!(t.get(1, "Year"), Some(&Value::Number(2021.0)));
    }

    #[test]
    fn drop_missing_removes_spacer_rows() {
        let t = table(&["Player", "Yds"], &[&["Tom Brady", "5316"], &["", ""]]);
        assert_eq!(t.drop_missing("Player").len(), 1);
    }

    #[test]
    fn rename_collision_rejected() {
        let t = table(&["Cmp%", "Cmp_perc"], &[]);
        let result = t.rename_columns(|c| c.replace('%', "_perc"));
        assert!(matches!(result, Err(SchemaError::DuplicateColumn(_))));
    }

    #[test]
    fn record_serializes_as_object() {
        let t = table(&["Tm", "Yds"], &[&["NE", "100"]]).infer_types();
        let json = serde_json::to_value(t.records().next().unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"Tm": "NE", "Yds": 100}));
    }

    #[test]
    fn table_set_keeps_insertion_order() {
        let mut set = TableSet::new();
        set.append("team_stats", table(&["Tm"], &[&["NE"]]));
        set.append("passing", table(&["Tm"], &[&["NE"]]));
        set.append("team_stats", table(&["Tm"], &[&["BUF"]]));
        let ids: Vec<&str> = set.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["team_stats", "passing"]);
        assert_eq!(set.get("team_stats").unwrap().len(), 2);
    }
}
