//! Row filters and column helpers for reading persisted tables.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use crate::table::{ColumnType, Record, Table};

/// Columns that identify a row rather than measure anything.
pub const IDENTITY_COLUMNS: &[&str] = &["Tm", "Rk", "Year", "Player", "Pos"];

/// Filter on season range, team and player name. Unset fields match every row.
#[derive(Debug, Clone, Default)]
pub struct TableFilter {
    pub years: Option<RangeInclusive<u16>>,
    /// Exact team name or abbreviation, case-insensitive.
    pub team: Option<String>,
    /// Substring of the player name, case-insensitive.
    pub player: Option<String>,
}

impl TableFilter {
    pub fn matches(&self, record: &Record<'_>) -> bool {
        if let Some(years) = &self.years {
            let year = record.get("Year").and_then(|v| v.as_f64());
            match year {
                Some(y) if y >= *years.start() as f64 && y <= *years.end() as f64 => {}
                _ => return false,
            }
        }
        if let Some(team) = &self.team {
            let tm = record.get("Tm").map(|v| v.to_string()).unwrap_or_default();
            if !tm.eq_ignore_ascii_case(team.trim()) {
                return false;
            }
        }
        if let Some(player) = &self.player {
            let name = record
                .get("Player")
                .map(|v| v.to_string().to_lowercase())
                .unwrap_or_default();
            if !name.contains(&player.trim().to_lowercase()) {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, table: Table) -> Table {
        table.retain_rows(|r| self.matches(&r))
    }
}

/// Columns worth plotting: everything except [`IDENTITY_COLUMNS`].
pub fn stat_columns(table: &Table) -> Vec<&str> {
    table
        .columns()
        .iter()
        .map(String::as_str)
        .filter(|c| !IDENTITY_COLUMNS.contains(c))
        .collect()
}

/// [`stat_columns`] paired with the type inferred from their values.
pub fn stat_column_types(table: &Table) -> Vec<(&str, ColumnType)> {
    stat_columns(table)
        .into_iter()
        .filter_map(|c| table.column_type(c).map(|t| (c, t)))
        .collect()
}

/// Teams with a row in `year`, in order of first appearance.
pub fn teams_in_year(table: &Table, year: u16) -> Vec<String> {
    let mut seen = Vec::new();
    for record in table.records() {
        let matches_year = record
            .get("Year")
            .and_then(|v| v.as_f64())
            .is_some_and(|y| y == year as f64);
        if !matches_year {
            continue;
        }
        if let Some(tm) = record.get("Tm").filter(|v| !v.is_missing()) {
            let tm = tm.to_string();
            if !seen.contains(&tm) {
                seen.push(tm);
            }
        }
    }
    seen
}

/// Teams with rows in both seasons, in `a`'s order of first appearance.
pub fn teams_in_both_years(table: &Table, a: u16, b: u16) -> Vec<String> {
    let in_b: HashSet<String> = teams_in_year(table, b).into_iter().collect();
    teams_in_year(table, a)
        .into_iter()
        .filter(|t| in_b.contains(t))
        .collect()
}
