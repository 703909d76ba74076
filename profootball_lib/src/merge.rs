//! Joins team tables with their opponent counterparts on (`Tm`, `Year`).

use std::collections::HashMap;
use std::fmt;

use crate::table::{SchemaError, Table, TableSet, Value};

pub const TEAM_KEY: &str = "Tm";
pub const YEAR_KEY: &str = "Year";
pub const OPPONENT_PREFIX: &str = "opp_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Team,
    Opponent,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Team => f.write_str("team"),
            Side::Opponent => f.write_str("opponent"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MergeError {
    #[error("{table}: ({team}, {year}) is on the {present} side only")]
    Unmatched {
        table: String,
        team: String,
        year: String,
        present: Side,
    },
    #[error("{table}: ({team}, {year}) appears more than once on the {side} side")]
    DuplicateKey {
        table: String,
        team: String,
        year: String,
        side: Side,
    },
    #[error("{table}: {side} table has no {column} column")]
    MissingKeyColumn {
        table: String,
        side: Side,
        column: String,
    },
    #[error("{table}: {side} row {row} has an empty {column}")]
    MissingKey {
        table: String,
        side: Side,
        row: usize,
        column: String,
    },
    #[error("{table}: no {side} table to merge")]
    MissingTable { table: String, side: Side },
    #[error("{table}: {source}")]
    Schema {
        table: String,
        #[source]
        source: SchemaError,
    },
}

/// Renames every column except `Tm` and `Year` with the `opp_` prefix.
pub fn prefix_opponent(table: Table) -> Result<Table, SchemaError> {
    table.rename_columns(|c| {
        if c == TEAM_KEY || c == YEAR_KEY {
            c.to_string()
        } else {
            format!("{}{}", OPPONENT_PREFIX, c)
        }
    })
}

/// Inner join of one team table with its (unprefixed) opponent table.
///
/// Every (`Tm`, `Year`) key must appear exactly once on each side: a key
/// found on one side only means one of the scrapes was partial, and is an
/// error rather than a dropped or null-filled row. Output columns are `Tm`,
/// `Year`, the team columns, then the `opp_` columns; rows follow team order.
pub fn merge_tables(table_id: &str, team: &Table, opponent: &Table) -> Result<Table, MergeError> {
    if team.is_empty() && opponent.is_empty() {
        return Ok(Table::empty());
    }

    let opponent = prefix_opponent(opponent.clone()).map_err(|source| MergeError::Schema {
        table: table_id.to_string(),
        source,
    })?;

    let team_keys = index_keys(table_id, Side::Team, team)?;
    let opp_keys = index_keys(table_id, Side::Opponent, &opponent)?;

    for (key, _) in opp_keys.iter() {
        if !team_keys.contains_key(key) {
            return Err(unmatched(table_id, key, Side::Opponent));
        }
    }

    let team_rest: Vec<usize> = non_key_columns(team);
    let opp_rest: Vec<usize> = non_key_columns(&opponent);

    let mut columns = vec![TEAM_KEY.to_string(), YEAR_KEY.to_string()];
    columns.extend(team_rest.iter().map(|&i| team.columns()[i].clone()));
    columns.extend(opp_rest.iter().map(|&i| opponent.columns()[i].clone()));
    let mut merged = Table::new(columns).map_err(|source| MergeError::Schema {
        table: table_id.to_string(),
        source,
    })?;

    let (tm_idx, year_idx) = key_indices(table_id, Side::Team, team)?;
    for row in team.rows() {
        let key = row_key(row, tm_idx, year_idx);
        let opp_row = opp_keys
            .get(&key)
            .map(|&i| &opponent.rows()[i])
            .ok_or_else(|| unmatched(table_id, &key, Side::Team))?;

        let mut values = vec![row[tm_idx].clone(), row[year_idx].clone()];
        values.extend(team_rest.iter().map(|&i| row[i].clone()));
        values.extend(opp_rest.iter().map(|&i| opp_row[i].clone()));
        merged.push_row(values).map_err(|source| MergeError::Schema {
            table: table_id.to_string(),
            source,
        })?;
    }

    Ok(merged)
}

/// Merges every id in `ids` that both sets contain.
pub fn merge(team: &TableSet, opponent: &TableSet, ids: &[&str]) -> Result<TableSet, MergeError> {
    let mut merged = TableSet::new();
    for &id in ids {
        let team_table = team.get(id).ok_or_else(|| MergeError::MissingTable {
            table: id.to_string(),
            side: Side::Team,
        })?;
        let opp_table = opponent.get(id).ok_or_else(|| MergeError::MissingTable {
            table: id.to_string(),
            side: Side::Opponent,
        })?;
        let table = merge_tables(id, team_table, opp_table)?;
        tracing::info!("merged {}: {} rows", id, table.len());
        merged.insert(id, table);
    }
    Ok(merged)
}

type Key = (String, String);

fn row_key(row: &[Value], tm_idx: usize, year_idx: usize) -> Key {
    (row[tm_idx].to_string(), row[year_idx].to_string())
}

fn unmatched(table: &str, key: &Key, present: Side) -> MergeError {
    MergeError::Unmatched {
        table: table.to_string(),
        team: key.0.clone(),
        year: key.1.clone(),
        present,
    }
}

fn non_key_columns(table: &Table) -> Vec<usize> {
    table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| *c != TEAM_KEY && *c != YEAR_KEY)
        .map(|(i, _)| i)
        .collect()
}

fn key_indices(table_id: &str, side: Side, table: &Table) -> Result<(usize, usize), MergeError> {
    let missing_column = |column: &str| MergeError::MissingKeyColumn {
        table: table_id.to_string(),
        side,
        column: column.to_string(),
    };
    let tm_idx = table
        .column_index(TEAM_KEY)
        .ok_or_else(|| missing_column(TEAM_KEY))?;
    let year_idx = table
        .column_index(YEAR_KEY)
        .ok_or_else(|| missing_column(YEAR_KEY))?;
    Ok((tm_idx, year_idx))
}

fn index_keys(
    table_id: &str,
    side: Side,
    table: &Table,
) -> Result<HashMap<Key, usize>, MergeError> {
    let (tm_idx, year_idx) = key_indices(table_id, side, table)?;

    let mut keys = HashMap::with_capacity(table.len());
    for (row_idx, row) in table.rows().iter().enumerate() {
        for idx in [tm_idx, year_idx] {
            if row[idx].is_missing() {
                return Err(MergeError::MissingKey {
                    table: table_id.to_string(),
                    side,
                    row: row_idx,
                    column: table.columns()[idx].clone(),
                });
            }
        }
        let key = row_key(row, tm_idx, year_idx);
        if keys.contains_key(&key) {
            return Err(MergeError::DuplicateKey {
                table: table_id.to_string(),
                team: key.0,
                year: key.1,
                side,
            });
        }
        keys.insert(key, row_idx);
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: Vec<Vec<Value>>) -> Table {
        let mut t = Table::new(columns.iter().map(|c| c.to_string()).collect()).unwrap();
        for row in rows {
            t.push_row(row).unwrap();
        }
        t
    }

    fn row(tm: &str, year: i64, yds: f64) -> Vec<Value> {
        vec![Value::from(tm), Value::from(year), Value::from(yds)]
    }

    #[test]
    fn merge_is_inner_join_on_team_and_year() {
        let team = table(&["Tm", "Year", "Yds"], vec![row("AAA", 2020, 100.0)]);
        let opp = table(&["Tm", "Year", "Yds"], vec![row("AAA", 2020, 50.0)]);
        let merged = merge_tables("team_stats", &team, &opp).unwrap();
        assert_eq!(merged.columns(), &["Tm", "Year", "Yds", "opp_Yds"]);
        assert_eq!(merged.len(), 1);
        assert_eq!(
            merged.rows()[0],
            vec![
                Value::from("AAA"),
                Value::from(2020i64),
                Value::from(100.0),
                Value::from(50.0)
            ]
        );
    }

    #[test]
    fn team_only_key_is_merge_error() {
        let team = table(
            &["Tm", "Year", "Yds"],
            vec![row("AAA", 2020, 100.0), row("BBB", 2020, 90.0)],
        );
        let opp = table(&["Tm", "Year", "Yds"], vec![row("AAA", 2020, 50.0)]);
        let err = merge_tables("team_stats", &team, &opp).unwrap_err();
        assert_eq!(
            err,
            MergeError::Unmatched {
                table: "team_stats".into(),
                team: "BBB".into(),
                year: "2020".into(),
                present: Side::Team,
            }
        );
    }

    #[test]
    fn opponent_only_key_is_merge_error() {
        let team = table(&["Tm", "Year", "Yds"], vec![row("AAA", 2020, 100.0)]);
        let opp = table(
            &["Tm", "Year", "Yds"],
            vec![row("AAA", 2020, 50.0), row("CCC", 2020, 70.0)],
        );
        let err = merge_tables("team_stats", &team, &opp).unwrap_err();
        assert!(matches!(
            err,
            MergeError::Unmatched { present: Side::Opponent, .. }
        ));
    }

    #[test]
    fn same_team_different_years_are_distinct_keys() {
        let team = table(
            &["Tm", "Year", "Yds"],
            vec![row("AAA", 2020, 100.0), row("AAA", 2021, 110.0)],
        );
        let opp = table(
            &["Tm", "Year", "Yds"],
            vec![row("AAA", 2021, 60.0), row("AAA", 2020, 50.0)],
        );
        let merged = merge_tables("team_stats", &team, &opp).unwrap();
        assert_eq!(merged.get(0, "opp_Yds"), Some(&Value::from(50.0)));
        assert_eq!(merged.get(1, "opp_Yds"), Some(&Value::from(60.0)));
    }

    #[test]
    fn duplicate_key_rejected() {
        let team = table(
            &["Tm", "Year", "Yds"],
            vec![row("AAA", 2020, 100.0), row("AAA", 2020, 100.0)],
        );
        let opp = table(&["Tm", "Year", "Yds"], vec![row("AAA", 2020, 50.0)]);
        assert!(matches!(
            merge_tables("team_stats", &team, &opp),
            Err(MergeError::DuplicateKey { side: Side::Team, .. })
        ));
    }

    #[test]
    fn key_columns_moved_to_front() {
        let team = table(
            &["Rk", "Tm", "Yds", "Year"],
            vec![vec![Value::from(1i64), Value::from("AAA"), Value::from(100.0), Value::from(2020i64)]],
        );
        let opp = table(
            &["Rk", "Tm", "Yds", "Year"],
            vec![vec![Value::from(3i64), Value::from("AAA"), Value::from(50.0), Value::from(2020i64)]],
        );
        let merged = merge_tables("passing", &team, &opp).unwrap();
        assert_eq!(
            merged.columns(),
            &["Tm", "Year", "Rk", "Yds", "opp_Rk", "opp_Yds"]
        );
    }

    #[test]
    fn missing_team_column_reported() {
        let team = table(&["Year", "Yds"], vec![vec![Value::from(2020i64), Value::from(1.0)]]);
        let opp = table(&["Tm", "Year", "Yds"], vec![row("AAA", 2020, 50.0)]);
        assert!(matches!(
            merge_tables("drives", &team, &opp),
            Err(MergeError::MissingKeyColumn { side: Side::Team, .. })
        ));
    }

    #[test]
    fn both_empty_merge_to_empty() {
        assert!(merge_tables("drives", &Table::empty(), &Table::empty())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn merge_set_requires_both_sides() {
        let mut team = TableSet::new();
        team.insert("drives", table(&["Tm", "Year"], vec![]));
        let opp = TableSet::new();
        assert!(matches!(
            merge(&team, &opp, &["drives"]),
            Err(MergeError::MissingTable { side: Side::Opponent, .. })
        ));
    }

    #[test]
    fn prefix_leaves_keys_alone() {
        let t = prefix_opponent(table(&["Tm", "Year", "Y/P"], vec![])).unwrap();
        assert_eq!(t.columns(), &["Tm", "Year", "opp_Y/P"]);
    }
}
