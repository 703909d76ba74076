//! CSV output layout and the read side used by consumers of the files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::pipeline::Datasets;
use crate::rules::RuleBook;
use crate::table::{SchemaError, Table, Value};

pub const PLAYERS_DIR: &str = "players";
pub const TEAMS_DIR: &str = "teams";
pub const OPPONENT_FILE_PREFIX: &str = "opp_";
pub const MERGED_FILE_PREFIX: &str = "merged_";

/// Header names an index column may carry when read back.
const INDEX_COLUMNS: &[&str] = &["", "Unnamed: 0"];

#[derive(thiserror::Error, Debug)]
pub enum PersistError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path} is not a valid table: {source}")]
    Schema {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },
}

/// Outcome of writing a whole run.
#[derive(Debug, Default)]
pub struct PersistReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, PersistError)>,
}

impl PersistReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Persister {
    root: PathBuf,
}

impl Persister {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn player_path(&self, category: &str) -> PathBuf {
        self.root.join(PLAYERS_DIR).join(format!("{}.csv", category))
    }

    pub fn team_path(&self, file: &str) -> PathBuf {
        self.root.join(TEAMS_DIR).join(format!("{}.csv", file))
    }

    pub fn opponent_path(&self, id: &str) -> PathBuf {
        self.team_path(&format!("{}{}", OPPONENT_FILE_PREFIX, id))
    }

    pub fn merged_path(&self, id: &str) -> PathBuf {
        self.team_path(&format!("{}{}", MERGED_FILE_PREFIX, id))
    }

    /// Writes every table of `data`. A table that fails to write is logged
    /// and recorded in the report; the remaining tables are still written.
    pub fn write_all(&self, data: &Datasets, rules: &RuleBook) -> PersistReport {
        let mut targets: Vec<(PathBuf, &Table)> = Vec::new();
        for (id, table) in data.players.iter() {
            targets.push((self.player_path(id), table));
        }
        for (id, table) in data.teams.iter() {
            targets.push((self.team_path(&rules.team_file(id)), table));
        }
        for (id, table) in data.opponents.iter() {
            targets.push((self.opponent_path(id), table));
        }
        for (id, table) in data.merged.iter() {
            targets.push((self.merged_path(id), table));
        }

        let mut report = PersistReport::default();
        for (path, table) in targets {
            match write_table(&path, table) {
                Ok(()) => {
                    tracing::info!("wrote {} ({} rows)", path.display(), table.len());
                    report.written.push(path);
                }
                Err(e) => {
                    tracing::error!("failed to write {}: {}", path.display(), e);
                    report.failed.push((path, e));
                }
            }
        }
        report
    }
}

/// Writes one table as CSV with a leading unnamed row index column.
pub fn write_table(path: &Path, table: &Table) -> Result<(), PersistError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| PersistError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let csv_err = |source| PersistError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut wtr = csv::Writer::from_path(path).map_err(csv_err)?;

    let mut header = vec![String::new()];
    header.extend(table.columns().iter().cloned());
    wtr.write_record(&header).map_err(csv_err)?;

    for (idx, row) in table.rows().iter().enumerate() {
        let mut record = vec![idx.to_string()];
        record.extend(row.iter().map(Value::to_string));
        wtr.write_record(&record).map_err(csv_err)?;
    }

    wtr.flush().map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a persisted table back, dropping the index column and inferring
/// column types.
pub fn load_table(path: &Path) -> Result<Table, PersistError> {
    let csv_err = |source| PersistError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = csv::Reader::from_path(path).map_err(csv_err)?;
    let headers = rdr.headers().map_err(csv_err)?.clone();

    let keep: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !INDEX_COLUMNS.contains(h))
        .map(|(i, _)| i)
        .collect();
    let columns = keep.iter().map(|&i| headers[i].to_string()).collect();

    let schema_err = |source| PersistError::Schema {
        path: path.to_path_buf(),
        source,
    };
    let mut table = Table::new(columns).map_err(schema_err)?;
    for result in rdr.records() {
        let record = result.map_err(csv_err)?;
        let row = keep
            .iter()
            .map(|&i| Value::from_cell(record.get(i).unwrap_or("")))
            .collect();
        table.push_row(row).map_err(schema_err)?;
    }

    Ok(table.infer_types())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::load_rules;
    use crate::table::TableSet;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "profootball-persist-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn sample() -> Table {
        let mut t = Table::new(vec!["Tm".into(), "Y/P".into(), "Year".into()]).unwrap();
        t.push_row(vec!["NE".into(), 5.4.into(), 2021i64.into()]).unwrap();
        t.push_row(vec!["BUF".into(), Value::Missing, 2021i64.into()]).unwrap();
        t
    }

    #[test]
    fn write_includes_unnamed_index() {
        let dir = temp_dir("index");
        let path = dir.join("t.csv");
        write_table(&path, &sample()).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(",Tm,Y/P,Year"));
        assert_eq!(lines.next(), Some("0,NE,5.4,2021"));
        assert_eq!(lines.next(), Some("1,BUF,,2021"));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn load_drops_index_and_types_columns() {
        let dir = temp_dir("load");
        let path = dir.join("t.csv");
        write_table(&path, &sample()).unwrap();
        let table = load_table(&path).unwrap();
        assert_eq!(table, sample());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn load_accepts_pandas_index_header() {
        let dir = temp_dir("pandas");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("t.csv");
        fs::write(&path, "Unnamed: 0,Tm,W\n0,NE,10\n").unwrap();
        let table = load_table(&path).unwrap();
        assert_eq!(table.columns(), &["Tm", "W"]);
        assert_eq!(table.get(0, "W"), Some(&Value::Number(10.0)));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn write_all_uses_layout() {
        let dir = temp_dir("layout");
        let rules = load_rules().unwrap();
        let persister = Persister::new(&dir);
        let mut teams = TableSet::new();
        teams.insert("drives", sample());
        let mut merged = TableSet::new();
        merged.insert("team_stats", sample());
        let data = Datasets {
            players: TableSet::new(),
            teams,
            opponents: TableSet::new(),
            merged,
        };

        let report = persister.write_all(&data, &rules);
        assert!(report.is_complete());
        assert!(dir.join("teams/team_drives.csv").exists());
        assert!(dir.join("teams/merged_team_stats.csv").exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn failed_table_does_not_stop_others() {
        let dir = temp_dir("isolate");
        // A directory where the file should go makes that one write fail.
        fs::create_dir_all(dir.join("players/passing.csv")).unwrap();
        let rules = load_rules().unwrap();
        let mut players = TableSet::new();
        players.insert("passing", sample());
        players.insert("rushing", sample());
        let data = Datasets {
            players,
            ..Datasets::default()
        };

        let report = Persister::new(&dir).write_all(&data, &rules);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.written, vec![dir.join("players/rushing.csv")]);
        fs::remove_dir_all(&dir).unwrap();
    }
}
