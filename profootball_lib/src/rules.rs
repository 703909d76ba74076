//! Declarative header/footer rules for every scraped table.
//!
//! The site's tables differ in where the column labels sit, how many rows
//! precede the data and which footer rows must go, and a few tables only
//! exist from a given season on. All of that lives in
//! `seed_data/table_rules.yml`, embedded at compile time, so a new layout
//! quirk is a data change. Follows the same `include_str!` pattern as the
//! other seed data files.

use serde::Deserialize;
use thiserror::Error;

/// Error types for rule table loading.
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Failed to parse table rules YAML: {0}")]
    YamlParse(#[from] serde_yml::Error),
    #[error(
        "Rule {page:?}/{id}: header row {header_row} is not before the first data row {skip_rows}"
    )]
    HeaderAfterData {
        page: PageKind,
        id: String,
        header_row: usize,
        skip_rows: usize,
    },
    #[error("Rule {page:?}/{id}: key column is empty")]
    EmptyKey { page: PageKind, id: String },
    #[error("Rule {page:?}/{id}: since {since} is after until {until}")]
    InvalidBounds {
        page: PageKind,
        id: String,
        since: u16,
        until: u16,
    },
    #[error("Rules for {page:?}/{id} overlap in season coverage")]
    Overlap { page: PageKind, id: String },
}

/// Which page a table lives on.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    /// `/years/{year}/{category}.htm`, one leaderboard per page.
    Player,
    /// `/years/{year}/`, team offense tables and conference standings.
    Team,
    /// `/years/{year}/opp.htm`, what opponents did against each team.
    Opponent,
}

/// Which cells of a row count as columns.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CellMode {
    /// Every `th` and `td` cell.
    #[default]
    All,
    /// Only `td` cells. The rank column is a `th` in every data row, so the
    /// first header label is dropped with it.
    Data,
}

/// Layout rule for one table.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct TableRule {
    pub page: PageKind,
    pub id: String,
    pub header_row: usize,
    pub skip_rows: usize,
    #[serde(default)]
    pub cells: CellMode,
    /// Identity column used for footer removal and, on team pages, the merge key.
    pub key: String,
    #[serde(default)]
    pub since: Option<u16>,
    #[serde(default)]
    pub until: Option<u16>,
    /// Rows to drop in addition to the summary rows.
    #[serde(default)]
    pub drop_rows: Vec<String>,
    /// Output file stem, when it differs from the id.
    #[serde(default)]
    pub file: Option<String>,
    /// Uppercase the `Pos` column and strip surrounding `/`.
    #[serde(default)]
    pub normalize_position: bool,
}

impl TableRule {
    pub fn covers(&self, year: u16) -> bool {
        self.since.map_or(true, |s| year >= s) && self.until.map_or(true, |u| year <= u)
    }

    fn overlaps(&self, other: &TableRule) -> bool {
        let lo = self.since.unwrap_or(u16::MIN).max(other.since.unwrap_or(u16::MIN));
        let hi = self.until.unwrap_or(u16::MAX).min(other.until.unwrap_or(u16::MAX));
        lo <= hi
    }
}

/// Outcome of a rule lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution<'a> {
    Applies(&'a TableRule),
    /// The table is known but the site did not track it that season.
    NotTracked,
    Unknown,
}

/// Top-level structure for the rules YAML file.
#[derive(Deserialize, Debug)]
struct RuleFile {
    #[serde(default)]
    summary_rows: Vec<String>,
    tables: Vec<TableRule>,
}

#[derive(Debug, Clone)]
pub struct RuleBook {
    summary_rows: Vec<String>,
    tables: Vec<TableRule>,
}

impl RuleBook {
    pub fn resolve(&self, page: PageKind, id: &str, year: u16) -> Resolution<'_> {
        let mut known = false;
        for rule in self.tables.iter().filter(|r| r.page == page && r.id == id) {
            known = true;
            if rule.covers(year) {
                return Resolution::Applies(rule);
            }
        }
        if known {
            Resolution::NotTracked
        } else {
            Resolution::Unknown
        }
    }

    /// Labels of rows that are not data: the summary rows on team and
    /// opponent pages plus the rule's own extras.
    pub fn removal_keys<'a>(&'a self, rule: &'a TableRule) -> Vec<&'a str> {
        let summary = match rule.page {
            PageKind::Player => &[][..],
            PageKind::Team | PageKind::Opponent => &self.summary_rows[..],
        };
        summary
            .iter()
            .chain(rule.drop_rows.iter())
            .map(String::as_str)
            .collect()
    }

    /// Distinct table ids of one page, in file order.
    pub fn ids(&self, page: PageKind) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for rule in self.tables.iter().filter(|r| r.page == page) {
            if !ids.contains(&rule.id.as_str()) {
                ids.push(&rule.id);
            }
        }
        ids
    }

    pub fn player_categories(&self) -> Vec<&str> {
        self.ids(PageKind::Player)
    }

    pub fn team_ids(&self) -> Vec<&str> {
        self.ids(PageKind::Team)
    }

    pub fn opponent_ids(&self) -> Vec<&str> {
        self.ids(PageKind::Opponent)
    }

    /// Tables present on both the team and the opponent page, in team order.
    pub fn merged_ids(&self) -> Vec<&str> {
        let opponent = self.opponent_ids();
        self.team_ids()
            .into_iter()
            .filter(|id| opponent.contains(id))
            .collect()
    }

    /// Output file stem for a team-page table.
    pub fn team_file(&self, id: &str) -> String {
        self.tables
            .iter()
            .find(|r| r.page == PageKind::Team && r.id == id)
            .and_then(|r| r.file.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

/// Parse and validate rules from YAML content.
pub fn parse_rules(yaml_content: &str) -> Result<RuleBook, RuleError> {
    let file: RuleFile = serde_yml::from_str(yaml_content)?;

    for (i, rule) in file.tables.iter().enumerate() {
        if rule.header_row >= rule.skip_rows {
            return Err(RuleError::HeaderAfterData {
                page: rule.page,
                id: rule.id.clone(),
                header_row: rule.header_row,
                skip_rows: rule.skip_rows,
            });
        }
        if rule.key.trim().is_empty() {
            return Err(RuleError::EmptyKey {
                page: rule.page,
                id: rule.id.clone(),
            });
        }
        if let (Some(since), Some(until)) = (rule.since, rule.until) {
            if since > until {
                return Err(RuleError::InvalidBounds {
                    page: rule.page,
                    id: rule.id.clone(),
                    since,
                    until,
                });
            }
        }
        let clash = file.tables[..i]
            .iter()
            .any(|r| r.page == rule.page && r.id == rule.id && r.overlaps(rule));
        if clash {
            return Err(RuleError::Overlap {
                page: rule.page,
                id: rule.id.clone(),
            });
        }
    }

    Ok(RuleBook {
        summary_rows: file.summary_rows,
        tables: file.tables,
    })
}

/// Load the rule table from the embedded YAML file.
pub fn load_rules() -> Result<RuleBook, RuleError> {
    let yaml_content = include_str!("../../seed_data/table_rules.yml");
    parse_rules(yaml_content)
}
