//! Year-by-year driver: a fold of per-season extraction over a year range.

use crate::error::StatsError;
use crate::extract::Extractor;
use crate::merge::{merge, TEAM_KEY};
use crate::normalize::clean;
use crate::rules::RuleBook;
use crate::table::TableSet;

const PLAYER_KEY: &str = "Player";

/// Tables accumulated over the seasons processed so far.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub players: TableSet,
    pub teams: TableSet,
    pub opponents: TableSet,
    pub years: Vec<u16>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one season's tables below the running tables.
    pub fn absorb(
        mut self,
        year: u16,
        players: TableSet,
        teams: TableSet,
        opponents: TableSet,
    ) -> Self {
        for (id, table) in players {
            self.players.append(&id, table);
        }
        for (id, table) in teams {
            self.teams.append(&id, table);
        }
        for (id, table) in opponents {
            self.opponents.append(&id, table);
        }
        self.years.push(year);
        self
    }
}

/// Final tables of a run, ready to persist.
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    pub players: TableSet,
    pub teams: TableSet,
    pub opponents: TableSet,
    pub merged: TableSet,
}

pub struct Pipeline {
    extractor: Extractor,
}

impl Pipeline {
    pub fn new(extractor: Extractor) -> Self {
        Self { extractor }
    }

    pub fn rules(&self) -> &RuleBook {
        self.extractor.rules()
    }

    /// Extracts every player category and the team/opponent tables of one
    /// season and folds them into `state`. Any failure aborts the run.
    pub async fn process_year(
        &self,
        state: PipelineState,
        year: u16,
    ) -> Result<PipelineState, StatsError> {
        tracing::info!("processing {}", year);

        let mut players = TableSet::new();
        for category in self.rules().player_categories() {
            let table = self.extractor.player_category(year, category).await?;
            players.insert(category, table);
        }

        let (teams, opponents) = self.extractor.team_and_opponent(year).await?;
        Ok(state.absorb(year, players, teams, opponents))
    }

    /// Runs [`Pipeline::process_year`] over `years` in order, then [`finish`].
    pub async fn run(&self, years: impl IntoIterator<Item = u16>) -> Result<Datasets, StatsError> {
        let mut state = PipelineState::new();
        for year in years {
            state = self.process_year(state, year).await?;
        }
        finish(state, self.rules())
    }
}

/// Drops spacer rows, re-infers column types over the whole range and merges
/// team tables with their opponent counterparts.
pub fn finish(state: PipelineState, rules: &RuleBook) -> Result<Datasets, StatsError> {
    let players = finalize(state.players, PLAYER_KEY)?;
    let teams = finalize(state.teams, TEAM_KEY)?;
    let opponents = finalize(state.opponents, TEAM_KEY)?;
    let merged = merge(&teams, &opponents, &rules.merged_ids())?;

    tracing::info!(
        "finished {} seasons: {} player, {} team, {} opponent, {} merged tables",
        state.years.len(),
        players.len(),
        teams.len(),
        opponents.len(),
        merged.len()
    );

    Ok(Datasets {
        players,
        teams,
        opponents,
        merged,
    })
}

fn finalize(tables: TableSet, key: &str) -> Result<TableSet, StatsError> {
    let mut out = TableSet::new();
    for (id, table) in tables {
        let table = clean(table.drop_missing(key))?;
        out.insert(&id, table);
    }
    Ok(out)
}
