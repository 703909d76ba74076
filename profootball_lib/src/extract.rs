//! Per-season extraction: fetch a page, locate its tables, normalize them.
//!
//! The network half lives on [`Extractor`]; the parsing half is exposed as
//! plain functions over markup so it can be exercised against fixture pages.

use profootball_api::Client;

use crate::error::{ResultExt, StatsError};
use crate::locate::{Page, TableStrategy};
use crate::normalize::normalize;
use crate::rules::{PageKind, Resolution, RuleBook, TableRule};
use crate::table::{Table, TableSet, Value};

/// Characters the site appends to player names to mark honors
/// (`*` Pro Bowl, `+` First-Team All-Pro).
const HONOR_MARKS: &[char] = &['*', '+'];

pub struct Extractor {
    client: Client,
    rules: RuleBook,
}

impl Extractor {
    pub fn new(client: Client, rules: RuleBook) -> Self {
        Self { client, rules }
    }

    pub fn rules(&self) -> &RuleBook {
        &self.rules
    }

    /// Fetches and normalizes one player leaderboard for one season.
    pub async fn player_category(&self, year: u16, category: &str) -> Result<Table, StatsError> {
        let rule = match self.rules.resolve(PageKind::Player, category, year) {
            Resolution::Applies(rule) => rule,
            Resolution::NotTracked => {
                tracing::info!("{} {}: not tracked that season, skipping", year, category);
                return Ok(Table::empty());
            }
            Resolution::Unknown => {
                return Err(StatsError::InvalidInput(format!(
                    "unknown player category '{}'",
                    category
                )))
            }
        };

        let markup = self
            .client
            .player_page(year, category)
            .await
            .in_table(year, category)?;
        player_table(&markup, &self.rules, rule, year)
    }

    /// Fetches the season index and the opponent page and normalizes every
    /// team-side and opponent-side table on them.
    pub async fn team_and_opponent(&self, year: u16) -> Result<(TableSet, TableSet), StatsError> {
        let season = self
            .client
            .season_page(year)
            .await
            .in_table(year, "index")?;
        let opponent = self
            .client
            .opponent_page(year)
            .await
            .in_table(year, "opp")?;

        let teams = page_tables(&season, &self.rules, PageKind::Team, year)?;
        let opponents = page_tables(&opponent, &self.rules, PageKind::Opponent, year)?;
        Ok((teams, opponents))
    }
}

/// Normalizes the first table of a player leaderboard page and tags it with
/// the season. Honor marks are stripped from player names; positions are
/// cleaned when the rule asks for it.
pub fn player_table(
    markup: &str,
    rules: &RuleBook,
    rule: &TableRule,
    year: u16,
) -> Result<Table, StatsError> {
    let page = Page::parse(markup, false);
    let raw = page
        .locate(&TableStrategy::Positional(0))
        .in_table(year, &rule.id)?;
    let table = normalize(&raw, rule, &rules.removal_keys(rule)).in_table(year, &rule.id)?;

    let mut table = table
        .with_constant("Year", Value::from(year as i64))
        .map_column("Player", |v| match v {
            Value::Text(name) => Value::from_cell(name.trim_matches(HONOR_MARKS)),
            other => other.clone(),
        });
    if rule.normalize_position {
        table = table.map_column("Pos", |v| match v {
            Value::Text(pos) => Value::from_cell(pos.to_uppercase().trim_matches('/')),
            other => other.clone(),
        });
    }

    tracing::info!("{} {}: {} player rows", year, rule.id, table.len());
    Ok(table)
}

/// Normalizes every table the rule book lists for `kind` from one page.
/// Tables the site did not track that season come back empty.
pub fn page_tables(
    markup: &str,
    rules: &RuleBook,
    kind: PageKind,
    year: u16,
) -> Result<TableSet, StatsError> {
    let page = Page::parse(markup, true);
    let mut tables = TableSet::new();

    for id in rules.ids(kind) {
        let rule = match rules.resolve(kind, id, year) {
            Resolution::Applies(rule) => rule,
            Resolution::NotTracked | Resolution::Unknown => {
                tracing::info!("{} {:?} {}: not tracked that season", year, kind, id);
                tables.insert(id, Table::empty());
                continue;
            }
        };

        let raw = page
            .locate(&TableStrategy::ByIdentifier(id.to_string()))
            .in_table(year, id)?;
        let table = normalize(&raw, rule, &rules.removal_keys(rule))
            .in_table(year, id)?
            .with_constant("Year", Value::from(year as i64));

        tracing::info!("{} {:?} {}: {} rows", year, kind, id, table.len());
        tables.insert(id, table);
    }

    Ok(tables)
}
