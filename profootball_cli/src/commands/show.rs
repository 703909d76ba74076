use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use profootball_lib::validation::{self, FIRST_SEASON};
use profootball_lib::{
    load_table, stat_column_types, teams_in_both_years, teams_in_year, Table, TableFilter,
};
use serde::Serialize;

use crate::output::{print_json, render, OutputFormat};

#[derive(Args)]
pub struct ShowArgs {
    /// CSV file written by `scrape` (e.g. data/teams/merged_team_stats.csv)
    pub file: PathBuf,

    /// First season to include
    #[arg(long)]
    pub from: Option<u16>,

    /// Last season to include
    #[arg(long)]
    pub to: Option<u16>,

    /// Filter by team name or abbreviation (exact, case-insensitive)
    #[arg(long)]
    pub team: Option<String>,

    /// Search by player name (substring, case-insensitive)
    #[arg(long)]
    pub player: Option<String>,

    /// List the statistic columns and their types instead of the rows
    #[arg(long)]
    pub columns: bool,

    /// List the teams with rows in one season
    #[arg(long, value_name = "YEAR")]
    pub teams: Option<u16>,

    /// List teams present in both seasons
    #[arg(long, num_args = 2, value_names = ["YEAR", "YEAR"])]
    pub compare: Option<Vec<u16>>,
}

#[derive(Serialize, Debug, PartialEq)]
struct ColumnInfo {
    column: String,
    #[serde(rename = "type")]
    kind: String,
}

fn column_listing(table: &Table) -> Vec<ColumnInfo> {
    stat_column_types(table)
        .into_iter()
        .map(|(column, kind)| ColumnInfo {
            column: column.to_string(),
            kind: kind.to_string(),
        })
        .collect()
}

fn print_lines(items: &[String], format: &OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&items),
        _ => items.iter().for_each(|i| println!("{}", i)),
    }
}

pub fn run(args: &ShowArgs, format: &OutputFormat) -> Result<()> {
    let table = load_table(&args.file)?;

    if args.columns {
        let columns = column_listing(&table);
        match format {
            OutputFormat::Json => print_json(&columns),
            _ => columns
                .iter()
                .for_each(|c| println!("{}\t{}", c.column, c.kind)),
        }
        return Ok(());
    }

    if let Some(year) = args.teams {
        let teams = teams_in_year(&table, validation::validate_year(year)?);
        print_lines(&teams, format);
        return Ok(());
    }

    if let Some(ref years) = args.compare {
        let [a, b] = years.as_slice() else {
            bail!("--compare takes exactly two seasons");
        };
        let teams = teams_in_both_years(
            &table,
            validation::validate_year(*a)?,
            validation::validate_year(*b)?,
        );
        print_lines(&teams, format);
        return Ok(());
    }

    let filter = build_filter(args)?;
    let filtered = filter.apply(table);
    tracing::info!("{}: {} matching rows", args.file.display(), filtered.len());
    render(&filtered, format)
}

fn build_filter(args: &ShowArgs) -> Result<TableFilter> {
    let mut filter = TableFilter::default();

    if args.from.is_some() || args.to.is_some() {
        let from = args.from.unwrap_or(FIRST_SEASON);
        let to = args.to.unwrap_or_else(validation::latest_season);
        validation::validate_year_range(from, to)?;
        filter.years = Some(from..=to);
    }
    if let Some(ref team) = args.team {
        filter.team = Some(validation::validate_team(team)?);
    }
    if let Some(ref player) = args.player {
        filter.player = Some(validation::validate_search(player)?);
    }

    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ShowArgs {
        ShowArgs {
            file: PathBuf::from("data/players/passing.csv"),
            from: None,
            to: None,
            team: None,
            player: None,
            columns: false,
            teams: None,
            compare: None,
        }
    }

    #[test]
    fn test_filter_defaults_match_all() {
        let filter = build_filter(&args()).unwrap();
        assert!(filter.years.is_none());
        assert!(filter.team.is_none());
        assert!(filter.player.is_none());
    }

    #[test]
    fn test_filter_open_ended_years() {
        let mut a = args();
        a.from = Some(2018);
        let filter = build_filter(&a).unwrap();
        let years = filter.years.unwrap();
        assert_eq!(*years.start(), 2018);
        assert_eq!(*years.end(), validation::latest_season());
    }

    #[test]
    fn test_filter_rejects_reversed_years() {
        let mut a = args();
        a.from = Some(2021);
        a.to = Some(2019);
        assert!(build_filter(&a).is_err());
    }

    #[test]
    fn test_column_listing_reports_types() {
        let mut t = Table::new(vec!["Tm".into(), "Year".into(), "Record".into(), "Y/P".into()])
            .unwrap();
        t.push_row(vec!["NE".into(), 2021i64.into(), "10-7".into(), 5.4.into()])
            .unwrap();
        let listing = column_listing(&t);
        assert_eq!(
            listing,
            vec![
                ColumnInfo {
                    column: "Record".into(),
                    kind: "text".into()
                },
                ColumnInfo {
                    column: "Y/P".into(),
                    kind: "numeric".into()
                },
            ]
        );
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json[1]["type"], "numeric");
    }

    #[test]
    fn test_filter_sanitizes_text() {
        let mut a = args();
        a.team = Some(" NWE\x07".into());
        a.player = Some("  brady ".into());
        let filter = build_filter(&a).unwrap();
        assert_eq!(filter.team.as_deref(), Some("NWE"));
        assert_eq!(filter.player.as_deref(), Some("brady"));
    }
}
