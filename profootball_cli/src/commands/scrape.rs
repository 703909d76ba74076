//! `scrape`: fetch a range of seasons, merge team and opponent tables, write CSV files.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use profootball_lib::{
    finish, load_rules, validation, Client, Extractor, PersistReport, Persister, Pipeline,
    PipelineState,
};
use serde::Serialize;

use crate::output::{print_json, OutputFormat};

#[derive(Args)]
pub struct ScrapeArgs {
    /// First season to scrape
    #[arg(long)]
    pub from: u16,

    /// Last season to scrape (inclusive)
    #[arg(long)]
    pub to: u16,

    /// Directory the players/ and teams/ tables are written under
    #[arg(long, default_value = "data")]
    pub out_dir: PathBuf,

    /// Override the site base URL
    #[arg(long)]
    pub base_url: Option<String>,
}

#[derive(Serialize)]
struct ScrapeSummary {
    seasons: Vec<u16>,
    written: Vec<String>,
    failed: Vec<FailedWrite>,
}

#[derive(Serialize)]
struct FailedWrite {
    path: String,
    error: String,
}

impl ScrapeSummary {
    fn new(seasons: Vec<u16>, report: &PersistReport) -> Self {
        Self {
            seasons,
            written: report
                .written
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            failed: report
                .failed
                .iter()
                .map(|(p, e)| FailedWrite {
                    path: p.display().to_string(),
                    error: e.to_string(),
                })
                .collect(),
        }
    }
}

pub async fn run(args: &ScrapeArgs, format: &OutputFormat) -> Result<()> {
    let years = validation::validate_year_range(args.from, args.to)?;

    let client = match args.base_url {
        Some(ref url) => Client::with_base_url(url)?,
        None => Client::new()?,
    };
    let pipeline = Pipeline::new(Extractor::new(client, load_rules()?));

    let pb = ProgressBar::new(years.len() as u64);
    pb.set_style(ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}/{len:3} {msg}",
    )?);

    let mut state = PipelineState::new();
    for &year in &years {
        pb.set_message(format!("season {}", year));
        state = match pipeline.process_year(state, year).await {
            Ok(state) => state,
            Err(e) => {
                pb.abandon_with_message(format!("failed at season {}", year));
                return Err(e.into());
            }
        };
        pb.inc(1);
    }
    pb.finish_with_message("all seasons fetched");

    let data = finish(state, pipeline.rules())?;
    let report = Persister::new(&args.out_dir).write_all(&data, pipeline.rules());
    let summary = ScrapeSummary::new(years, &report);

    match format {
        OutputFormat::Json => print_json(&summary),
        _ => {
            eprintln!(
                "Wrote {} tables for {} season(s) to {}",
                summary.written.len(),
                summary.seasons.len(),
                args.out_dir.display()
            );
            for failed in &summary.failed {
                eprintln!("  failed: {} ({})", failed.path, failed.error);
            }
        }
    }

    if !report.is_complete() {
        bail!("{} table(s) could not be written", report.failed.len());
    }
    Ok(())
}
