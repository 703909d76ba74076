//! CLI subcommand implementations.

pub mod scrape;
pub mod show;
