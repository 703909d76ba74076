//! Library layer for profootball: scrapes season pages, normalizes their
//! tables, merges team and opponent statistics and persists them as CSV.
//!
//! Wraps the `profootball_api` fetcher with a declarative table rule book,
//! a comment-aware table locator, and the read-side helpers used by
//! consumers of the written files.

pub mod error;
pub mod extract;
pub mod locate;
pub mod merge;
pub mod normalize;
pub mod persist;
pub mod pipeline;
pub mod query;
pub mod rules;
pub mod table;
pub mod validation;

pub use profootball_api;
pub use profootball_api::Client;

pub use error::{ResultExt, StatsError};
pub use extract::Extractor;
pub use locate::{locate, LocateError, Page, TableStrategy};
pub use merge::MergeError;
pub use persist::{load_table, PersistError, PersistReport, Persister};
pub use pipeline::{finish, Datasets, Pipeline, PipelineState};
pub use query::{stat_column_types, stat_columns, teams_in_both_years, teams_in_year, TableFilter};
pub use rules::{load_rules, PageKind, RuleBook, RuleError};
pub use table::{ColumnType, SchemaError, Table, TableSet, Value};
