//! Error types for the library layer.

use std::fmt;

use crate::locate::LocateError;
use crate::merge::MergeError;
use crate::persist::PersistError;
use crate::rules::RuleError;
use crate::table::SchemaError;

/// Errors produced by the library layer, wrapping fetch failures and the
/// locate / normalize / merge / persist failures of the pipeline.
#[derive(Debug)]
pub enum StatsError {
    /// A page could not be fetched.
    Fetch(profootball_api::Error),
    /// An expected table is not on the page.
    NotFound(LocateError),
    /// A table's layout does not match its rule; the site likely changed.
    Schema(SchemaError),
    /// Team and opponent tables do not cover the same (team, year) keys.
    Merge(MergeError),
    /// An output file could not be written or read.
    Persist(PersistError),
    /// The embedded rule table is invalid.
    Rules(RuleError),
    /// User-provided input failed validation.
    InvalidInput(String),
    /// A failure tied to one season and table.
    Context {
        year: u16,
        table: String,
        source: Box<StatsError>,
    },
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "Fetch error: {}", e),
            Self::NotFound(e) => write!(f, "Table not found: {}", e),
            Self::Schema(e) => write!(f, "Schema error: {}", e),
            Self::Merge(e) => write!(f, "Merge error: {}", e),
            Self::Persist(e) => write!(f, "Persist error: {}", e),
            Self::Rules(e) => write!(f, "Rule table error: {}", e),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Self::Context {
                year,
                table,
                source,
            } => write!(f, "{} {}: {}", year, table, source),
        }
    }
}

impl std::error::Error for StatsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fetch(e) => Some(e),
            Self::NotFound(e) => Some(e),
            Self::Schema(e) => Some(e),
            Self::Merge(e) => Some(e),
            Self::Persist(e) => Some(e),
            Self::Rules(e) => Some(e),
            Self::Context { source, .. } => Some(source.as_ref()),
            Self::InvalidInput(_) => None,
        }
    }
}

impl StatsError {
    /// The innermost error, with any year/table context peeled off.
    pub fn root(&self) -> &StatsError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<profootball_api::Error> for StatsError {
    fn from(e: profootball_api::Error) -> Self {
        Self::Fetch(e)
    }
}

impl From<LocateError> for StatsError {
    fn from(e: LocateError) -> Self {
        Self::NotFound(e)
    }
}

impl From<SchemaError> for StatsError {
    fn from(e: SchemaError) -> Self {
        Self::Schema(e)
    }
}

impl From<MergeError> for StatsError {
    fn from(e: MergeError) -> Self {
        Self::Merge(e)
    }
}

impl From<PersistError> for StatsError {
    fn from(e: PersistError) -> Self {
        Self::Persist(e)
    }
}

impl From<RuleError> for StatsError {
    fn from(e: RuleError) -> Self {
        Self::Rules(e)
    }
}

/// Attaches season and table context to a failure.
pub trait ResultExt<T> {
    fn in_table(self, year: u16, table: &str) -> Result<T, StatsError>;
}

impl<T, E: Into<StatsError>> ResultExt<T> for Result<T, E> {
    fn in_table(self, year: u16, table: &str) -> Result<T, StatsError> {
        self.map_err(|e| StatsError::Context {
            year,
            table: table.to_string(),
            source: Box::new(e.into()),
        })
    }
}
