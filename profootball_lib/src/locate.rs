//! Table location inside fetched pages.
//!
//! Opponent and team-defense pages ship most of their tables inside HTML
//! comments, so a page can be parsed in "commented" mode where the comment
//! markers are stripped before parsing and the hidden tables become real
//! elements.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static SELECTOR_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("Invalid table selector"));
static SELECTOR_TR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("Invalid tr selector"));
static COMMENT_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("<!--|-->").expect("Invalid comment regex"));

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LocateError {
    #[error("no table matching {0} on page")]
    NotFound(TableStrategy),
}

/// How to pick a table out of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStrategy {
    /// The table whose `id` attribute equals the identifier.
    ByIdentifier(String),
    /// The n-th table on the page, in document order.
    Positional(usize),
}

impl std::fmt::Display for TableStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ByIdentifier(id) => write!(f, "id {:?}", id),
            Self::Positional(idx) => write!(f, "position {}", idx),
        }
    }
}

/// Table section a row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Head,
    Body,
    Foot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawCell {
    /// Cell text, trimmed of surrounding whitespace.
    pub text: String,
    /// True for `th` cells, false for `td`.
    pub header: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub section: Section,
    pub cells: Vec<RawCell>,
}

/// Every row of a located table, in page order, before any header handling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub id: Option<String>,
    pub rows: Vec<RawRow>,
}

/// A parsed page, ready for any number of table lookups.
pub struct Page {
    document: Html,
}

impl Page {
    /// Parses markup. With `commented` set, `<!--` and `-->` are removed first
    /// so comment-hidden tables become part of the tree.
    pub fn parse(markup: &str, commented: bool) -> Self {
        let document = if commented {
            Html::parse_document(&strip_comment_markers(markup))
        } else {
            Html::parse_document(markup)
        };
        Self { document }
    }

    pub fn locate(&self, strategy: &TableStrategy) -> Result<RawTable, LocateError> {
        let mut tables = self.document.select(&SELECTOR_TABLE);
        let found = match strategy {
            TableStrategy::ByIdentifier(id) => tables.find(|t| t.value().id() == Some(id.as_str())),
            TableStrategy::Positional(idx) => tables.nth(*idx),
        };
        found
            .map(read_table)
            .ok_or_else(|| LocateError::NotFound(strategy.clone()))
    }

}

/// One-shot parse and lookup.
pub fn locate(
    markup: &str,
    strategy: &TableStrategy,
    commented: bool,
) -> Result<RawTable, LocateError> {
    Page::parse(markup, commented).locate(strategy)
}

pub fn strip_comment_markers(markup: &str) -> String {
    COMMENT_MARKERS.replace_all(markup, "").into_owned()
}

fn read_table(table: ElementRef<'_>) -> RawTable {
    let rows = table
        .select(&SELECTOR_TR)
        .filter(|tr| belongs_to(*tr, table))
        .map(|tr| RawRow {
            section: section_of(tr),
            cells: tr
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|c| matches!(c.value().name(), "th" | "td"))
                .map(|c| RawCell {
                    text: c.text().collect::<String>().trim().to_string(),
                    header: c.value().name() == "th",
                })
                .collect(),
        })
        .collect();

    RawTable {
        id: table.value().id().map(str::to_string),
        rows,
    }
}

/// Rows of nested tables are not attributed to the outer one.
fn belongs_to(tr: ElementRef<'_>, table: ElementRef<'_>) -> bool {
    tr.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "table")
        .is_some_and(|el| el.id() == table.id())
}

fn section_of(tr: ElementRef<'_>) -> Section {
    let parent = tr
        .parent()
        .and_then(ElementRef::wrap)
        .map(|p| p.value().name().to_string());
    match parent.as_deref() {
        Some("thead") => Section::Head,
        Some("tfoot") => Section::Foot,
        _ => Section::Body,
    }
}
