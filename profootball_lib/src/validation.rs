use chrono::{Datelike, Utc};

use crate::error::StatsError;

pub const MAX_SEARCH_LENGTH: usize = 100;
pub const MAX_TEAM_LENGTH: usize = 40;

/// First season the site publishes league tables for.
pub const FIRST_SEASON: u16 = 1920;

/// Strip ASCII control characters (0x00-0x1F except space 0x20), trim whitespace,
/// and enforce a byte-length limit.
pub fn sanitize_text(input: &str, max_len: usize) -> Result<String, StatsError> {
    if input.len() > max_len {
        return Err(StatsError::InvalidInput(format!(
            "input exceeds maximum length of {} bytes",
            max_len
        )));
    }
    let sanitized: String = input
        .chars()
        .filter(|c| !c.is_ascii_control() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string();
    if sanitized.is_empty() {
        return Err(StatsError::InvalidInput(
            "input is empty after sanitization".to_string(),
        ));
    }
    Ok(sanitized)
}

/// Validate a player name search: enforce length, strip control chars, trim.
pub fn validate_search(input: &str) -> Result<String, StatsError> {
    sanitize_text(input, MAX_SEARCH_LENGTH)
}

/// Validate a team filter (name or abbreviation).
pub fn validate_team(input: &str) -> Result<String, StatsError> {
    sanitize_text(input, MAX_TEAM_LENGTH)
}

/// Latest season that can have started: the current calendar year.
pub fn latest_season() -> u16 {
    Utc::now().year().clamp(FIRST_SEASON as i32, u16::MAX as i32) as u16
}

/// Validate a single season year.
pub fn validate_year(year: u16) -> Result<u16, StatsError> {
    let last = latest_season();
    if !(FIRST_SEASON..=last).contains(&year) {
        return Err(StatsError::InvalidInput(format!(
            "season must be between {} and {}, got {}",
            FIRST_SEASON, last, year
        )));
    }
    Ok(year)
}

/// Validate an inclusive season range and return its years in ascending order.
pub fn validate_year_range(from: u16, to: u16) -> Result<Vec<u16>, StatsError> {
    validate_year(from)?;
    validate_year(to)?;
    if from > to {
        return Err(StatsError::InvalidInput(format!(
            "--from ({}) must not be after --to ({})",
            from, to
        )));
    }
    Ok((from..=to).collect())
}
