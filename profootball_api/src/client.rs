//! HTTP client for the pro-football-reference statistics pages.

use std::time::Duration;

use url::Url;

use crate::{user_agent::get_user_agent, Error};

/// Request timeout for a single page fetch.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the statistics site.
///
/// Sends browser-like headers and a user agent from a fixed pool so the site
/// does not reject the request as an obvious bot. There is no retry: any
/// transport failure or non-success status is returned to the caller.
pub struct Client {
    /// Base URL for the site. Defaults to `https://www.pro-football-reference.com`.
    base_url: String,
    http: reqwest::Client,
}

impl Client {
    /// Creates a new client pointing at the production site.
    pub fn new() -> Result<Self, Error> {
        Self::with_base_url("https://www.pro-football-reference.com")
    }

    /// Creates a new client with a custom base URL. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(get_user_agent())
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                Error::RequestFailed {
                    url: base_url.to_string(),
                }
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_url(&self, path: &str) -> Result<Url, Error> {
        let raw = format!("{}{}", self.base_url, path);
        Url::parse(&raw).map_err(|e| {
            tracing::error!("Invalid URL constructed: {}", e);
            Error::InvalidUrl(raw)
        })
    }

    /// Fetches the markup at `path` (relative to the base URL).
    pub async fn fetch(&self, path: &str) -> Result<String, Error> {
        let url = self.get_url(path)?;
        tracing::debug!("GET {}", url);

        let resp = self
            .http
            .get(url.clone())
            .header("accept", "text/html,application/xhtml+xml")
            .header("accept-language", "en-US,en;q=0.9")
            .header("upgrade-insecure-requests", "1")
            .header("cache-control", "no-cache")
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to get {}: {}", url, e);
                Error::RequestFailed {
                    url: url.to_string(),
                }
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| {
            tracing::error!("Failed to read response body from {}: {}", url, e);
            Error::RequestFailed {
                url: url.to_string(),
            }
        })?;

        if !status.is_success() {
            let snippet = truncate_body(&body);
            tracing::error!("Request to {} failed with status {}", url, status);
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
                body: snippet,
            });
        }

        Ok(body)
    }

    /// Fetches the player leaderboard page for one statistical category.
    pub async fn player_page(&self, year: u16, category: &str) -> Result<String, Error> {
        self.fetch(&format!("/years/{}/{}.htm", year, category))
            .await
    }

    /// Fetches the season index page: team offense tables and AFC/NFC standings.
    pub async fn season_page(&self, year: u16) -> Result<String, Error> {
        self.fetch(&format!("/years/{}/", year)).await
    }

    /// Fetches the opponent (team defense) page for a season.
    pub async fn opponent_page(&self, year: u16) -> Result<String, Error> {
        self.fetch(&format!("/years/{}/opp.htm", year)).await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &body[..end])
    }
}
