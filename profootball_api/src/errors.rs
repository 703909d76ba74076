//! Error types for the page fetcher.

/// Errors that can occur when fetching a statistics page.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The base URL and path did not form a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// The request never produced a response (connection failure, timeout, unreadable body).
    #[error("Request to {url} failed")]
    RequestFailed { url: String },
    /// The site answered with a non-success status.
    #[error("Request to {url} failed with status {status}")]
    HttpStatus {
        status: u16,
        url: String,
        body: String,
    },
}
