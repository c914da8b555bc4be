use serde_json::Error as SerdeJsonError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] SerdeJsonError),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Outcome of a failed search, kept apart from infrastructure errors so the
/// command layer decides how each one reads in chat.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("No images found for these tags.")]
    NoResults,

    /// Network failure, timeout, or a non-404 error status. Carries the
    /// board's own message when it sent one.
    #[error("{0}")]
    Transport(String),

    #[error("Unexpected response from the image board: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            log::warn!("Image board request timed out: {}", e);
            SearchError::Transport(format!("Request to the image board timed out: {}", e))
        } else {
            SearchError::Transport(format!("Request to the image board failed: {}", e))
        }
    }
}
