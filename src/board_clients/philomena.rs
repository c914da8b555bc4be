use crate::board::{ImageBoard, SearchQuery, SearchResponse};
use crate::config::AppConfig;
use crate::error::{AppError, SearchError};
use async_trait::async_trait;
use reqwest::{Client, Request, StatusCode};
use std::time::Duration;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct PhilomenaClient {
    http: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl PhilomenaClient {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        log::debug!("Creating Philomena client for URL: {}", config.api_url);
        let endpoint = Url::parse(&config.api_url)?;
        let http = Client::builder()
            .user_agent(concat!("philomena-search/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            endpoint,
            api_key: config.api_key().map(str::to_string),
        })
    }

    /// GET on the search endpoint with the query string and a hard timeout.
    pub(crate) fn build_request(&self, query: &SearchQuery) -> Result<Request, reqwest::Error> {
        self.http
            .get(self.endpoint.clone())
            .query(&query.to_params(self.api_key.as_deref()))
            .timeout(REQUEST_TIMEOUT)
            .build()
    }
}

#[async_trait]
impl ImageBoard for PhilomenaClient {
    async fn search_images(&self, query: &SearchQuery) -> Result<SearchResponse, SearchError> {
        log::debug!("Searching {} for tags: {:?}", self.endpoint, query.tags);

        let request = self.build_request(query)?;
        let response = self.http.execute(request).await?;

        let status = response.status();
        let body = response.text().await?;
        log::trace!("Board responded {} with {} bytes", status, body.len());

        interpret_response(status, &body)
    }
}

/// Maps a board reply to a search outcome. A 404 counts as no results, like
/// an empty result set.
pub(crate) fn interpret_response(status: StatusCode, body: &str) -> Result<SearchResponse, SearchError> {
    if status == StatusCode::NOT_FOUND {
        log::debug!("Board returned 404, treating as no results");
        return Err(SearchError::NoResults);
    }
    if !status.is_success() {
        let message = board_error_message(body).unwrap_or_else(|| format!("Image board returned {}", status));
        log::warn!("Board request failed with {}: {}", status, message);
        return Err(SearchError::Transport(message));
    }

    serde_json::from_str(body).map_err(|e| SearchError::InvalidResponse(e.to_string()))
}

/// Philomena reports failures as `{"error": "..."}`. Plain-text bodies are
/// passed through as they are.
fn board_error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => value
            .get("error")
            .and_then(|e| e.as_str())
            .map(str::to_string)
            .or_else(|| Some(body.to_string())),
        Err(_) => Some(body.to_string()),
    }
}
