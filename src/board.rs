use crate::error::SearchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const PER_PAGE: u32 = 50;

/// Body of a Philomena `search/images` response.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SearchResponse {
    pub total: u64,
    #[serde(default)]
    pub images: Vec<BoardImage>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BoardImage {
    pub id: u64,
    pub score: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Size name (`full`, `large`, `medium`, ...) to URL.
    #[serde(default)]
    pub representations: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub tags: Vec<String>,
}

impl SearchQuery {
    pub fn new(tags: Vec<String>) -> Self {
        Self { tags }
    }

    /// Query string pairs, best score first, one page of `PER_PAGE`.
    pub fn to_params(&self, api_key: Option<&str>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", self.tags.join(",")),
            ("sf", "score".to_string()),
            ("sd", "desc".to_string()),
            ("per_page", PER_PAGE.to_string()),
        ];
        if let Some(key) = api_key {
            params.push(("key", key.to_string()));
        }
        params
    }
}

#[async_trait]
pub trait ImageBoard: Send + Sync {
    async fn search_images(&self, query: &SearchQuery) -> Result<SearchResponse, SearchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_join_tags_and_fix_sorting() {
        let query = SearchQuery::new(vec!["safe".into(), "pinkie pie".into()]);
        let params = query.to_params(None);
        assert_eq!(
            params,
            vec![
                ("q", "safe,pinkie pie".to_string()),
                ("sf", "score".to_string()),
                ("sd", "desc".to_string()),
                ("per_page", "50".to_string()),
            ]
        );
    }

    #[test]
    fn key_only_when_configured() {
        let query = SearchQuery::new(vec!["safe".into()]);
        let params = query.to_params(Some("secret"));
        assert_eq!(params.last(), Some(&("key", "secret".to_string())));
    }

    #[test]
    fn decodes_board_payload() {
        let body = r#"{
            "total": 1,
            "images": [{
                "id": 42,
                "score": 310,
                "tags": ["safe", "cute"],
                "representations": {"full": "https://x/full.png", "large": "https://x/large.png"},
                "width": 800
            }],
            "interactions": []
        }"#;
        let response: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.total, 1);
        assert_eq!(response.images[0].id, 42);
        assert_eq!(response.images[0].representations["large"], "https://x/large.png");
    }
}
