use crate::board::{BoardImage, ImageBoard, SearchQuery};
use crate::config::AppConfig;
use crate::error::SearchError;
use crate::group_config::GroupConfig;
use crate::tags::compose_tags;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;

const FULL: &str = "full";
const LARGE: &str = "large";
const MEDIUM: &str = "medium";

/// A picked image, with the tags that found it.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ImageResult {
    pub id: u64,
    pub score: i64,
    pub url: String,
    pub tags: Vec<String>,
}

pub struct SearchEngine {
    board: Arc<dyn ImageBoard>,
    config: Arc<AppConfig>,
}

impl SearchEngine {
    pub fn new(board: Arc<dyn ImageBoard>, config: Arc<AppConfig>) -> Self {
        Self { board, config }
    }

    pub fn effective_tags(&self, group: &GroupConfig, user_raw: &str) -> Vec<String> {
        compose_tags(
            &self.config.default_tags,
            group.use_global_tags,
            &group.custom_tags,
            user_raw,
        )
    }

    pub async fn search(&self, group: &GroupConfig, user_raw: &str) -> Result<ImageResult, SearchError> {
        let tags = self.effective_tags(group, user_raw);
        log::info!("Searching for group {} with tags {:?}", group.group_id, tags);

        let response = self.board.search_images(&SearchQuery::new(tags.clone())).await?;
        if response.total == 0 || response.images.is_empty() {
            log::debug!("No results for tags {:?}", tags);
            return Err(SearchError::NoResults);
        }
        log::debug!(
            "Board reported {} matches, {} candidates on this page",
            response.total,
            response.images.len()
        );

        let image = {
            let mut rng = rand::thread_rng();
            select_image(&response.images, &mut rng)
        }
        .ok_or(SearchError::NoResults)?;

        let url = resolve_url(image)?;
        log::debug!("Picked image {} (score {}) at {}", image.id, image.score, url);

        Ok(ImageResult {
            id: image.id,
            score: image.score,
            url,
            tags,
        })
    }
}

/// Uniform pick over the candidates. Rank only decides who is in the pool.
pub fn select_image<'a, R: Rng + ?Sized>(images: &'a [BoardImage], rng: &mut R) -> Option<&'a BoardImage> {
    if images.is_empty() {
        return None;
    }
    images.get(rng.gen_range(0..images.len()))
}

/// Videos are served at medium size, still images at large.
pub fn resolve_url(image: &BoardImage) -> Result<String, SearchError> {
    let reps = &image.representations;
    let full = reps.get(FULL);
    let wanted = if full.is_some_and(|url| is_video(url)) { MEDIUM } else { LARGE };

    reps.get(wanted)
        .or(full)
        .cloned()
        .ok_or_else(|| SearchError::InvalidResponse(format!("image {} has no usable representation", image.id)))
}

/// Whether the URL's file extension names a video format.
pub fn is_video(url: &str) -> bool {
    let path = url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    mime_guess::from_path(path)
        .first()
        .is_some_and(|m| m.type_() == mime::VIDEO)
}
