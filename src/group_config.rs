use crate::config::AppConfig;
use crate::error::AppError;
use crate::store::GroupConfigRepo;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GroupConfig {
    pub group_id: String,
    pub enabled: bool,
    pub use_global_tags: bool,
    pub custom_tags: Vec<String>,
}

/// Partial update for a `GroupConfig`. `None` leaves a field untouched.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct GroupConfigPatch {
    pub enabled: Option<bool>,
    pub use_global_tags: Option<bool>,
    pub custom_tags: Option<Vec<String>>,
}

impl GroupConfigPatch {
    pub fn apply_to(&self, record: &mut GroupConfig) {
        if let Some(enabled) = self.enabled {
            record.enabled = enabled;
        }
        if let Some(use_global_tags) = self.use_global_tags {
            record.use_global_tags = use_global_tags;
        }
        if let Some(custom_tags) = &self.custom_tags {
            record.custom_tags = custom_tags.clone();
        }
    }
}

/// Per-group settings backed by a `GroupConfigRepo`. Groups that were never
/// configured are materialized from the system defaults on first read.
pub struct GroupConfigStore {
    repo: Arc<dyn GroupConfigRepo>,
    config: Arc<AppConfig>,
}

impl GroupConfigStore {
    pub fn new(repo: Arc<dyn GroupConfigRepo>, config: Arc<AppConfig>) -> Self {
        Self { repo, config }
    }

    pub fn defaults_for(&self, group_id: &str) -> GroupConfig {
        GroupConfig {
            group_id: group_id.to_string(),
            enabled: self.config.enabled_by_default,
            use_global_tags: self.config.use_global_tags_by_default,
            custom_tags: Vec::new(),
        }
    }

    pub async fn get(&self, group_id: &str) -> Result<GroupConfig, AppError> {
        if let Some(record) = self.repo.find(group_id).await? {
            log::trace!("Loaded config for group {}: {:?}", group_id, record);
            return Ok(record);
        }

        log::info!("No config stored for group {}. Creating defaults.", group_id);
        self.repo.insert_if_absent(self.defaults_for(group_id)).await
    }

    pub async fn update(&self, group_id: &str, patch: GroupConfigPatch) -> Result<(), AppError> {
        log::debug!("Updating config for group {}: {:?}", group_id, patch);
        self.repo.update(group_id, &patch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::MemoryGroupConfigRepo;

    fn app_config(enabled: bool, use_global: bool) -> Arc<AppConfig> {
        let mut config = crate::engine::tests::app_config();
        config.enabled_by_default = enabled;
        config.use_global_tags_by_default = use_global;
        Arc::new(config)
    }

    #[tokio::test]
    async fn unknown_group_gets_system_defaults_once() {
        let repo = Arc::new(MemoryGroupConfigRepo::default());
        let store = GroupConfigStore::new(repo.clone(), app_config(true, false));

        let first = store.get("g1").await.unwrap();
        assert_eq!(
            first,
            GroupConfig {
                group_id: "g1".into(),
                enabled: true,
                use_global_tags: false,
                custom_tags: vec![],
            }
        );

        let second = store.get("g1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn concurrent_first_reads_create_one_record() {
        let repo = Arc::new(MemoryGroupConfigRepo::default());
        let store = Arc::new(GroupConfigStore::new(repo.clone(), app_config(false, true)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.get("shared").await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn update_merges_only_given_fields() {
        let repo = Arc::new(MemoryGroupConfigRepo::default());
        let store = GroupConfigStore::new(repo, app_config(false, true));
        store.get("g").await.unwrap();

        store
            .update("g", GroupConfigPatch { enabled: Some(true), ..Default::default() })
            .await
            .unwrap();

        let record = store.get("g").await.unwrap();
        assert!(record.enabled);
        assert!(record.use_global_tags);
        assert!(record.custom_tags.is_empty());
    }

    #[tokio::test]
    async fn update_of_missing_group_is_an_error() {
        let store = GroupConfigStore::new(
            Arc::new(MemoryGroupConfigRepo::default()),
            app_config(false, true),
        );
        let err = store
            .update("nope", GroupConfigPatch { enabled: Some(true), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
