use crate::error::AppError;
use crate::group_config::{GroupConfig, GroupConfigPatch};
use crate::store::GroupConfigRepo;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Keeps group settings in process memory. Lost on restart.
#[derive(Default)]
pub struct MemoryGroupConfigRepo {
    records: RwLock<HashMap<String, GroupConfig>>,
}

impl MemoryGroupConfigRepo {
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl GroupConfigRepo for MemoryGroupConfigRepo {
    async fn find(&self, group_id: &str) -> Result<Option<GroupConfig>, AppError> {
        Ok(self.records.read().await.get(group_id).cloned())
    }

    async fn insert_if_absent(&self, record: GroupConfig) -> Result<GroupConfig, AppError> {
        let mut records = self.records.write().await;
        let stored = records
            .entry(record.group_id.clone())
            .or_insert_with(|| {
                log::debug!("Inserted config for group {}", record.group_id);
                record
            });
        Ok(stored.clone())
    }

    async fn update(&self, group_id: &str, patch: &GroupConfigPatch) -> Result<(), AppError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(group_id)
            .ok_or_else(|| AppError::NotFound(format!("group config {}", group_id)))?;
        patch.apply_to(record);
        Ok(())
    }
}
