use crate::error::AppError;
use crate::group_config::{GroupConfig, GroupConfigPatch};
use async_trait::async_trait;

/// Keyed record store for group settings. `group_id` is unique.
#[async_trait]
pub trait GroupConfigRepo: Send + Sync {
    async fn find(&self, group_id: &str) -> Result<Option<GroupConfig>, AppError>;

    /// Stores `record` unless a record for the same group already exists, and
    /// returns whichever record ends up stored.
    async fn insert_if_absent(&self, record: GroupConfig) -> Result<GroupConfig, AppError>;

    /// Applies the set fields of `patch`. Fails with `NotFound` if the group
    /// has no record.
    async fn update(&self, group_id: &str, patch: &GroupConfigPatch) -> Result<(), AppError>;
}
