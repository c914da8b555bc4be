use crate::error::AppError;
use crate::group_config::{GroupConfig, GroupConfigPatch};
use crate::store::GroupConfigRepo;
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS group_configs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    group_id TEXT NOT NULL UNIQUE,
    enabled INTEGER NOT NULL,
    use_global_tags INTEGER NOT NULL,
    custom_tags TEXT NOT NULL DEFAULT '[]'
)";

pub struct SqliteGroupConfigRepo {
    pool: SqlitePool,
}

impl SqliteGroupConfigRepo {
    pub async fn new(database_url: &str) -> Result<Self, AppError> {
        log::debug!("Connecting to SQLite database at {}", database_url);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;
        let repo = Self { pool };
        repo.ensure_schema().await?;
        Ok(repo)
    }

    async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        log::trace!("group_configs table is ready.");
        Ok(())
    }
}

fn row_to_config(row: &SqliteRow) -> Result<GroupConfig, AppError> {
    let custom_tags: String = row.try_get("custom_tags")?;
    Ok(GroupConfig {
        group_id: row.try_get("group_id")?,
        enabled: row.try_get("enabled")?,
        use_global_tags: row.try_get("use_global_tags")?,
        custom_tags: serde_json::from_str(&custom_tags)?,
    })
}

#[async_trait]
impl GroupConfigRepo for SqliteGroupConfigRepo {
    async fn find(&self, group_id: &str) -> Result<Option<GroupConfig>, AppError> {
        let row = sqlx::query(
            "SELECT group_id, enabled, use_global_tags, custom_tags FROM group_configs WHERE group_id = ?",
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_config).transpose()
    }

    /// `ON CONFLICT DO NOTHING` keeps the first writer's record when two
    /// first reads race.
    async fn insert_if_absent(&self, record: GroupConfig) -> Result<GroupConfig, AppError> {
        let result = sqlx::query(
            "INSERT INTO group_configs (group_id, enabled, use_global_tags, custom_tags)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(group_id) DO NOTHING",
        )
        .bind(&record.group_id)
        .bind(record.enabled)
        .bind(record.use_global_tags)
        .bind(serde_json::to_string(&record.custom_tags)?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            log::debug!("Config for group {} already existed", record.group_id);
        }

        self.find(&record.group_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("group config {}", record.group_id)))
    }

    async fn update(&self, group_id: &str, patch: &GroupConfigPatch) -> Result<(), AppError> {
        let custom_tags = patch
            .custom_tags
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(
            "UPDATE group_configs SET
                enabled = COALESCE(?, enabled),
                use_global_tags = COALESCE(?, use_global_tags),
                custom_tags = COALESCE(?, custom_tags)
             WHERE group_id = ?",
        )
        .bind(patch.enabled)
        .bind(patch.use_global_tags)
        .bind(custom_tags)
        .bind(group_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("group config {}", group_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(group_id: &str) -> GroupConfig {
        GroupConfig {
            group_id: group_id.into(),
            enabled: false,
            use_global_tags: true,
            custom_tags: vec![],
        }
    }

    #[tokio::test]
    async fn insert_find_and_patch() {
        let repo = SqliteGroupConfigRepo::new("sqlite::memory:").await.unwrap();
        assert!(repo.find("g").await.unwrap().is_none());

        repo.insert_if_absent(record("g")).await.unwrap();
        repo.update(
            "g",
            &GroupConfigPatch {
                custom_tags: Some(vec!["art".into(), "cute".into()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let stored = repo.find("g").await.unwrap().unwrap();
        assert_eq!(stored.custom_tags, vec!["art", "cute"]);
        assert!(!stored.enabled);
        assert!(stored.use_global_tags);
    }

    #[tokio::test]
    async fn second_insert_keeps_first_record() {
        let repo = SqliteGroupConfigRepo::new("sqlite::memory:").await.unwrap();
        repo.insert_if_absent(record("g")).await.unwrap();

        let mut other = record("g");
        other.enabled = true;
        let stored = repo.insert_if_absent(other).await.unwrap();
        assert!(!stored.enabled);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM group_configs")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn update_without_record_is_not_found() {
        let repo = SqliteGroupConfigRepo::new("sqlite::memory:").await.unwrap();
        let err = repo
            .update("missing", &GroupConfigPatch { enabled: Some(true), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
