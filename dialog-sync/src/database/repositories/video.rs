//! Activity video list and remote metadata cache.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::Result;
use crate::database::begin_immediate;
use crate::database::models::{ActivityVideoDbModel, DialogCacheDbModel};

#[async_trait]
pub trait VideoRepository: Send + Sync {
    /// Videos of an activity in display order.
    async fn list_for_activity(&self, activity_id: i64) -> Result<Vec<ActivityVideoDbModel>>;

    /// Append a video to the end of an activity's list.
    /// Returns `false` when the video is already listed.
    async fn add_video(&self, activity_id: i64, video_id: i64) -> Result<bool>;

    /// Cache rows for the given videos.
    async fn find_cached(&self, video_ids: &[i64]) -> Result<Vec<DialogCacheDbModel>>;

    /// Store metadata unless the video already has some.
    /// Returns `true` when the cache row was written.
    async fn fill_cache(&self, video_id: i64, name: Option<&str>, details_json: &str) -> Result<bool>;
}

/// SQLx implementation of VideoRepository.
pub struct SqlxVideoRepository {
    pool: SqlitePool,
    write_pool: SqlitePool,
}

impl SqlxVideoRepository {
    pub fn new(pool: SqlitePool, write_pool: SqlitePool) -> Self {
        Self { pool, write_pool }
    }
}

#[async_trait]
impl VideoRepository for SqlxVideoRepository {
    async fn list_for_activity(&self, activity_id: i64) -> Result<Vec<ActivityVideoDbModel>> {
        let rows = sqlx::query_as::<_, ActivityVideoDbModel>(
            "SELECT * FROM activity_videos WHERE activity_id = ? ORDER BY sort_order, id",
        )
        .bind(activity_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn add_video(&self, activity_id: i64, video_id: i64) -> Result<bool> {
        let mut tx = begin_immediate(&self.write_pool).await?;

        let next_order: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sort_order), 0) + 1 FROM activity_videos WHERE activity_id = ?",
        )
        .bind(activity_id)
        .fetch_one(&mut *tx)
        .await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO activity_videos (activity_id, video_id, sort_order)
            VALUES (?, ?, ?)
            ON CONFLICT(activity_id, video_id) DO NOTHING
            "#,
        )
        .bind(activity_id)
        .bind(video_id)
        .bind(next_order)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        // Placeholder cache row; metadata arrives with the next dialog listing.
        let now = crate::database::time::now_ms();
        sqlx::query(
            r#"
            INSERT INTO dialog_cache (video_id, name, details_json, created_at, updated_at)
            VALUES (?, NULL, NULL, ?, ?)
            ON CONFLICT(video_id) DO NOTHING
            "#,
        )
        .bind(video_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(inserted)
    }

    async fn find_cached(&self, video_ids: &[i64]) -> Result<Vec<DialogCacheDbModel>> {
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids_json = serde_json::to_string(video_ids)?;
        let rows = sqlx::query_as::<_, DialogCacheDbModel>(
            r#"
            SELECT * FROM dialog_cache
            WHERE video_id IN (SELECT value FROM json_each(?))
            ORDER BY video_id
            "#,
        )
        .bind(&ids_json)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn fill_cache(&self, video_id: i64, name: Option<&str>, details_json: &str) -> Result<bool> {
        let now = crate::database::time::now_ms();
        let result = sqlx::query(
            r#"
            INSERT INTO dialog_cache (video_id, name, details_json, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(video_id) DO UPDATE SET
                name = excluded.name,
                details_json = excluded.details_json,
                updated_at = excluded.updated_at
            WHERE dialog_cache.details_json IS NULL
            "#,
        )
        .bind(video_id)
        .bind(name)
        .bind(details_json)
        .bind(now)
        .bind(now)
        .execute(&self.write_pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
