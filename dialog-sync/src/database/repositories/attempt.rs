//! Progress aggregate repository.

use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::Result;
use crate::database::begin_immediate;
use crate::database::models::{AttemptDbModel, AttemptKey};

/// Computes the next row from the current one (`None` on first report).
pub type AttemptUpdate<'a> = &'a (dyn Fn(Option<&AttemptDbModel>) -> AttemptDbModel + Send + Sync);

#[async_trait]
pub trait AttemptRepository: Send + Sync {
    async fn find(&self, key: AttemptKey) -> Result<Option<AttemptDbModel>>;

    /// Rows of one user in one activity, optionally narrowed to one video.
    async fn list_for_user(
        &self,
        activity_id: i64,
        user_id: i64,
        video_id: Option<i64>,
    ) -> Result<Vec<AttemptDbModel>>;

    /// Read-modify-write of one row inside a `BEGIN IMMEDIATE` transaction.
    ///
    /// The row is inserted when absent and updated in place otherwise.
    async fn upsert_with(&self, key: AttemptKey, update: AttemptUpdate<'_>) -> Result<AttemptDbModel>;
}

/// Transaction-scoped statements for the `attempts` table.
///
/// These run on an open transaction and never commit.
pub struct AttemptTxOps;

impl AttemptTxOps {
    pub async fn find(tx: &mut SqliteConnection, key: AttemptKey) -> Result<Option<AttemptDbModel>> {
        let row = sqlx::query_as::<_, AttemptDbModel>(
            "SELECT * FROM attempts WHERE activity_id = ? AND user_id = ? AND video_id = ?",
        )
        .bind(key.activity_id)
        .bind(key.user_id)
        .bind(key.video_id)
        .fetch_optional(tx)
        .await?;
        Ok(row)
    }

    /// Insert and return the new row id.
    pub async fn insert(tx: &mut SqliteConnection, row: &AttemptDbModel) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO attempts (
                activity_id, user_id, video_id,
                watch_complete, watch_count, watch_line_ids,
                learn_complete, learn_count, learn_word_ids,
                speak_complete, speak_count, speak_line_ids,
                chat_complete, chat_count, chat_question_ids,
                total_points, hash, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(row.activity_id)
        .bind(row.user_id)
        .bind(row.video_id)
        .bind(row.watch_complete)
        .bind(row.watch_count)
        .bind(&row.watch_line_ids)
        .bind(row.learn_complete)
        .bind(row.learn_count)
        .bind(&row.learn_word_ids)
        .bind(row.speak_complete)
        .bind(row.speak_count)
        .bind(&row.speak_line_ids)
        .bind(row.chat_complete)
        .bind(row.chat_count)
        .bind(&row.chat_question_ids)
        .bind(row.total_points)
        .bind(&row.hash)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(tx)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn update(tx: &mut SqliteConnection, row: &AttemptDbModel) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE attempts SET
                watch_complete = ?, watch_count = ?, watch_line_ids = ?,
                learn_complete = ?, learn_count = ?, learn_word_ids = ?,
                speak_complete = ?, speak_count = ?, speak_line_ids = ?,
                chat_complete = ?, chat_count = ?, chat_question_ids = ?,
                total_points = ?, hash = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(row.watch_complete)
        .bind(row.watch_count)
        .bind(&row.watch_line_ids)
        .bind(row.learn_complete)
        .bind(row.learn_count)
        .bind(&row.learn_word_ids)
        .bind(row.speak_complete)
        .bind(row.speak_count)
        .bind(&row.speak_line_ids)
        .bind(row.chat_complete)
        .bind(row.chat_count)
        .bind(&row.chat_question_ids)
        .bind(row.total_points)
        .bind(&row.hash)
        .bind(row.updated_at)
        .bind(row.id)
        .execute(tx)
        .await?;
        Ok(())
    }
}

/// SQLx implementation of AttemptRepository.
pub struct SqlxAttemptRepository {
    pool: SqlitePool,
    write_pool: SqlitePool,
}

impl SqlxAttemptRepository {
    pub fn new(pool: SqlitePool, write_pool: SqlitePool) -> Self {
        Self { pool, write_pool }
    }
}

#[async_trait]
impl AttemptRepository for SqlxAttemptRepository {
    async fn find(&self, key: AttemptKey) -> Result<Option<AttemptDbModel>> {
        let mut conn = self.pool.acquire().await?;
        AttemptTxOps::find(&mut conn, key).await
    }

    async fn list_for_user(
        &self,
        activity_id: i64,
        user_id: i64,
        video_id: Option<i64>,
    ) -> Result<Vec<AttemptDbModel>> {
        let rows = sqlx::query_as::<_, AttemptDbModel>(
            r#"
            SELECT * FROM attempts
            WHERE activity_id = ?
              AND user_id = ?
              AND (? IS NULL OR video_id = ?)
            ORDER BY id
            "#,
        )
        .bind(activity_id)
        .bind(user_id)
        .bind(video_id)
        .bind(video_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn upsert_with(&self, key: AttemptKey, update: AttemptUpdate<'_>) -> Result<AttemptDbModel> {
        let mut tx = begin_immediate(&self.write_pool).await?;

        let existing = AttemptTxOps::find(&mut tx, key).await?;
        let mut next = update(existing.as_ref());
        next.activity_id = key.activity_id;
        next.user_id = key.user_id;
        next.video_id = key.video_id;
        next.updated_at = crate::database::time::now_ms();

        match existing {
            Some(prev) => {
                next.id = prev.id;
                next.created_at = prev.created_at;
                AttemptTxOps::update(&mut tx, &next).await?;
                debug!(attempt_id = next.id, %key, "Updated attempt");
            }
            None => {
                next.id = AttemptTxOps::insert(&mut tx, &next).await?;
                debug!(attempt_id = next.id, %key, "Inserted attempt");
            }
        }

        tx.commit().await?;
        Ok(next)
    }
}
