//! Pseudonymous identity repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::Result;
use crate::database::models::AccountIdDbModel;

#[async_trait]
pub trait AccountIdRepository: Send + Sync {
    /// Find the identity row of a local user.
    async fn find_by_user(&self, user_id: i64) -> Result<Option<AccountIdDbModel>>;

    /// Return the identity row of a local user, inserting it on first access.
    async fn get_or_create(&self, user_id: i64) -> Result<AccountIdDbModel>;

    /// Store the remote account id unless one is already set.
    /// Returns `true` when the row was updated.
    async fn set_account_id_if_unset(&self, user_id: i64, account_id: i64) -> Result<bool>;
}

/// SQLx implementation of AccountIdRepository.
pub struct SqlxAccountIdRepository {
    pool: SqlitePool,
    write_pool: SqlitePool,
}

impl SqlxAccountIdRepository {
    pub fn new(pool: SqlitePool, write_pool: SqlitePool) -> Self {
        Self { pool, write_pool }
    }
}

#[async_trait]
impl AccountIdRepository for SqlxAccountIdRepository {
    async fn find_by_user(&self, user_id: i64) -> Result<Option<AccountIdDbModel>> {
        let row = sqlx::query_as::<_, AccountIdDbModel>("SELECT * FROM account_ids WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_or_create(&self, user_id: i64) -> Result<AccountIdDbModel> {
        let now = crate::database::time::now_ms();
        sqlx::query(
            r#"
            INSERT INTO account_ids (user_id, account_id, created_at, updated_at)
            VALUES (?, 0, ?, ?)
            ON CONFLICT(user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(&self.write_pool)
        .await?;

        // Read back through the write pool so the row is visible immediately.
        let row = sqlx::query_as::<_, AccountIdDbModel>("SELECT * FROM account_ids WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.write_pool)
            .await?;
        Ok(row)
    }

    async fn set_account_id_if_unset(&self, user_id: i64, account_id: i64) -> Result<bool> {
        let now = crate::database::time::now_ms();
        let result = sqlx::query(
            "UPDATE account_ids SET account_id = ?, updated_at = ? WHERE user_id = ? AND account_id = 0",
        )
        .bind(account_id)
        .bind(now)
        .bind(user_id)
        .execute(&self.write_pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    async fn repo() -> SqlxAccountIdRepository {
        let db = Database::in_memory().await.unwrap();
        SqlxAccountIdRepository::new(db.pool, db.write_pool)
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let repo = repo().await;
        let first = repo.get_or_create(7).await.unwrap();
        let second = repo.get_or_create(7).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.account_id, 0);
        assert!(!first.is_registered());
    }

    #[tokio::test]
    async fn test_distinct_users_get_distinct_external_ids() {
        let repo = repo().await;
        let a = repo.get_or_create(1).await.unwrap();
        let b = repo.get_or_create(2).await.unwrap();
        assert_ne!(a.external_id(), b.external_id());
    }

    #[tokio::test]
    async fn test_account_id_is_never_overwritten() {
        let repo = repo().await;
        repo.get_or_create(3).await.unwrap();

        assert!(repo.set_account_id_if_unset(3, 9001).await.unwrap());
        assert!(!repo.set_account_id_if_unset(3, 9002).await.unwrap());

        let row = repo.find_by_user(3).await.unwrap().unwrap();
        assert_eq!(row.account_id, 9001);
    }
}
