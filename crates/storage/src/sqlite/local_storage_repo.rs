use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use crate::repository::{KeyValueStore, StorageError, check_quota};

use super::SqliteStore;

fn unavailable(err: sqlx::Error) -> StorageError {
    StorageError::Unavailable(err.to_string())
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM local_storage WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        row.map(|row| row.try_get::<String, _>("value"))
            .transpose()
            .map_err(unavailable)
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        if self.quota_bytes.is_some() {
            let used: i64 = sqlx::query_scalar(
                r"
                SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0)
                FROM local_storage
                WHERE key <> ?1
                ",
            )
            .bind(key)
            .fetch_one(&mut *tx)
            .await
            .map_err(unavailable)?;
            let used = usize::try_from(used).unwrap_or(usize::MAX);
            check_quota(self.quota_bytes, used, key, value)?;
        }

        sqlx::query(
            r"
            INSERT INTO local_storage (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        tx.commit().await.map_err(unavailable)?;
        tracing::debug!(key, bytes = value.len(), "local storage item written");
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM local_storage WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}
