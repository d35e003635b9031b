//! SQLite backend over the `form_storage` table

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::StorageBackend;
use crate::Result;

#[derive(Debug, Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Wrap a pool already initialized by [`crate::db::init_database`]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Keys currently stored, sorted
    pub async fn keys(&self) -> Result<Vec<String>> {
        let keys = sqlx::query_scalar::<_, String>("SELECT key FROM form_storage ORDER BY key")
            .fetch_all(&self.pool)
            .await?;
        Ok(keys)
    }
}

#[async_trait]
impl StorageBackend for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM form_storage WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO form_storage (key, value, updated_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM form_storage WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;

    #[tokio::test]
    async fn test_upsert_and_remove() {
        let pool = init_memory_database().await.unwrap();
        let storage = SqliteStorage::new(pool);

        assert_eq!(storage.get("ulp_card").await.unwrap(), None);
        storage.set("ulp_card", r#"{"a":1}"#).await.unwrap();
        storage.set("ulp_card", r#"{"a":2}"#).await.unwrap();
        assert_eq!(storage.get("ulp_card").await.unwrap().as_deref(), Some(r#"{"a":2}"#));
        assert_eq!(storage.keys().await.unwrap(), vec!["ulp_card".to_string()]);

        storage.remove("ulp_card").await.unwrap();
        assert_eq!(storage.get("ulp_card").await.unwrap(), None);
    }
}
