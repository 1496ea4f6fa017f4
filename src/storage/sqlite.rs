use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use super::SessionStore;
use crate::core::{Result, SyncError};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Accepts `sqlite::memory:`, a `sqlite://` url or a bare file path.
    /// File databases are created on first open.
    pub async fn new(database: &str) -> Result<Self> {
        let in_memory = database.contains(":memory:");

        let options = if database.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(database)?
        } else {
            SqliteConnectOptions::new().filename(database)
        }
        .create_if_missing(true);

        if !in_memory {
            if let Some(parent) = options.clone().get_filename().parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        SyncError::persistence(format!(
                            "Failed to create database directory {}: {}",
                            parent.display(),
                            e
                        ))
                    })?;
                }
            }
        }

        // Every in-memory connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.initialize_schema().await?;

        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                is_list INTEGER NOT NULL DEFAULT 0,
                updated_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("✅ SQLite store schema initialized");

        Ok(())
    }

    async fn read(&self, key: &str, is_list: bool) -> Result<Option<String>> {
        let value: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT value FROM kv_store WHERE key = ? AND is_list = ?
            "#,
        )
        .bind(key)
        .bind(is_list)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value.map(|(v,)| v))
    }

    async fn write(&self, key: &str, value: &str, is_list: bool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, is_list, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                is_list = excluded.is_list,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(is_list)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        self.read(key, false).await
    }

    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.write(key, value, false).await
    }

    async fn get_string_list(&self, key: &str) -> Result<Option<Vec<String>>> {
        match self.read(key, true).await? {
            Some(json) => serde_json::from_str(&json).map(Some).map_err(|e| {
                SyncError::persistence(format!("Corrupt list stored under '{}': {}", key, e))
            }),
            None => Ok(None),
        }
    }

    async fn set_string_list(&self, key: &str, values: &[String]) -> Result<()> {
        let json = serde_json::to_string(values)
            .map_err(|e| SyncError::persistence(format!("Failed to encode list: {}", e)))?;
        self.write(key, &json, true).await
    }
}
