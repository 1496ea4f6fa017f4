//! Durable state: the session token and the known listing identifiers.

pub mod memory;
pub mod redis_store;
pub mod sqlite;

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

use crate::api::SessionToken;
use crate::core::config::StorageConfig;
use crate::core::{Result, SyncError};

pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use sqlite::SqliteStore;

/// Key-value persistence consumed by the sync engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    async fn get_string_list(&self, key: &str) -> Result<Option<Vec<String>>>;

    /// Replaces the whole list.
    async fn set_string_list(&self, key: &str, values: &[String]) -> Result<()>;
}

/// Typed view over a [`SessionStore`] with the engine's two keys.
#[derive(Clone)]
pub struct SyncState {
    store: Arc<dyn SessionStore>,
    session_key: String,
    known_ids_key: String,
}

impl SyncState {
    pub fn new(store: Arc<dyn SessionStore>, key_prefix: &str) -> Self {
        Self {
            store,
            session_key: format!("{}:session_id", key_prefix),
            known_ids_key: format!("{}:known_listing_ids", key_prefix),
        }
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn known_ids_key(&self) -> &str {
        &self.known_ids_key
    }

    pub async fn session_token(&self) -> Result<Option<SessionToken>> {
        Ok(self
            .store
            .get_string(&self.session_key)
            .await?
            .filter(|value| !value.is_empty())
            .map(SessionToken::new))
    }

    pub async fn set_session_token(&self, token: &SessionToken) -> Result<()> {
        self.store.set_string(&self.session_key, token.as_str()).await
    }

    /// Absent list reads as empty: the first cycle treats everything as new.
    pub async fn known_ids(&self) -> Result<HashSet<String>> {
        Ok(self
            .store
            .get_string_list(&self.known_ids_key)
            .await?
            .unwrap_or_default()
            .into_iter()
            .collect())
    }

    pub async fn set_known_ids(&self, ids: &[String]) -> Result<()> {
        self.store.set_string_list(&self.known_ids_key, ids).await
    }
}

/// Picks the backend from the URL scheme: `redis://`, `sqlite:` or `memory`.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn SessionStore>> {
    let url = config.url.as_str();

    if url.starts_with("redis://") || url.starts_with("rediss://") {
        Ok(Arc::new(RedisStore::new(url).await?))
    } else if url.starts_with("sqlite:") {
        Ok(Arc::new(SqliteStore::new(url).await?))
    } else if url == "memory" {
        tracing::warn!("Using in-memory store, state is lost on restart");
        Ok(Arc::new(MemoryStore::new()))
    } else {
        Err(SyncError::config(format!("Unsupported storage url '{}'", url)))
    }
}
