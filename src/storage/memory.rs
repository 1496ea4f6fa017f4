use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::SessionStore;
use crate::core::Result;

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    List(Vec<String>),
}

/// Process-local store, for tests and `storage.url = "memory"`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(match self.values.read().await.get(key) {
            Some(Value::Text(text)) => Some(text.clone()),
            _ => None,
        })
    }

    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), Value::Text(value.to_string()));
        Ok(())
    }

    async fn get_string_list(&self, key: &str) -> Result<Option<Vec<String>>> {
        Ok(match self.values.read().await.get(key) {
            Some(Value::List(list)) => Some(list.clone()),
            _ => None,
        })
    }

    async fn set_string_list(&self, key: &str, values: &[String]) -> Result<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), Value::List(values.to_vec()));
        Ok(())
    }
}
