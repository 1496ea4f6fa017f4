use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::SessionStore;
use crate::core::Result;

/// Redis has no empty lists, so an empty list is a marker key instead.
const EMPTY_LIST_SUFFIX: &str = ":empty";

pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;

        tracing::info!("✅ Connected to redis store");
        Ok(Self { connection })
    }

    fn empty_marker(key: &str) -> String {
        format!("{}{}", key, EMPTY_LIST_SUFFIX)
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn get_string_list(&self, key: &str) -> Result<Option<Vec<String>>> {
        let mut conn = self.connection.clone();
        let (items, empty): (Vec<String>, bool) = redis::pipe()
            .atomic()
            .lrange(key, 0, -1)
            .exists(Self::empty_marker(key))
            .query_async(&mut conn)
            .await?;

        if !items.is_empty() || empty {
            Ok(Some(items))
        } else {
            Ok(None)
        }
    }

    async fn set_string_list(&self, key: &str, values: &[String]) -> Result<()> {
        let mut conn = self.connection.clone();
        let marker = Self::empty_marker(key);

        let mut pipe = redis::pipe();
        pipe.atomic().del(key).ignore().del(&marker).ignore();
        if values.is_empty() {
            pipe.set(&marker, 1).ignore();
        } else {
            pipe.rpush(key, values).ignore();
        }
        pipe.query_async::<_, ()>(&mut conn).await?;

        Ok(())
    }
}
