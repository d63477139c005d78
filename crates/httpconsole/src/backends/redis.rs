use crate::bucket::{log_key, BucketStore};
use crate::error::StoreError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Redis implementation of BucketStore
///
/// Uses the async connection manager, which multiplexes commands over one
/// connection and reconnects on failure. Layout: `{prefix}{id}` holds the
/// archive string, `{prefix}{id}-log` the interaction log list.
///
/// # Compatibility
///
/// - Redis 6.x, 7.x: Fully supported
/// - Valkey: Likely compatible but not officially supported
#[derive(Clone)]
pub struct RedisBucketStore {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisBucketStore {
    /// Connect and verify the server answers `PING`
    ///
    /// # Arguments
    /// * `url` - Redis connection URL (e.g. "redis://:password@localhost:6379")
    /// * `key_prefix` - Prefix for all keys, empty for the bare `id` layout
    pub async fn connect(url: &str, key_prefix: String) -> Result<Self> {
        let client = redis::Client::open(url).context("Failed to parse Redis URL")?;
        let mut conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("Failed to PING Redis")?;

        tracing::info!("Connected to Redis with prefix={:?}", key_prefix);

        Ok(Self { conn, key_prefix })
    }

    fn key(&self, id: &str) -> String {
        format!("{}{}", self.key_prefix, id)
    }

    fn list_key(&self, id: &str) -> String {
        format!("{}{}", self.key_prefix, log_key(id))
    }
}

#[async_trait]
impl BucketStore for RedisBucketStore {
    async fn create(&self, id: &str, archive: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(self.key(id), archive).await?;
        Ok(())
    }

    async fn read(&self, id: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        Ok(conn.get(self.key(id)).await?)
    }

    async fn log_append(&self, id: &str, entry: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.rpush(self.list_key(id), entry).await?;
        Ok(())
    }

    async fn log_trim(&self, id: &str, start: isize, stop: isize) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.ltrim(self.list_key(id), start, stop).await?;
        Ok(())
    }

    async fn log_range(&self, id: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        Ok(conn.lrange(self.list_key(id), 0, -1).await?)
    }
}
