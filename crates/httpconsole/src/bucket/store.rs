//! Key-value/list contract the bucket engine is written against.

use crate::config::{StoreBackend, StoreConfig};
use crate::error::StoreError;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Suffix of the list key holding a bucket's interaction log.
pub const LOG_KEY_SUFFIX: &str = "-log";

/// Key of the interaction log belonging to bucket `id`.
pub fn log_key(id: &str) -> String {
    format!("{id}{LOG_KEY_SUFFIX}")
}

/// Backend-agnostic bucket storage.
///
/// None of the operations are transactional. `create` is an unconditional
/// overwrite; `log_append` and `log_trim` are separate calls and concurrent
/// callers may interleave them freely.
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Store the serialized response archive under `id`
    async fn create(&self, id: &str, archive: &str) -> Result<(), StoreError>;

    /// Serialized response archive for `id`, if any
    async fn read(&self, id: &str) -> Result<Option<String>, StoreError>;

    /// Append a serialized request entry to the tail of the bucket's log
    async fn log_append(&self, id: &str, entry: &str) -> Result<(), StoreError>;

    /// Keep only the `start..=stop` slice of the log; negative indexes count from the tail
    async fn log_trim(&self, id: &str, start: isize, stop: isize) -> Result<(), StoreError>;

    /// Whole log, head first
    async fn log_range(&self, id: &str) -> Result<Vec<String>, StoreError>;
}

/// Create a BucketStore based on configuration
pub async fn create_bucket_store(config: &StoreConfig) -> Result<Arc<dyn BucketStore>> {
    match config.backend {
        StoreBackend::Inmemory => {
            use crate::backends::InMemoryBucketStore;
            tracing::info!("Using in-memory bucket store");
            Ok(Arc::new(InMemoryBucketStore::new()))
        }
        StoreBackend::Redis => {
            let redis_config = config
                .redis
                .as_ref()
                .ok_or_else(|| anyhow!("no redis config"))?;

            #[cfg(feature = "redis-backend")]
            {
                use crate::backends::RedisBucketStore;
                use anyhow::Context;

                let store = RedisBucketStore::connect(&redis_config.url, redis_config.key_prefix.clone())
                    .await
                    .context("Failed to create Redis backend")?;

                tracing::info!("Using redis bucket store (url={})", redis_config.redacted_url());
                Ok(Arc::new(store))
            }

            #[cfg(not(feature = "redis-backend"))]
            {
                let _ = redis_config;
                Err(anyhow!(
                    "Redis backend not available. Compile with --features redis-backend"
                ))
            }
        }
    }
}
