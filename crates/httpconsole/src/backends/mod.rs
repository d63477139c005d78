//! Bucket store implementations.

mod inmemory;
#[cfg(feature = "redis-backend")]
mod redis;

pub use inmemory::InMemoryBucketStore;
#[cfg(feature = "redis-backend")]
pub use self::redis::RedisBucketStore;
