//! Key/value cache port.
//!
//! Models a remote cache service with plain string keys and hash buckets.
//! Every failure is reported as [`Error::CacheUnavailable`](crate::error::Error::CacheUnavailable).

use async_trait::async_trait;

use crate::error::Result;

/// Get/set/delete by key, and get/set/delete a field inside a hash bucket.
///
/// Values never expire on their own.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    async fn hget(&self, bucket: &str, field: &str) -> Result<Option<Vec<u8>>>;

    async fn hset(&self, bucket: &str, field: &str, value: &[u8]) -> Result<()>;

    /// Deleting a missing field succeeds.
    async fn hdel(&self, bucket: &str, field: &str) -> Result<()>;
}
