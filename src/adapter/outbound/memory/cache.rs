//! In-process key/value cache.
//!
//! Stands in for a remote cache service in single-node deployments and
//! tests. Never fails.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::Result;
use crate::port::outbound::cache::KeyValueCache;

/// Thread-safe cache over concurrent hash maps.
#[derive(Debug, Default)]
pub struct MemoryCache {
    /// Plain keys.
    values: DashMap<String, Vec<u8>>,
    /// Hash buckets, each a field -> value map.
    buckets: DashMap<String, HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of plain keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of fields in a hash bucket.
    #[must_use]
    pub fn bucket_len(&self, bucket: &str) -> usize {
        self.buckets.get(bucket).map_or(0, |b| b.len())
    }
}

#[async_trait]
impl KeyValueCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.values.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.values.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }

    async fn hget(&self, bucket: &str, field: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .buckets
            .get(bucket)
            .and_then(|b| b.get(field).cloned()))
    }

    async fn hset(&self, bucket: &str, field: &str, value: &[u8]) -> Result<()> {
        self.buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(field.to_string(), value.to_vec());
        Ok(())
    }

    async fn hdel(&self, bucket: &str, field: &str) -> Result<()> {
        // Drop the bucket once it empties so buckets do not accumulate.
        self.buckets.remove_if_mut(bucket, |_, fields| {
            fields.remove(field);
            fields.is_empty()
        });
        Ok(())
    }
}
