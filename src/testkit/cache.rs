//! Fault-injecting key/value cache.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::adapter::outbound::memory::MemoryCache;
use crate::error::{Error, Result};
use crate::port::outbound::cache::KeyValueCache;

/// [`MemoryCache`] wrapper that can be told to fail or to stall writes.
///
/// Failures are checked before the inner cache is touched, so a failed
/// write leaves the cache unchanged. A stalled write is applied only after
/// its delay, which lets tests land a write after a concurrent commit.
#[derive(Debug, Default)]
pub struct FlakyCache {
    inner: MemoryCache,
    failing: AtomicBool,
    fail_next: AtomicU32,
    write_delay: Mutex<Option<Duration>>,
}

impl FlakyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every operation until switched off.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fail exactly the next `n` operations.
    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Sleep this long before applying every `set` and `hset`.
    pub fn set_write_delay(&self, delay: Option<Duration>) {
        *self.write_delay.lock() = delay;
    }

    /// The backing cache, for arranging and inspecting state directly.
    pub fn inner(&self) -> &MemoryCache {
        &self.inner
    }

    async fn stall(&self) {
        let delay = *self.write_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    async fn gate(&self, op: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::CacheUnavailable(format!("{op}: injected failure")));
        }
        let consumed = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if consumed {
            return Err(Error::CacheUnavailable(format!("{op}: injected failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueCache for FlakyCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.gate("get").await?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.gate("set").await?;
        self.stall().await;
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.gate("delete").await?;
        self.inner.delete(key).await
    }

    async fn hget(&self, bucket: &str, field: &str) -> Result<Option<Vec<u8>>> {
        self.gate("hget").await?;
        self.inner.hget(bucket, field).await
    }

    async fn hset(&self, bucket: &str, field: &str, value: &[u8]) -> Result<()> {
        self.gate("hset").await?;
        self.stall().await;
        self.inner.hset(bucket, field, value).await
    }

    async fn hdel(&self, bucket: &str, field: &str) -> Result<()> {
        self.gate("hdel").await?;
        self.inner.hdel(bucket, field).await
    }
}
