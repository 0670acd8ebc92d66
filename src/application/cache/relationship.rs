//! Positive-only friendship cache.
//!
//! One entry per unordered pair, keyed `friend_status:{low}:{high}`. A hit
//! means the pair was mutual friends when the entry was written; a miss
//! means nothing and must be answered from the store.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::bounded;
use crate::domain::friend::canonical_pair;
use crate::domain::id::UserId;
use crate::error::Result;
use crate::port::outbound::cache::KeyValueCache;

const KEY_PREFIX: &str = "friend_status";
const FRIEND_MARKER: &[u8] = b"1";

#[derive(Clone)]
pub struct RelationshipCache {
    cache: Arc<dyn KeyValueCache>,
    op_timeout: Duration,
}

impl RelationshipCache {
    #[must_use]
    pub fn new(cache: Arc<dyn KeyValueCache>, op_timeout: Duration) -> Self {
        Self { cache, op_timeout }
    }

    /// Cache key for the unordered pair `{a, b}`.
    #[must_use]
    pub fn key(a: UserId, b: UserId) -> String {
        let (low, high) = canonical_pair(a, b);
        format!("{KEY_PREFIX}:{low}:{high}")
    }

    /// `true` only on a hit. `false` means "unknown", never "not friends".
    pub async fn is_friend_cached(&self, a: UserId, b: UserId) -> Result<bool> {
        let key = Self::key(a, b);
        let value = bounded(self.op_timeout, "get", self.cache.get(&key)).await?;
        Ok(value.as_deref() == Some(FRIEND_MARKER))
    }

    /// Record the pair as mutual friends. Only call once the store agrees.
    pub async fn mark_friends(&self, a: UserId, b: UserId) -> Result<()> {
        let key = Self::key(a, b);
        bounded(self.op_timeout, "set", self.cache.set(&key, FRIEND_MARKER)).await?;
        debug!(%key, "Marked friends in cache");
        Ok(())
    }

    /// Drop any positive entry for the pair.
    pub async fn clear_friendship(&self, a: UserId, b: UserId) -> Result<()> {
        let key = Self::key(a, b);
        bounded(self.op_timeout, "delete", self.cache.delete(&key)).await?;
        debug!(%key, "Cleared friendship from cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::MemoryCache;

    fn cache() -> RelationshipCache {
        RelationshipCache::new(Arc::new(MemoryCache::new()), Duration::from_secs(1))
    }

    #[test]
    fn key_is_order_independent() {
        let ab = RelationshipCache::key(UserId::new(9), UserId::new(3));
        let ba = RelationshipCache::key(UserId::new(3), UserId::new(9));
        assert_eq!(ab, ba);
        assert_eq!(ab, "friend_status:3:9");
    }

    #[tokio::test]
    async fn mark_then_clear() {
        let cache = cache();
        let (a, b) = (UserId::new(1), UserId::new(2));
        assert!(!cache.is_friend_cached(a, b).await.unwrap());

        cache.mark_friends(b, a).await.unwrap();
        assert!(cache.is_friend_cached(a, b).await.unwrap());

        cache.clear_friendship(a, b).await.unwrap();
        assert!(!cache.is_friend_cached(b, a).await.unwrap());
    }
}
