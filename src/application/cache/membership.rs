//! Group membership cache.
//!
//! Each group has a hash bucket `group_members_{gid}` whose fields are user
//! IDs and whose values are the member status code.

use std::sync::Arc;
use std::time::Duration;

use super::bounded;
use crate::domain::group::MemberStatus;
use crate::domain::id::{GroupId, UserId};
use crate::error::Result;
use crate::port::outbound::cache::KeyValueCache;

#[derive(Clone)]
pub struct MembershipCache {
    cache: Arc<dyn KeyValueCache>,
    op_timeout: Duration,
}

impl MembershipCache {
    #[must_use]
    pub fn new(cache: Arc<dyn KeyValueCache>, op_timeout: Duration) -> Self {
        Self { cache, op_timeout }
    }

    #[must_use]
    pub fn bucket(group: GroupId) -> String {
        format!("group_members_{group}")
    }

    /// Cached status of `user` in `group`. Unparseable values count as a miss.
    pub async fn member_status(&self, group: GroupId, user: UserId) -> Result<Option<MemberStatus>> {
        let bucket = Self::bucket(group);
        let field = user.to_string();
        let value = bounded(self.op_timeout, "hget", self.cache.hget(&bucket, &field)).await?;

        Ok(value
            .and_then(|raw| String::from_utf8(raw).ok())
            .and_then(|s| s.parse::<i32>().ok())
            .and_then(MemberStatus::from_code))
    }

    pub async fn set_member(&self, group: GroupId, user: UserId, status: MemberStatus) -> Result<()> {
        let bucket = Self::bucket(group);
        let field = user.to_string();
        let value = status.code().to_string();
        bounded(
            self.op_timeout,
            "hset",
            self.cache.hset(&bucket, &field, value.as_bytes()),
        )
        .await
    }

    pub async fn evict(&self, group: GroupId, user: UserId) -> Result<()> {
        let bucket = Self::bucket(group);
        let field = user.to_string();
        bounded(self.op_timeout, "hdel", self.cache.hdel(&bucket, &field)).await
    }
}
