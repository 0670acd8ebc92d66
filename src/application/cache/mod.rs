//! Cache-aside views over the shared key/value cache.
//!
//! - [`relationship::RelationshipCache`]: positive-only "are friends" facts
//! - [`membership::MembershipCache`]: per-group member status buckets
//!
//! Every call is bounded by the configured operation timeout; a timeout or
//! any other cache fault surfaces as [`Error::CacheUnavailable`].

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};

pub mod membership;
pub mod relationship;

pub use membership::MembershipCache;
pub use relationship::RelationshipCache;

/// Run one cache operation under `limit`.
pub(crate) async fn bounded<T, F>(limit: Duration, op: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(Error::CacheUnavailable(reason))) => Err(Error::CacheUnavailable(reason)),
        Ok(Err(other)) => Err(Error::CacheUnavailable(format!("{op}: {other}"))),
        Err(_) => Err(Error::CacheUnavailable(format!(
            "{op} timed out after {}ms",
            limit.as_millis()
        ))),
    }
}
