//! Friend relationships and the friend-request handshake.

use tracing::debug;

use crate::application::cache::RelationshipCache;
use crate::application::repair::schedule;
use crate::domain::friend::FriendStatus;
use crate::domain::id::UserId;
use crate::error::Result;
use crate::port::outbound::queue::{RepairJob, RepairQueue};
use crate::port::outbound::store::Database;

pub mod request;
pub mod service;

pub use request::{ConfirmOutcome, FriendRequestWorkflow, RequestOutcome, RequestView};
pub use service::{FriendService, FriendView, StatusUpdate};

/// Whether both directed edges between `a` and `b` are FRIEND in the store.
pub(crate) fn mutual_in_store<D: Database>(db: &D, a: UserId, b: UserId) -> Result<bool> {
    db.run(|repo| {
        if repo.get_relationship_by_status(a, b, FriendStatus::Friend)?.is_none() {
            return Ok(false);
        }
        Ok(repo.get_relationship_by_status(b, a, FriendStatus::Friend)?.is_some())
    })
}

/// Write the mutual-friend marker, then re-read the store and withdraw the
/// marker if the pair stopped being mutual while the write was in flight.
///
/// An unfriend clears the key before and after its commit, but a write
/// issued before that commit can still land after both clears. Once the
/// write has landed, any commit it raced with is visible to the re-read.
/// Returns whether the marker stands.
pub(crate) async fn mark_verified<D: Database>(
    db: &D,
    cache: &RelationshipCache,
    a: UserId,
    b: UserId,
) -> Result<bool> {
    cache.mark_friends(a, b).await?;
    if mutual_in_store(db, a, b)? {
        return Ok(true);
    }
    debug!(uid_a = %a, uid_b = %b, "Pair changed during cache write, withdrawing marker");
    cache.clear_friendship(a, b).await?;
    Ok(false)
}

/// [`mark_verified`] after a commit, deferring to the repair queue on
/// failure. Returns `true` when the write was deferred.
///
/// A failed or timed-out write may still land later, so the deferred job
/// reconciles the entry against the store rather than blindly retrying.
pub(crate) async fn mark_or_repair<D: Database>(
    db: &D,
    cache: &RelationshipCache,
    queue: &dyn RepairQueue,
    a: UserId,
    b: UserId,
) -> bool {
    match mark_verified(db, cache, a, b).await {
        Ok(_) => false,
        Err(e) => {
            schedule(queue, RepairJob::MarkFriends { uid_a: a, uid_b: b }, &e).await;
            true
        }
    }
}
