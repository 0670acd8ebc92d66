//! Friendship checks, direct status changes and friend listings.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{mark_or_repair, mutual_in_store};
use crate::application::cache::RelationshipCache;
use crate::application::repair::schedule;
use crate::domain::error::DomainError;
use crate::domain::friend::{FriendRelationship, FriendStatus};
use crate::domain::id::UserId;
use crate::error::{Error, Result};
use crate::port::outbound::queue::{RepairJob, RepairQueue};
use crate::port::outbound::store::Database;
use crate::port::outbound::user::{UserDirectory, UserProfile};

/// A relationship edge decorated with the peer's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FriendView {
    pub relationship: FriendRelationship,
    /// `None` when the peer is unknown to the user directory.
    pub profile: Option<UserProfile>,
}

/// Result of a direct status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub relationship: FriendRelationship,
    /// The post-commit cache invalidation failed and was queued for repair.
    pub repair_pending: bool,
}

pub struct FriendService<D> {
    db: Arc<D>,
    cache: RelationshipCache,
    queue: Arc<dyn RepairQueue>,
    users: Arc<dyn UserDirectory>,
}

impl<D: Database> FriendService<D> {
    pub fn new(
        db: Arc<D>,
        cache: RelationshipCache,
        queue: Arc<dyn RepairQueue>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            db,
            cache,
            queue,
            users,
        }
    }

    /// Whether `a` and `b` are mutual friends.
    ///
    /// A cache hit answers immediately. A miss or a cache fault falls back
    /// to reading both edges; a confirmed positive is written back and
    /// re-verified against the store, so an unfriend committing while the
    /// write is in flight cannot leave a stale marker behind.
    pub async fn check_is_friend(&self, a: UserId, b: UserId) -> Result<bool> {
        match self.cache.is_friend_cached(a, b).await {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(e) => warn!(uid_a = %a, uid_b = %b, error = %e, "Friend cache read failed, using store"),
        }

        let mutual = mutual_in_store(self.db.as_ref(), a, b)?;
        if mutual {
            mark_or_repair(self.db.as_ref(), &self.cache, self.queue.as_ref(), a, b).await;
        }
        Ok(mutual)
    }

    /// Change `owner`'s edge towards `peer` outside the request workflow.
    ///
    /// FRIEND can only be reached through a friend request. Blocking a user
    /// with no prior edge creates one. Leaving FRIEND clears the cached
    /// positive both before the transaction and after it commits.
    pub async fn update_status(
        &self,
        owner: UserId,
        peer: UserId,
        status: FriendStatus,
    ) -> Result<StatusUpdate> {
        if owner == peer {
            return Err(DomainError::SelfRelationship(owner.value()).into());
        }
        if status == FriendStatus::Friend {
            return Err(DomainError::WorkflowOnly { to: status }.into());
        }

        let ends_friendship = status.ends_friendship();
        if ends_friendship {
            if let Err(e) = self.cache.clear_friendship(owner, peer).await {
                warn!(%owner, %peer, error = %e, "Pre-commit friend cache invalidation failed");
            }
        }

        let relationship = self.db.transaction(|repo| match repo.get_relationship(owner, peer)? {
            Some(mut edge) => {
                edge.status = edge.status.direct_transition_to(status)?;
                edge.updated_at = Utc::now().timestamp();
                repo.update_relationship_status(&edge)?;
                Ok(edge)
            }
            None if status == FriendStatus::Blocked => {
                let edge = FriendRelationship::new(owner, peer, status);
                repo.create_relationship(&edge)?;
                Ok(edge)
            }
            None => Err(Error::not_found(format_args!("relationship {owner} -> {peer}"))),
        })?;
        info!(%owner, %peer, status = %relationship.status, "Friend status updated");

        // A concurrent check may have re-populated the entry between the
        // first invalidation and the commit.
        let mut repair_pending = false;
        if ends_friendship {
            if let Err(e) = self.cache.clear_friendship(owner, peer).await {
                let job = RepairJob::ClearFriendship {
                    uid_a: owner,
                    uid_b: peer,
                };
                schedule(self.queue.as_ref(), job, &e).await;
                repair_pending = true;
            }
        }

        Ok(StatusUpdate {
            relationship,
            repair_pending,
        })
    }

    /// The edge `owner -> peer` with the peer's profile.
    pub async fn get_friend(&self, owner: UserId, peer: UserId) -> Result<FriendView> {
        let relationship = self
            .db
            .run(|repo| repo.get_relationship(owner, peer))?
            .ok_or_else(|| Error::not_found(format_args!("relationship {owner} -> {peer}")))?;
        let profile = self.users.profiles(&[peer]).await?.into_iter().next();

        Ok(FriendView {
            relationship,
            profile,
        })
    }

    /// Every edge owned by `owner`, optionally restricted to one status.
    pub async fn list_friends(
        &self,
        owner: UserId,
        status: Option<FriendStatus>,
    ) -> Result<Vec<FriendView>> {
        let edges: Vec<FriendRelationship> = self
            .db
            .run(|repo| repo.list_relationships(owner))?
            .into_iter()
            .filter(|edge| status.map_or(true, |s| edge.status == s))
            .collect();
        debug!(%owner, count = edges.len(), "Listed relationships");

        let peers: Vec<UserId> = edges.iter().map(|edge| edge.peer).collect();
        let mut profiles: HashMap<UserId, UserProfile> = self
            .users
            .profiles(&peers)
            .await?
            .into_iter()
            .map(|p| (p.uid, p))
            .collect();

        Ok(edges
            .into_iter()
            .map(|relationship| FriendView {
                profile: profiles.remove(&relationship.peer),
                relationship,
            })
            .collect())
    }
}
