//! The friend-request handshake.
//!
//! Requests live per ordered pair and are never deleted. Acceptance writes
//! the request and both directed edges in one transaction; the cache is
//! only touched after that transaction commits.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use super::mark_or_repair;
use crate::application::cache::RelationshipCache;
use crate::domain::error::DomainError;
use crate::domain::friend::{is_mutual, FriendRelationship, FriendStatus};
use crate::domain::id::{RequestId, UserId};
use crate::domain::request::{AddFriendStatus, ConfirmAction, FriendRequest, RequestStatus};
use crate::error::{Error, Result};
use crate::port::outbound::queue::RepairQueue;
use crate::port::outbound::store::{Database, Repository};
use crate::port::outbound::user::{UserDirectory, UserProfile};

/// Result of [`FriendRequestWorkflow::request_friend`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestOutcome {
    pub status: AddFriendStatus,
    /// The pending request, when one exists after the call.
    pub request: Option<FriendRequest>,
    /// The cache write after an auto-complete was deferred to the repair
    /// queue.
    pub repair_pending: bool,
}

impl RequestOutcome {
    fn settled(status: AddFriendStatus) -> Self {
        Self {
            status,
            request: None,
            repair_pending: false,
        }
    }

    fn pending(status: AddFriendStatus, request: FriendRequest) -> Self {
        Self {
            status,
            request: Some(request),
            repair_pending: false,
        }
    }
}

/// Result of [`FriendRequestWorkflow::confirm`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmOutcome {
    pub request: FriendRequest,
    pub repair_pending: bool,
}

/// An incoming request decorated with the requester's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestView {
    pub request: FriendRequest,
    pub profile: Option<UserProfile>,
}

/// What the accept transaction did.
enum Acceptance {
    /// Both edges were already FRIEND; only the request changed.
    AlreadyMutual,
    /// One or both edges were written.
    EdgesWritten,
}

pub struct FriendRequestWorkflow<D> {
    db: Arc<D>,
    cache: RelationshipCache,
    queue: Arc<dyn RepairQueue>,
    users: Arc<dyn UserDirectory>,
    max_friends: i64,
}

impl<D: Database> FriendRequestWorkflow<D> {
    pub fn new(
        db: Arc<D>,
        cache: RelationshipCache,
        queue: Arc<dyn RepairQueue>,
        users: Arc<dyn UserDirectory>,
        max_friends: i64,
    ) -> Self {
        Self {
            db,
            cache,
            queue,
            users,
            max_friends,
        }
    }

    /// Ask to befriend `target`.
    ///
    /// Blocks in either direction are reported without mutating anything.
    /// If `target` already has a FRIEND or UNBLOCKED edge towards
    /// `requester`, the requester's edge is upgraded directly; otherwise a
    /// request is created, reported as already pending, or re-opened. Only
    /// an upgrade that makes the pair mutual is cached.
    pub async fn request_friend(&self, requester: UserId, target: UserId) -> Result<RequestOutcome> {
        if requester == target {
            return Err(DomainError::SelfRelationship(requester.value()).into());
        }
        if !self.users.exists(target).await? {
            return Err(Error::not_found(format_args!("user {target}")));
        }

        let max_friends = self.max_friends;
        let (mut outcome, now_mutual) = self.db.transaction(|repo| {
            let forward = repo.get_relationship(requester, target)?;
            let reverse = repo.get_relationship(target, requester)?;

            if reverse.as_ref().is_some_and(FriendRelationship::is_blocked) {
                return Ok((RequestOutcome::settled(AddFriendStatus::BlockedByFriend), false));
            }
            if forward.as_ref().is_some_and(FriendRelationship::is_blocked) {
                return Ok((RequestOutcome::settled(AddFriendStatus::BlockedByMe), false));
            }
            if is_mutual(forward.as_ref(), reverse.as_ref()) {
                return Ok((RequestOutcome::settled(AddFriendStatus::AlreadyFriends), false));
            }

            // Blocks were ruled out above, so a remaining non-stranger reverse
            // edge is FRIEND or UNBLOCKED.
            if let Some(reverse) = reverse.filter(|edge| !edge.is_stranger()) {
                upsert_friend(repo, requester, target, forward, max_friends)?;
                let outcome = RequestOutcome::settled(AddFriendStatus::AddFriendSuccess);
                return Ok((outcome, reverse.is_friend()));
            }

            ensure_below_limit(repo, requester, max_friends)?;
            Ok((open_request(repo, requester, target)?, false))
        })?;

        match outcome.status {
            AddFriendStatus::AddFriendSuccess if now_mutual => {
                info!(%requester, %target, "Friendship auto-completed");
                outcome.repair_pending =
                    mark_or_repair(self.db.as_ref(), &self.cache, self.queue.as_ref(), requester, target).await;
            }
            AddFriendStatus::AddFriendSuccess => {
                info!(%requester, %target, "Friend edge added, peer edge still UNBLOCKED");
            }
            AddFriendStatus::SendRequestSuccess => {
                info!(%requester, %target, "Friend request sent");
            }
            status => debug!(%requester, %target, ?status, "Friend request not sent"),
        }
        Ok(outcome)
    }

    /// Accept or reject a pending request addressed to `confirming`.
    ///
    /// Of two racing confirmations exactly one wins; the other fails with
    /// an invalid-state error and writes nothing.
    pub async fn confirm(
        &self,
        request_id: RequestId,
        confirming: UserId,
        action: ConfirmAction,
    ) -> Result<ConfirmOutcome> {
        let request = self
            .db
            .run(|repo| repo.get_request_by_id(request_id))?
            .filter(|r| r.is_addressed_to(confirming))
            .ok_or_else(|| Error::not_found(format_args!("friend request {request_id} for {confirming}")))?;
        if !request.is_requested() {
            return Err(DomainError::RequestNotPending {
                status: request.status,
            }
            .into());
        }

        match action {
            ConfirmAction::Reject => self.reject(request),
            ConfirmAction::Accept => self.accept(request).await,
        }
    }

    fn reject(&self, mut request: FriendRequest) -> Result<ConfirmOutcome> {
        let id = request.id;
        self.db.run(|repo| claim(repo, id, RequestStatus::Rejected))?;
        info!(request = %id, requester = %request.requester, "Friend request rejected");

        request.status = RequestStatus::Rejected;
        request.updated_at = Utc::now().timestamp();
        Ok(ConfirmOutcome {
            request,
            repair_pending: false,
        })
    }

    async fn accept(&self, mut request: FriendRequest) -> Result<ConfirmOutcome> {
        let (id, requester, target) = (request.id, request.requester, request.target);
        let max_friends = self.max_friends;

        let acceptance = self.db.transaction(|repo| {
            claim(repo, id, RequestStatus::Accepted)?;

            let forward = repo.get_relationship(requester, target)?;
            let reverse = repo.get_relationship(target, requester)?;
            if is_mutual(forward.as_ref(), reverse.as_ref()) {
                return Ok(Acceptance::AlreadyMutual);
            }

            upsert_friend(repo, requester, target, forward, max_friends)?;
            upsert_friend(repo, target, requester, reverse, max_friends)?;
            Ok(Acceptance::EdgesWritten)
        })?;

        request.status = RequestStatus::Accepted;
        request.updated_at = Utc::now().timestamp();

        let repair_pending = match acceptance {
            Acceptance::AlreadyMutual => {
                debug!(request = %id, "Pair already mutual, request marked accepted");
                false
            }
            Acceptance::EdgesWritten => {
                info!(request = %id, %requester, %target, "Friend request accepted");
                mark_or_repair(self.db.as_ref(), &self.cache, self.queue.as_ref(), requester, target).await
            }
        };

        Ok(ConfirmOutcome {
            request,
            repair_pending,
        })
    }

    /// The request `requester -> target`.
    pub async fn get_request(&self, requester: UserId, target: UserId) -> Result<FriendRequest> {
        self.db
            .run(|repo| repo.get_request(requester, target))?
            .ok_or_else(|| Error::not_found(format_args!("friend request {requester} -> {target}")))
    }

    /// Requests addressed to `target` with `status`, newest first.
    pub async fn list_incoming(&self, target: UserId, status: RequestStatus) -> Result<Vec<RequestView>> {
        let requests = self
            .db
            .run(|repo| repo.list_incoming_requests(target, status))?;

        let requesters: Vec<UserId> = requests.iter().map(|r| r.requester).collect();
        let mut profiles: HashMap<UserId, UserProfile> = self
            .users
            .profiles(&requesters)
            .await?
            .into_iter()
            .map(|p| (p.uid, p))
            .collect();

        Ok(requests
            .into_iter()
            .map(|request| RequestView {
                profile: profiles.remove(&request.requester),
                request,
            })
            .collect())
    }
}

/// Move a pending request to `next`, failing if someone else got there
/// first.
fn claim(repo: &mut dyn Repository, id: RequestId, next: RequestStatus) -> Result<()> {
    if repo.transition_request(id, RequestStatus::Requested, next)? {
        return Ok(());
    }
    let status = repo
        .get_request_by_id(id)?
        .map(|r| r.status)
        .ok_or_else(|| Error::not_found(format_args!("friend request {id}")))?;
    Err(DomainError::RequestNotPending { status }.into())
}

/// Create the request, report it as pending, or re-open a settled one.
fn open_request(repo: &mut dyn Repository, requester: UserId, target: UserId) -> Result<RequestOutcome> {
    match repo.get_request(requester, target)? {
        None => {
            let request = repo.create_request(requester, target)?;
            Ok(RequestOutcome::pending(AddFriendStatus::SendRequestSuccess, request))
        }
        Some(request) if request.is_requested() => {
            Ok(RequestOutcome::pending(AddFriendStatus::AlreadySentRequest, request))
        }
        Some(mut request) => {
            if !repo.transition_request(request.id, request.status, RequestStatus::Requested)? {
                return Err(Error::InvalidState(format!(
                    "friend request {} changed while being re-opened",
                    request.id
                )));
            }
            request.status = RequestStatus::Requested;
            request.updated_at = Utc::now().timestamp();
            Ok(RequestOutcome::pending(AddFriendStatus::SendRequestSuccess, request))
        }
    }
}

fn ensure_below_limit(repo: &mut dyn Repository, owner: UserId, max_friends: i64) -> Result<()> {
    if repo.count_friends(owner)? >= max_friends {
        return Err(Error::FriendLimitExceeded { limit: max_friends });
    }
    Ok(())
}

/// Make `owner -> peer` FRIEND, creating the edge if needed.
///
/// An edge that cannot legally become FRIEND (BLOCKED) fails the call,
/// which aborts the surrounding transaction.
fn upsert_friend(
    repo: &mut dyn Repository,
    owner: UserId,
    peer: UserId,
    existing: Option<FriendRelationship>,
    max_friends: i64,
) -> Result<()> {
    match existing {
        Some(edge) if edge.is_friend() => Ok(()),
        Some(mut edge) => {
            edge.set_status(FriendStatus::Friend)?;
            ensure_below_limit(repo, owner, max_friends)?;
            repo.update_relationship_status(&edge)
        }
        None => {
            ensure_below_limit(repo, owner, max_friends)?;
            repo.create_relationship(&FriendRelationship::new(owner, peer, FriendStatus::Friend))
        }
    }
}
