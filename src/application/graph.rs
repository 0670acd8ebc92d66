//! Caller-facing entry point for the social graph.
//!
//! [`SocialGraph`] owns one instance of every service, wired to the same
//! store, cache and repair queue, and converts every outcome into a
//! [`Response`]. Expected business conditions come back as an error kind
//! plus detail; they are never surfaced as faults.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error};

use crate::application::cache::{MembershipCache, RelationshipCache};
use crate::application::friend::{
    ConfirmOutcome, FriendRequestWorkflow, FriendService, FriendView, RequestOutcome, RequestView,
    StatusUpdate,
};
use crate::application::group::{GroupDetails, GroupMetadata, GroupService, MemberRemoval};
use crate::application::session::SessionService;
use crate::domain::friend::FriendStatus;
use crate::domain::group::{Group, GroupUpdate};
use crate::domain::id::{GroupId, RequestId, SessionId, UserId};
use crate::domain::request::{ConfirmAction, FriendRequest, RequestStatus};
use crate::domain::session::{self, SessionKind};
use crate::error::{Error, ErrorKind, Result};
use crate::port::outbound::cache::KeyValueCache;
use crate::port::outbound::queue::RepairQueue;
use crate::port::outbound::store::Database;
use crate::port::outbound::user::UserDirectory;

const REPAIR_PENDING: &str = "cache update deferred to the repair queue";

/// Tunables shared by the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphSettings {
    /// Per-user cap on FRIEND edges.
    pub max_friends: i64,
    /// Capacity of groups created without an explicit limit.
    pub default_max_members: i32,
    /// Deadline applied to every cache call.
    pub cache_op_timeout: Duration,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            max_friends: 2000,
            default_max_members: 500,
            cache_op_timeout: Duration::from_millis(200),
        }
    }
}

/// Structured outcome of a public operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response<T> {
    /// `None` on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Response<T> {
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            error: None,
            detail: None,
            data: Some(data),
        }
    }

    #[must_use]
    pub fn failure(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            error: Some(kind),
            detail: Some(detail.into()),
            data: None,
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    fn with_detail_if(mut self, condition: bool, detail: &str) -> Self {
        if condition {
            self.detail = Some(detail.to_string());
        }
        self
    }
}

/// Convert a service result, logging failures by severity.
fn respond<T>(operation: &'static str, result: Result<T>) -> Response<T> {
    match result {
        Ok(data) => Response::ok(data),
        Err(e) => {
            let kind = e.kind();
            if kind.is_expected() {
                debug!(operation, %kind, error = %e, "Operation rejected");
            } else {
                error!(operation, %kind, error = %e, "Operation failed");
            }
            Response::failure(kind, e.to_string())
        }
    }
}

pub struct SocialGraph<D> {
    friends: FriendService<D>,
    requests: FriendRequestWorkflow<D>,
    groups: GroupService<D>,
    sessions: SessionService<D>,
}

impl<D: Database> SocialGraph<D> {
    pub fn new(
        db: Arc<D>,
        cache: Arc<dyn KeyValueCache>,
        queue: Arc<dyn RepairQueue>,
        users: Arc<dyn UserDirectory>,
        settings: GraphSettings,
    ) -> Self {
        let relationships = RelationshipCache::new(cache.clone(), settings.cache_op_timeout);
        let membership = MembershipCache::new(cache, settings.cache_op_timeout);

        Self {
            friends: FriendService::new(
                db.clone(),
                relationships.clone(),
                queue.clone(),
                users.clone(),
            ),
            requests: FriendRequestWorkflow::new(
                db.clone(),
                relationships,
                queue.clone(),
                users,
                settings.max_friends,
            ),
            groups: GroupService::new(db.clone(), membership, queue, settings.default_max_members),
            sessions: SessionService::new(db),
        }
    }

    pub async fn request_friend(&self, requester: UserId, target: UserId) -> Response<RequestOutcome> {
        let result = self.requests.request_friend(requester, target).await;
        let pending = result.as_ref().is_ok_and(|o| o.repair_pending);
        respond("request_friend", result).with_detail_if(pending, REPAIR_PENDING)
    }

    pub async fn confirm_friend_request(
        &self,
        request_id: RequestId,
        confirming: UserId,
        action: ConfirmAction,
    ) -> Response<ConfirmOutcome> {
        let result = self.requests.confirm(request_id, confirming, action).await;
        let pending = result.as_ref().is_ok_and(|o| o.repair_pending);
        respond("confirm_friend_request", result).with_detail_if(pending, REPAIR_PENDING)
    }

    pub async fn check_is_friend(&self, a: UserId, b: UserId) -> Response<bool> {
        respond("check_is_friend", self.friends.check_is_friend(a, b).await)
    }

    pub async fn update_friend_status(
        &self,
        owner: UserId,
        peer: UserId,
        status: FriendStatus,
    ) -> Response<StatusUpdate> {
        let result = self.friends.update_status(owner, peer, status).await;
        let pending = result.as_ref().is_ok_and(|u| u.repair_pending);
        respond("update_friend_status", result).with_detail_if(pending, REPAIR_PENDING)
    }

    pub async fn get_friend(&self, owner: UserId, peer: UserId) -> Response<FriendView> {
        respond("get_friend", self.friends.get_friend(owner, peer).await)
    }

    pub async fn query_friend_list(
        &self,
        owner: UserId,
        status: Option<FriendStatus>,
    ) -> Response<Vec<FriendView>> {
        respond("query_friend_list", self.friends.list_friends(owner, status).await)
    }

    pub async fn get_friend_request(&self, requester: UserId, target: UserId) -> Response<FriendRequest> {
        respond("get_friend_request", self.requests.get_request(requester, target).await)
    }

    pub async fn query_friend_request_list(
        &self,
        target: UserId,
        status: RequestStatus,
    ) -> Response<Vec<RequestView>> {
        respond(
            "query_friend_request_list",
            self.requests.list_incoming(target, status).await,
        )
    }

    pub async fn create_group(
        &self,
        owner: UserId,
        name: &str,
        metadata: GroupMetadata,
        initial_members: &[UserId],
    ) -> Response<GroupDetails> {
        respond(
            "create_group",
            self.groups.create_group(owner, name, metadata, initial_members).await,
        )
    }

    pub async fn add_group_members(
        &self,
        group: GroupId,
        requester: UserId,
        candidates: &[UserId],
    ) -> Response<usize> {
        respond(
            "add_group_members",
            self.groups.add_members(group, requester, candidates).await,
        )
    }

    pub async fn remove_group_members(
        &self,
        group: GroupId,
        requester: UserId,
        candidates: &[UserId],
    ) -> Response<MemberRemoval> {
        let result = self.groups.remove_members(group, requester, candidates).await;
        let pending = result.as_ref().is_ok_and(|r| r.repair_pending);
        respond("remove_group_members", result).with_detail_if(pending, REPAIR_PENDING)
    }

    pub async fn get_group(&self, group: GroupId, with_members: bool) -> Response<GroupDetails> {
        respond("get_group", self.groups.get_group(group, with_members).await)
    }

    pub async fn list_groups(&self, user: UserId) -> Response<Vec<Group>> {
        respond("list_groups", self.groups.list_groups(user).await)
    }

    pub async fn update_group(
        &self,
        group: GroupId,
        requester: UserId,
        update: &GroupUpdate,
    ) -> Response<Group> {
        respond("update_group", self.groups.update_group(group, requester, update).await)
    }

    pub async fn delete_group(&self, group: GroupId, requester: UserId) -> Response<MemberRemoval> {
        let result = self.groups.delete_group(group, requester).await;
        let pending = result.as_ref().is_ok_and(|r| r.repair_pending);
        respond("delete_group", result).with_detail_if(pending, REPAIR_PENDING)
    }

    pub async fn is_group_member(&self, group: GroupId, user: UserId) -> Response<bool> {
        respond("is_group_member", self.groups.is_member(group, user).await)
    }

    /// Pure derivation; unknown kinds give an empty string.
    #[must_use]
    pub fn derive_session_id(&self, kind: i32, a: i64, b: i64) -> String {
        session::derive_session_id(kind, a, b)
    }

    /// Whether `from` may message `to`, returning the conversation's session
    /// ID and creating its backing record on first use.
    ///
    /// Single chats need mutual friendship and group chats need membership
    /// of group `to`.
    pub async fn check_send_message_ability(
        &self,
        kind: SessionKind,
        from: i64,
        to: i64,
    ) -> Response<SessionId> {
        respond(
            "check_send_message_ability",
            self.send_message_ability(kind, from, to).await,
        )
    }

    async fn send_message_ability(&self, kind: SessionKind, from: i64, to: i64) -> Result<SessionId> {
        let sender = UserId::new(from);
        match kind {
            SessionKind::SingleChat => {
                if !self.friends.check_is_friend(sender, UserId::new(to)).await? {
                    return Err(Error::Forbidden(format!("{from} and {to} are not friends")));
                }
            }
            SessionKind::GroupChat => {
                if !self.groups.is_member(GroupId::new(to), sender).await? {
                    return Err(Error::Forbidden(format!(
                        "user {from} is not a member of group {to}"
                    )));
                }
            }
            other => {
                return Err(Error::InvalidState(format!(
                    "messages cannot be sent to a {other:?} session"
                )));
            }
        }

        let created = self.sessions.get_or_create(kind, from, to, sender).await?;
        Ok(created.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::MemoryCache;
    use crate::adapter::outbound::sqlite::{SqliteDatabase, SqliteUserDirectory};
    use crate::testkit::db::TempDb;
    use crate::testkit::queue::RecordingQueue;

    fn graph(db: &TempDb) -> SocialGraph<SqliteDatabase> {
        SocialGraph::new(
            Arc::new(db.database()),
            Arc::new(MemoryCache::new()),
            Arc::new(RecordingQueue::new()),
            Arc::new(SqliteUserDirectory::new(db.pool().clone())),
            GraphSettings::default(),
        )
    }

    fn uid(n: i64) -> UserId {
        UserId::new(n)
    }

    #[test]
    fn failure_serializes_kind_and_detail() {
        let response: Response<bool> = Response::failure(ErrorKind::CapacityExceeded, "full");
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["error"], "capacity_exceeded");
        assert_eq!(json["detail"], "full");
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn expected_conditions_are_responses_not_faults() {
        let db = TempDb::new();
        let graph = graph(&db);

        let response = graph.request_friend(uid(1), uid(42)).await;
        assert_eq!(response.error, Some(ErrorKind::NotFound));

        let response = graph.get_group(GroupId::new(99), false).await;
        assert_eq!(response.error, Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn single_chat_requires_mutual_friendship() {
        let db = TempDb::new();
        db.insert_users(&[1, 2]);
        let graph = graph(&db);

        let denied = graph.check_send_message_ability(SessionKind::SingleChat, 2, 1).await;
        assert_eq!(denied.error, Some(ErrorKind::Forbidden));

        let sent = graph.request_friend(uid(1), uid(2)).await;
        let request = sent.data.unwrap().request.unwrap();
        let accepted = graph
            .confirm_friend_request(request.id, uid(2), ConfirmAction::Accept)
            .await;
        assert!(accepted.is_ok());

        let allowed = graph.check_send_message_ability(SessionKind::SingleChat, 2, 1).await;
        assert_eq!(
            allowed.data.map(|id| id.to_string()),
            Some(graph.derive_session_id(0, 1, 2))
        );
    }

    #[tokio::test]
    async fn group_chat_requires_membership() {
        let db = TempDb::new();
        let graph = graph(&db);
        let group = graph
            .create_group(uid(1), "g", GroupMetadata::default(), &[uid(2)])
            .await
            .data
            .unwrap()
            .group;

        let allowed = graph
            .check_send_message_ability(SessionKind::GroupChat, 2, group.id.value())
            .await;
        assert!(allowed.is_ok());

        let denied = graph
            .check_send_message_ability(SessionKind::GroupChat, 3, group.id.value())
            .await;
        assert_eq!(denied.error, Some(ErrorKind::Forbidden));

        let broadcast = graph.check_send_message_ability(SessionKind::Broadcast, 1, 0).await;
        assert_eq!(broadcast.error, Some(ErrorKind::InvalidState));
    }
}
