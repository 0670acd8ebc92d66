//! Persistence ports for relationships, requests, groups and sessions.
//!
//! Store operations are synchronous and take `&mut self`: they always run
//! on one borrowed connection handed out by a [`Database`], either inside a
//! transaction or in autocommit mode. Absence is `Ok(None)`, never an error.

use crate::domain::friend::{FriendRelationship, FriendStatus};
use crate::domain::group::{Group, GroupMember, NewGroup};
use crate::domain::id::{GroupId, RequestId, SessionId, UserId};
use crate::domain::request::{FriendRequest, RequestStatus};
use crate::domain::session::Session;
use crate::error::Result;

/// Directed friend-status edges.
pub trait RelationshipStore {
    /// Get the edge `owner -> peer`.
    fn get_relationship(&mut self, owner: UserId, peer: UserId) -> Result<Option<FriendRelationship>>;

    /// Get the edge `owner -> peer` only if it currently has `status`.
    fn get_relationship_by_status(
        &mut self,
        owner: UserId,
        peer: UserId,
        status: FriendStatus,
    ) -> Result<Option<FriendRelationship>>;

    /// Insert a new edge. Fails if one already exists for the pair.
    fn create_relationship(&mut self, edge: &FriendRelationship) -> Result<()>;

    /// Persist `edge.status` and `edge.updated_at`.
    ///
    /// Does not re-check transition legality; callers validate first.
    fn update_relationship_status(&mut self, edge: &FriendRelationship) -> Result<()>;

    /// Number of FRIEND edges owned by `owner`.
    fn count_friends(&mut self, owner: UserId) -> Result<i64>;

    /// All edges owned by `owner`, oldest first.
    fn list_relationships(&mut self, owner: UserId) -> Result<Vec<FriendRelationship>>;
}

/// Friend request rows, unique per ordered pair.
pub trait FriendRequestStore {
    fn get_request(&mut self, requester: UserId, target: UserId) -> Result<Option<FriendRequest>>;

    fn get_request_by_id(&mut self, id: RequestId) -> Result<Option<FriendRequest>>;

    /// Insert a REQUESTED row for the pair.
    fn create_request(&mut self, requester: UserId, target: UserId) -> Result<FriendRequest>;

    /// Move a request from `expected` to `next` in one conditional write.
    ///
    /// Returns `false` when the row no longer has status `expected`, which
    /// is how concurrent confirmations lose the race.
    fn transition_request(
        &mut self,
        id: RequestId,
        expected: RequestStatus,
        next: RequestStatus,
    ) -> Result<bool>;

    /// Requests addressed to `target` with the given status.
    fn list_incoming_requests(
        &mut self,
        target: UserId,
        status: RequestStatus,
    ) -> Result<Vec<FriendRequest>>;
}

/// Group metadata and the bounded member counter.
pub trait GroupStore {
    fn get_group(&mut self, id: GroupId) -> Result<Option<Group>>;

    /// Insert a group with `member_count = 0`.
    fn create_group(&mut self, group: &NewGroup) -> Result<Group>;

    /// Persist name, description, avatar and status. Never touches the counter.
    fn update_group(&mut self, group: &Group) -> Result<()>;

    fn delete_group(&mut self, id: GroupId) -> Result<bool>;

    fn list_groups(&mut self, ids: &[GroupId]) -> Result<Vec<Group>>;

    /// Add `delta` to `member_count` only if the result stays within
    /// `max_members`.
    ///
    /// Returns `false` when the bound would be violated (zero rows
    /// affected); persistence faults are errors.
    fn increment_member_count(&mut self, id: GroupId, delta: i32) -> Result<bool>;

    /// Subtract `delta` from `member_count` only if the result stays
    /// non-negative.
    fn decrement_member_count(&mut self, id: GroupId, delta: i32) -> Result<bool>;
}

/// Membership rows.
pub trait GroupMemberStore {
    fn get_member(&mut self, group: GroupId, user: UserId) -> Result<Option<GroupMember>>;

    /// The subset of `candidates` that are already members.
    fn existing_members(&mut self, group: GroupId, candidates: &[UserId]) -> Result<Vec<UserId>>;

    fn insert_members(&mut self, members: &[GroupMember]) -> Result<()>;

    /// Delete the given members, returning how many rows went away.
    fn delete_members(&mut self, group: GroupId, users: &[UserId]) -> Result<usize>;

    fn delete_all_members(&mut self, group: GroupId) -> Result<usize>;

    fn list_members(&mut self, group: GroupId) -> Result<Vec<GroupMember>>;

    /// Memberships held by `user` across all groups.
    fn list_memberships(&mut self, user: UserId) -> Result<Vec<GroupMember>>;
}

/// Lazily created conversation records.
pub trait SessionStore {
    fn get_session(&mut self, id: &SessionId) -> Result<Option<Session>>;

    /// Insert a session. Returns `false` if a row with the same ID already
    /// exists, so racing creators can re-read instead of failing.
    fn create_session(&mut self, session: &Session) -> Result<bool>;
}

/// Every store operation, as seen through one connection.
pub trait Repository:
    RelationshipStore + FriendRequestStore + GroupStore + GroupMemberStore + SessionStore
{
}

impl<T> Repository for T where
    T: RelationshipStore + FriendRequestStore + GroupStore + GroupMemberStore + SessionStore + ?Sized
{
}

/// Transactional execution capability.
///
/// Constructed once at startup and shared by every service.
pub trait Database: Send + Sync {
    /// Run `f` on a pooled connection in autocommit mode.
    fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Repository) -> Result<T>;

    /// Run `f` atomically. Any error returned by `f` rolls back every write
    /// it made and is passed through to the caller unchanged.
    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Repository) -> Result<T>;
}
