//! Builders for domain primitives used across tests.

use crate::domain::friend::{FriendRelationship, FriendStatus};
use crate::domain::id::{GroupId, UserId};
use crate::port::outbound::store::Database;

/// Create a [`UserId`].
pub fn uid(n: i64) -> UserId {
    UserId::new(n)
}

/// Create a [`GroupId`].
pub fn gid(n: i64) -> GroupId {
    GroupId::new(n)
}

/// `n` user IDs starting at `first`.
pub fn users(first: i64, n: usize) -> Vec<UserId> {
    (first..).take(n).map(UserId::new).collect()
}

/// Insert the edge `owner -> peer` directly, bypassing every workflow.
pub fn insert_edge<D: Database>(db: &D, owner: i64, peer: i64, status: FriendStatus) {
    db.run(|repo| repo.create_relationship(&FriendRelationship::new(uid(owner), uid(peer), status)))
        .expect("insert relationship edge");
}

/// Insert both FRIEND edges for a pair.
pub fn befriend<D: Database>(db: &D, a: i64, b: i64) {
    insert_edge(db, a, b, FriendStatus::Friend);
    insert_edge(db, b, a, FriendStatus::Friend);
}

/// Current status of `owner -> peer`, if the edge exists.
pub fn edge_status<D: Database>(db: &D, owner: i64, peer: i64) -> Option<FriendStatus> {
    db.run(|repo| repo.get_relationship(uid(owner), uid(peer)))
        .expect("read relationship edge")
        .map(|edge| edge.status)
}
