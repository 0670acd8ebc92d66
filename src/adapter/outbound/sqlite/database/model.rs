//! Database model types for Diesel ORM.
//!
//! Status enums are stored as their integer codes; decoding an unknown code
//! is reported as a persistence failure rather than guessed.

use diesel::prelude::*;

use super::schema::{chat_groups, friend_requests, friends, group_members, sessions, users};
use crate::domain::friend::{FriendRelationship, FriendStatus};
use crate::domain::group::{Group, GroupMember, GroupStatus, MemberRole, MemberStatus};
use crate::domain::id::{GroupId, RequestId, SessionId, UserId};
use crate::domain::request::{FriendRequest, RequestStatus};
use crate::domain::session::{Session, SessionKind};
use crate::error::Error;
use crate::port::outbound::user::UserProfile;

fn unknown_code(what: &str, code: i32) -> Error {
    Error::Persistence(format!("unknown {what} code {code}"))
}

/// Database row for a directed friend edge.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = friends)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FriendRow {
    pub id: i64,
    pub uid: i64,
    pub friend_uid: i64,
    pub status: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = friends)]
pub struct NewFriendRow {
    pub uid: i64,
    pub friend_uid: i64,
    pub status: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&FriendRelationship> for NewFriendRow {
    fn from(edge: &FriendRelationship) -> Self {
        Self {
            uid: edge.owner.value(),
            friend_uid: edge.peer.value(),
            status: edge.status.code(),
            created_at: edge.created_at,
            updated_at: edge.updated_at,
        }
    }
}

impl TryFrom<FriendRow> for FriendRelationship {
    type Error = Error;

    fn try_from(row: FriendRow) -> Result<Self, Self::Error> {
        let status =
            FriendStatus::from_code(row.status).ok_or_else(|| unknown_code("friend status", row.status))?;
        Ok(Self {
            owner: UserId::new(row.uid),
            peer: UserId::new(row.friend_uid),
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database row for a friend request.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = friend_requests)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FriendRequestRow {
    pub id: i64,
    pub uid: i64,
    pub friend_uid: i64,
    pub status: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = friend_requests)]
pub struct NewFriendRequestRow {
    pub uid: i64,
    pub friend_uid: i64,
    pub status: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<FriendRequestRow> for FriendRequest {
    type Error = Error;

    fn try_from(row: FriendRequestRow) -> Result<Self, Self::Error> {
        let status = RequestStatus::from_code(row.status)
            .ok_or_else(|| unknown_code("friend request status", row.status))?;
        Ok(Self {
            id: RequestId::new(row.id),
            requester: UserId::new(row.uid),
            target: UserId::new(row.friend_uid),
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database row for a group.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = chat_groups)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GroupRow {
    pub id: i64,
    pub owner_uid: i64,
    pub name: String,
    pub description: String,
    pub avatar: String,
    pub max_members: i32,
    pub member_count: i32,
    pub status: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Insertable group row. `member_count` is omitted and defaults to zero.
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = chat_groups)]
pub struct NewGroupRow {
    pub owner_uid: i64,
    pub name: String,
    pub description: String,
    pub avatar: String,
    pub max_members: i32,
    pub status: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<GroupRow> for Group {
    type Error = Error;

    fn try_from(row: GroupRow) -> Result<Self, Self::Error> {
        let status =
            GroupStatus::from_code(row.status).ok_or_else(|| unknown_code("group status", row.status))?;
        Ok(Self {
            id: GroupId::new(row.id),
            owner: UserId::new(row.owner_uid),
            name: row.name,
            description: row.description,
            avatar: row.avatar,
            max_members: row.max_members,
            member_count: row.member_count,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database row for a group membership.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = group_members)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GroupMemberRow {
    pub id: i64,
    pub gid: i64,
    pub uid: i64,
    pub role: i32,
    pub status: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = group_members)]
pub struct NewGroupMemberRow {
    pub gid: i64,
    pub uid: i64,
    pub role: i32,
    pub status: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl NewGroupMemberRow {
    pub fn from_member(member: &GroupMember, now: i64) -> Self {
        Self {
            gid: member.group.value(),
            uid: member.user.value(),
            role: member.role.code(),
            status: member.status.code(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl TryFrom<GroupMemberRow> for GroupMember {
    type Error = Error;

    fn try_from(row: GroupMemberRow) -> Result<Self, Self::Error> {
        Ok(Self {
            group: GroupId::new(row.gid),
            user: UserId::new(row.uid),
            role: MemberRole::from_code(row.role).ok_or_else(|| unknown_code("member role", row.role))?,
            status: MemberStatus::from_code(row.status)
                .ok_or_else(|| unknown_code("member status", row.status))?,
        })
    }
}

/// Database row for a session; doubles as the insertable form.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SessionRow {
    pub id: String,
    pub kind: i32,
    pub from_id: i64,
    pub to_id: i64,
    pub created_by: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&Session> for SessionRow {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.as_str().to_string(),
            kind: session.kind.code(),
            from_id: session.from_id,
            to_id: session.to_id,
            created_by: session.created_by.value(),
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

impl TryFrom<SessionRow> for Session {
    type Error = Error;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: SessionKind::from_code(row.kind).ok_or_else(|| unknown_code("session kind", row.kind))?,
            id: SessionId::new(row.id),
            from_id: row.from_id,
            to_id: row.to_id,
            created_by: UserId::new(row.created_by),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Read-only user row.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRow {
    pub uid: i64,
    pub name: String,
    pub avatar: String,
    pub status: i32,
}

impl UserRow {
    /// Status value of a deleted user.
    pub const DELETED: i32 = 1;

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.status == Self::DELETED
    }
}

impl From<UserRow> for UserProfile {
    fn from(row: UserRow) -> Self {
        Self {
            uid: UserId::new(row.uid),
            name: row.name,
            avatar: row.avatar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_friend_status_is_persistence_error() {
        let row = FriendRow {
            id: 1,
            uid: 1,
            friend_uid: 2,
            status: 42,
            created_at: 0,
            updated_at: 0,
        };

        let err = FriendRelationship::try_from(row).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::PersistenceFailure);
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn session_row_roundtrip() {
        let session = Session::open(SessionKind::SingleChat, 5, 3, UserId::new(5));
        let row = SessionRow::from(&session);
        assert_eq!(row.from_id, 3);

        let back = Session::try_from(row).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn deleted_users_are_flagged() {
        let row = UserRow {
            uid: 1,
            name: "ann".into(),
            avatar: String::new(),
            status: UserRow::DELETED,
        };
        assert!(row.is_deleted());
    }
}
