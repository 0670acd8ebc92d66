//! SQLite implementation of the store ports.
//!
//! [`SqliteDatabase`] hands out one pooled connection per call. Transactions
//! use `BEGIN IMMEDIATE` so concurrent writers serialise on the write lock up
//! front instead of failing at commit time.

use chrono::Utc;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::BigInt;
use diesel::SqliteConnection;
use tracing::debug;

use crate::adapter::outbound::sqlite::database::connection::DbPool;
use crate::adapter::outbound::sqlite::database::model::{
    FriendRequestRow, FriendRow, GroupMemberRow, GroupRow, NewFriendRequestRow, NewFriendRow,
    NewGroupMemberRow, NewGroupRow, SessionRow,
};
use crate::adapter::outbound::sqlite::database::schema::{
    chat_groups, friend_requests, friends, group_members, sessions,
};
use crate::domain::friend::{FriendRelationship, FriendStatus};
use crate::domain::group::{Group, GroupMember, GroupStatus, NewGroup};
use crate::domain::id::{GroupId, RequestId, SessionId, UserId};
use crate::domain::request::{FriendRequest, RequestStatus};
use crate::domain::session::Session;
use crate::error::{Error, Result};
use crate::port::outbound::store::{
    Database, FriendRequestStore, GroupMemberStore, GroupStore, RelationshipStore, Repository,
    SessionStore,
};

#[derive(QueryableByName)]
struct LastInsertRowId {
    #[diesel(sql_type = BigInt)]
    id: i64,
}

fn last_insert_rowid(conn: &mut SqliteConnection) -> Result<i64> {
    let row: LastInsertRowId =
        diesel::sql_query("SELECT last_insert_rowid() AS id").get_result(conn)?;
    Ok(row.id)
}

fn now() -> i64 {
    Utc::now().timestamp()
}

fn non_positive_delta(delta: i32) -> Error {
    Error::InvalidState(format!("member count delta must be positive, got {delta}"))
}

/// Pool-backed [`Database`].
#[derive(Clone)]
pub struct SqliteDatabase {
    pool: DbPool,
}

impl SqliteDatabase {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl Database for SqliteDatabase {
    fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Repository) -> Result<T>,
    {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;
        let mut repo = SqliteRepository::new(&mut conn);
        f(&mut repo)
    }

    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Repository) -> Result<T>,
    {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;
        conn.immediate_transaction::<T, Error, _>(|conn| {
            let mut repo = SqliteRepository::new(conn);
            f(&mut repo)
        })
    }
}

/// Store operations over one borrowed connection.
pub struct SqliteRepository<'a> {
    conn: &'a mut SqliteConnection,
}

impl<'a> SqliteRepository<'a> {
    pub fn new(conn: &'a mut SqliteConnection) -> Self {
        Self { conn }
    }
}

impl RelationshipStore for SqliteRepository<'_> {
    fn get_relationship(&mut self, owner: UserId, peer: UserId) -> Result<Option<FriendRelationship>> {
        friends::table
            .filter(friends::uid.eq(owner.value()))
            .filter(friends::friend_uid.eq(peer.value()))
            .select(FriendRow::as_select())
            .first(self.conn)
            .optional()?
            .map(FriendRelationship::try_from)
            .transpose()
    }

    fn get_relationship_by_status(
        &mut self,
        owner: UserId,
        peer: UserId,
        status: FriendStatus,
    ) -> Result<Option<FriendRelationship>> {
        friends::table
            .filter(friends::uid.eq(owner.value()))
            .filter(friends::friend_uid.eq(peer.value()))
            .filter(friends::status.eq(status.code()))
            .select(FriendRow::as_select())
            .first(self.conn)
            .optional()?
            .map(FriendRelationship::try_from)
            .transpose()
    }

    fn create_relationship(&mut self, edge: &FriendRelationship) -> Result<()> {
        diesel::insert_into(friends::table)
            .values(NewFriendRow::from(edge))
            .execute(self.conn)?;
        debug!(owner = %edge.owner, peer = %edge.peer, status = %edge.status, "Created relationship");
        Ok(())
    }

    fn update_relationship_status(&mut self, edge: &FriendRelationship) -> Result<()> {
        let updated = diesel::update(
            friends::table
                .filter(friends::uid.eq(edge.owner.value()))
                .filter(friends::friend_uid.eq(edge.peer.value())),
        )
        .set((
            friends::status.eq(edge.status.code()),
            friends::updated_at.eq(edge.updated_at),
        ))
        .execute(self.conn)?;

        if updated == 0 {
            return Err(Error::not_found(format_args!(
                "relationship {} -> {}",
                edge.owner, edge.peer
            )));
        }
        debug!(owner = %edge.owner, peer = %edge.peer, status = %edge.status, "Updated relationship");
        Ok(())
    }

    fn count_friends(&mut self, owner: UserId) -> Result<i64> {
        let count = friends::table
            .filter(friends::uid.eq(owner.value()))
            .filter(friends::status.eq(FriendStatus::Friend.code()))
            .count()
            .get_result(self.conn)?;
        Ok(count)
    }

    fn list_relationships(&mut self, owner: UserId) -> Result<Vec<FriendRelationship>> {
        friends::table
            .filter(friends::uid.eq(owner.value()))
            .order(friends::id.asc())
            .select(FriendRow::as_select())
            .load(self.conn)?
            .into_iter()
            .map(FriendRelationship::try_from)
            .collect()
    }
}

impl FriendRequestStore for SqliteRepository<'_> {
    fn get_request(&mut self, requester: UserId, target: UserId) -> Result<Option<FriendRequest>> {
        friend_requests::table
            .filter(friend_requests::uid.eq(requester.value()))
            .filter(friend_requests::friend_uid.eq(target.value()))
            .select(FriendRequestRow::as_select())
            .first(self.conn)
            .optional()?
            .map(FriendRequest::try_from)
            .transpose()
    }

    fn get_request_by_id(&mut self, id: RequestId) -> Result<Option<FriendRequest>> {
        friend_requests::table
            .find(id.value())
            .select(FriendRequestRow::as_select())
            .first(self.conn)
            .optional()?
            .map(FriendRequest::try_from)
            .transpose()
    }

    fn create_request(&mut self, requester: UserId, target: UserId) -> Result<FriendRequest> {
        let now = now();
        diesel::insert_into(friend_requests::table)
            .values(NewFriendRequestRow {
                uid: requester.value(),
                friend_uid: target.value(),
                status: RequestStatus::Requested.code(),
                created_at: now,
                updated_at: now,
            })
            .execute(self.conn)?;
        let id = RequestId::new(last_insert_rowid(self.conn)?);
        debug!(request = %id, %requester, %target, "Created friend request");

        Ok(FriendRequest {
            id,
            requester,
            target,
            status: RequestStatus::Requested,
            created_at: now,
            updated_at: now,
        })
    }

    fn transition_request(
        &mut self,
        id: RequestId,
        expected: RequestStatus,
        next: RequestStatus,
    ) -> Result<bool> {
        let updated = diesel::update(
            friend_requests::table
                .filter(friend_requests::id.eq(id.value()))
                .filter(friend_requests::status.eq(expected.code())),
        )
        .set((
            friend_requests::status.eq(next.code()),
            friend_requests::updated_at.eq(now()),
        ))
        .execute(self.conn)?;
        Ok(updated == 1)
    }

    fn list_incoming_requests(
        &mut self,
        target: UserId,
        status: RequestStatus,
    ) -> Result<Vec<FriendRequest>> {
        friend_requests::table
            .filter(friend_requests::friend_uid.eq(target.value()))
            .filter(friend_requests::status.eq(status.code()))
            .order(friend_requests::updated_at.desc())
            .select(FriendRequestRow::as_select())
            .load(self.conn)?
            .into_iter()
            .map(FriendRequest::try_from)
            .collect()
    }
}

impl GroupStore for SqliteRepository<'_> {
    fn get_group(&mut self, id: GroupId) -> Result<Option<Group>> {
        chat_groups::table
            .find(id.value())
            .select(GroupRow::as_select())
            .first(self.conn)
            .optional()?
            .map(Group::try_from)
            .transpose()
    }

    fn create_group(&mut self, group: &NewGroup) -> Result<Group> {
        let now = now();
        diesel::insert_into(chat_groups::table)
            .values(NewGroupRow {
                owner_uid: group.owner.value(),
                name: group.name.clone(),
                description: group.description.clone(),
                avatar: group.avatar.clone(),
                max_members: group.max_members,
                status: GroupStatus::Active.code(),
                created_at: now,
                updated_at: now,
            })
            .execute(self.conn)?;
        let id = GroupId::new(last_insert_rowid(self.conn)?);

        self.get_group(id)?
            .ok_or_else(|| Error::Persistence(format!("group {id} vanished after insert")))
    }

    fn update_group(&mut self, group: &Group) -> Result<()> {
        let updated = diesel::update(chat_groups::table.find(group.id.value()))
            .set((
                chat_groups::name.eq(&group.name),
                chat_groups::description.eq(&group.description),
                chat_groups::avatar.eq(&group.avatar),
                chat_groups::status.eq(group.status.code()),
                chat_groups::updated_at.eq(now()),
            ))
            .execute(self.conn)?;

        if updated == 0 {
            return Err(Error::not_found(format_args!("group {}", group.id)));
        }
        Ok(())
    }

    fn delete_group(&mut self, id: GroupId) -> Result<bool> {
        let deleted = diesel::delete(chat_groups::table.find(id.value())).execute(self.conn)?;
        Ok(deleted > 0)
    }

    fn list_groups(&mut self, ids: &[GroupId]) -> Result<Vec<Group>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i64> = ids.iter().map(GroupId::value).collect();
        chat_groups::table
            .filter(chat_groups::id.eq_any(raw))
            .order(chat_groups::id.asc())
            .select(GroupRow::as_select())
            .load(self.conn)?
            .into_iter()
            .map(Group::try_from)
            .collect()
    }

    fn increment_member_count(&mut self, id: GroupId, delta: i32) -> Result<bool> {
        if delta <= 0 {
            return Err(non_positive_delta(delta));
        }
        // The bound is part of the WHERE clause: the read and the write are
        // one statement, so no interleaving can push the count past the cap.
        let updated = diesel::update(
            chat_groups::table
                .filter(chat_groups::id.eq(id.value()))
                .filter((chat_groups::member_count + delta).le(chat_groups::max_members)),
        )
        .set((
            chat_groups::member_count.eq(chat_groups::member_count + delta),
            chat_groups::updated_at.eq(now()),
        ))
        .execute(self.conn)?;
        Ok(updated == 1)
    }

    fn decrement_member_count(&mut self, id: GroupId, delta: i32) -> Result<bool> {
        if delta <= 0 {
            return Err(non_positive_delta(delta));
        }
        let updated = diesel::update(
            chat_groups::table
                .filter(chat_groups::id.eq(id.value()))
                .filter(chat_groups::member_count.ge(delta)),
        )
        .set((
            chat_groups::member_count.eq(chat_groups::member_count - delta),
            chat_groups::updated_at.eq(now()),
        ))
        .execute(self.conn)?;
        Ok(updated == 1)
    }
}

impl GroupMemberStore for SqliteRepository<'_> {
    fn get_member(&mut self, group: GroupId, user: UserId) -> Result<Option<GroupMember>> {
        group_members::table
            .filter(group_members::gid.eq(group.value()))
            .filter(group_members::uid.eq(user.value()))
            .select(GroupMemberRow::as_select())
            .first(self.conn)
            .optional()?
            .map(GroupMember::try_from)
            .transpose()
    }

    fn existing_members(&mut self, group: GroupId, candidates: &[UserId]) -> Result<Vec<UserId>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i64> = candidates.iter().map(UserId::value).collect();
        let found: Vec<i64> = group_members::table
            .filter(group_members::gid.eq(group.value()))
            .filter(group_members::uid.eq_any(raw))
            .select(group_members::uid)
            .load(self.conn)?;
        Ok(found.into_iter().map(UserId::new).collect())
    }

    fn insert_members(&mut self, members: &[GroupMember]) -> Result<()> {
        if members.is_empty() {
            return Ok(());
        }
        let now = now();
        let rows: Vec<NewGroupMemberRow> = members
            .iter()
            .map(|m| NewGroupMemberRow::from_member(m, now))
            .collect();
        diesel::insert_into(group_members::table)
            .values(&rows)
            .execute(self.conn)?;
        Ok(())
    }

    fn delete_members(&mut self, group: GroupId, users: &[UserId]) -> Result<usize> {
        if users.is_empty() {
            return Ok(0);
        }
        let raw: Vec<i64> = users.iter().map(UserId::value).collect();
        let deleted = diesel::delete(
            group_members::table
                .filter(group_members::gid.eq(group.value()))
                .filter(group_members::uid.eq_any(raw)),
        )
        .execute(self.conn)?;
        Ok(deleted)
    }

    fn delete_all_members(&mut self, group: GroupId) -> Result<usize> {
        let deleted = diesel::delete(group_members::table.filter(group_members::gid.eq(group.value())))
            .execute(self.conn)?;
        Ok(deleted)
    }

    fn list_members(&mut self, group: GroupId) -> Result<Vec<GroupMember>> {
        group_members::table
            .filter(group_members::gid.eq(group.value()))
            .order(group_members::id.asc())
            .select(GroupMemberRow::as_select())
            .load(self.conn)?
            .into_iter()
            .map(GroupMember::try_from)
            .collect()
    }

    fn list_memberships(&mut self, user: UserId) -> Result<Vec<GroupMember>> {
        group_members::table
            .filter(group_members::uid.eq(user.value()))
            .order(group_members::gid.asc())
            .select(GroupMemberRow::as_select())
            .load(self.conn)?
            .into_iter()
            .map(GroupMember::try_from)
            .collect()
    }
}

impl SessionStore for SqliteRepository<'_> {
    fn get_session(&mut self, id: &SessionId) -> Result<Option<Session>> {
        sessions::table
            .find(id.as_str())
            .select(SessionRow::as_select())
            .first(self.conn)
            .optional()?
            .map(Session::try_from)
            .transpose()
    }

    fn create_session(&mut self, session: &Session) -> Result<bool> {
        match diesel::insert_into(sessions::table)
            .values(SessionRow::from(session))
            .execute(self.conn)
        {
            Ok(_) => Ok(true),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
