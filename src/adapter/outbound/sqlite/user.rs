//! SQLite-backed user directory.

use async_trait::async_trait;
use diesel::prelude::*;

use crate::adapter::outbound::sqlite::database::connection::DbPool;
use crate::adapter::outbound::sqlite::database::model::UserRow;
use crate::adapter::outbound::sqlite::database::schema::users;
use crate::domain::id::UserId;
use crate::error::{Error, Result};
use crate::port::outbound::user::{UserDirectory, UserProfile};

/// Reads profiles from the `users` table. Deleted users are invisible.
pub struct SqliteUserDirectory {
    pool: DbPool,
}

impl SqliteUserDirectory {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for SqliteUserDirectory {
    async fn exists(&self, uid: UserId) -> Result<bool> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;

        let row: Option<UserRow> = users::table
            .find(uid.value())
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(row.is_some_and(|r| !r.is_deleted()))
    }

    async fn profiles(&self, uids: &[UserId]) -> Result<Vec<UserProfile>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;
        let raw: Vec<i64> = uids.iter().map(UserId::value).collect();

        let rows: Vec<UserRow> = users::table
            .filter(users::uid.eq_any(raw))
            .filter(users::status.ne(UserRow::DELETED))
            .select(UserRow::as_select())
            .load(&mut conn)?;

        Ok(rows.into_iter().map(UserProfile::from).collect())
    }
}
