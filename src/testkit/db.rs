//! Temporary on-disk SQLite databases.
//!
//! File-backed rather than `:memory:` so every pooled connection, and every
//! thread in a concurrency test, sees the same data.

use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Text};
use tempfile::TempDir;

use crate::adapter::outbound::sqlite::database::connection::{
    create_pool_with, run_migrations, DbPool, PoolOptions,
};
use crate::adapter::outbound::sqlite::SqliteDatabase;

/// Migrated SQLite database in a temporary directory, removed on drop.
pub struct TempDb {
    _dir: TempDir,
    pool: DbPool,
}

impl TempDb {
    pub fn new() -> Self {
        Self::with_pool_size(8)
    }

    pub fn with_pool_size(max_size: u32) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("rapport.db");
        let url = path.display().to_string();

        let pool = create_pool_with(
            &url,
            PoolOptions {
                max_size,
                busy_timeout_ms: 10_000,
            },
        )
        .expect("create sqlite pool");
        run_migrations(&pool).expect("run migrations");

        // WAL mode improves concurrent writer behavior in tests.
        {
            let mut conn = pool.get().expect("get sqlite connection");
            diesel::sql_query("PRAGMA journal_mode=WAL")
                .execute(&mut conn)
                .expect("enable WAL mode");
        }

        Self { _dir: dir, pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn database(&self) -> SqliteDatabase {
        SqliteDatabase::new(self.pool.clone())
    }

    /// Insert a live user row.
    pub fn insert_user(&self, uid: i64, name: &str) {
        let mut conn = self.pool.get().expect("get sqlite connection");
        diesel::sql_query("INSERT INTO users (uid, name, avatar, status) VALUES (?, ?, '', 0)")
            .bind::<BigInt, _>(uid)
            .bind::<Text, _>(name)
            .execute(&mut conn)
            .expect("insert user");
    }

    /// Insert live users named `user-{uid}`.
    pub fn insert_users(&self, uids: &[i64]) {
        for uid in uids {
            self.insert_user(*uid, &format!("user-{uid}"));
        }
    }

    /// Mark a user as deleted.
    pub fn delete_user(&self, uid: i64) {
        let mut conn = self.pool.get().expect("get sqlite connection");
        diesel::sql_query("UPDATE users SET status = ? WHERE uid = ?")
            .bind::<Integer, _>(1)
            .bind::<BigInt, _>(uid)
            .execute(&mut conn)
            .expect("delete user");
    }
}

impl Default for TempDb {
    fn default() -> Self {
        Self::new()
    }
}
