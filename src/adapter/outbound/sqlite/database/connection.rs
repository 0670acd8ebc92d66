//! Database connection management using Diesel ORM.
//!
//! Provides connection pooling, migration support, and per-connection
//! pragmas for SQLite databases.

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::error::{Error, Result};

/// Embedded database migrations compiled from the migrations/ directory.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Type alias for a SQLite connection pool.
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// In-memory database URL. Every connection to it gets a private database.
pub const MEMORY_URL: &str = ":memory:";

/// Pool sizing and lock-wait settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    pub max_size: u32,
    pub busy_timeout_ms: u32,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_size: 5,
            busy_timeout_ms: 5000,
        }
    }
}

/// Applies [`configure_sqlite_connection`] to every pooled connection.
#[derive(Debug, Clone, Copy)]
struct SqliteCustomizer {
    busy_timeout_ms: u32,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqliteCustomizer {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        configure_sqlite_connection(conn, self.busy_timeout_ms).map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Create a connection pool with default options.
///
/// # Errors
/// Returns an error if the pool cannot be created.
pub fn create_pool(database_url: &str) -> Result<DbPool> {
    create_pool_with(database_url, PoolOptions::default())
}

/// Create a connection pool for the given database URL.
///
/// An in-memory URL is clamped to a single connection so every caller sees
/// the same database.
///
/// # Errors
/// Returns an error if the pool cannot be created.
pub fn create_pool_with(database_url: &str, options: PoolOptions) -> Result<DbPool> {
    let max_size = if database_url == MEMORY_URL {
        1
    } else {
        options.max_size.max(1)
    };
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    Pool::builder()
        .max_size(max_size)
        .connection_customizer(Box::new(SqliteCustomizer {
            busy_timeout_ms: options.busy_timeout_ms,
        }))
        .build(manager)
        .map_err(|e| Error::Connection(e.to_string()))
}

/// Run all pending database migrations.
///
/// # Errors
/// Returns an error if migrations fail.
pub fn run_migrations(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get().map_err(|e| Error::Connection(e.to_string()))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| Error::Persistence(format!("migration failed: {e}")))?;
    Ok(())
}

/// Configure SQLite connection pragmas.
///
/// Writers wait up to `busy_timeout_ms` for the database lock instead of
/// failing immediately, and foreign keys are enforced so deleting a group
/// cascades to its members.
///
/// # Errors
/// Returns an error if a pragma fails to apply.
pub fn configure_sqlite_connection(conn: &mut SqliteConnection, busy_timeout_ms: u32) -> QueryResult<()> {
    diesel::sql_query(format!("PRAGMA busy_timeout={busy_timeout_ms}")).execute(conn)?;
    diesel::sql_query("PRAGMA foreign_keys=ON").execute(conn)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(diesel::QueryableByName)]
    struct TableName {
        #[diesel(sql_type = diesel::sql_types::Text)]
        name: String,
    }

    fn table_names(pool: &DbPool) -> Vec<String> {
        let mut conn = pool.get().unwrap();
        diesel::sql_query(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '__diesel_schema_migrations' ORDER BY name",
        )
        .load::<TableName>(&mut conn)
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect()
    }

    #[test]
    fn memory_pool_is_clamped_to_one_connection() {
        let pool = create_pool_with(
            MEMORY_URL,
            PoolOptions {
                max_size: 8,
                busy_timeout_ms: 100,
            },
        )
        .unwrap();
        assert_eq!(pool.max_size(), 1);
    }

    #[test]
    fn run_migrations_creates_tables() {
        let pool = create_pool(MEMORY_URL).unwrap();
        run_migrations(&pool).unwrap();

        let tables = table_names(&pool);
        for expected in ["chat_groups", "friend_requests", "friends", "group_members", "sessions", "users"] {
            assert!(tables.contains(&expected.to_string()), "missing table {expected}");
        }
    }

    #[test]
    fn run_migrations_is_idempotent() {
        let pool = create_pool(MEMORY_URL).unwrap();
        run_migrations(&pool).unwrap();
        run_migrations(&pool).unwrap();

        assert_eq!(table_names(&pool).len(), 6);
    }

    #[test]
    fn pooled_connections_enforce_foreign_keys() {
        let pool = create_pool(MEMORY_URL).unwrap();
        run_migrations(&pool).unwrap();
        let mut conn = pool.get().unwrap();

        let orphan = diesel::sql_query(
            "INSERT INTO group_members (gid, uid, role, status, created_at, updated_at) VALUES (999, 1, 1, 0, 0, 0)",
        )
        .execute(&mut conn);
        assert!(orphan.is_err());
    }
}
