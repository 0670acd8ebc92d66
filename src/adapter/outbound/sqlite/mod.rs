//! SQLite persistence adapters.
//!
//! Provides the transactional [`Database`](crate::port::Database) used by
//! every service, and a read-only user directory over the `users` table.

pub mod database;
pub mod store;
pub mod user;

pub use store::{SqliteDatabase, SqliteRepository};
pub use user::SqliteUserDirectory;
