//! Per-section configuration for storage, limits, cache and repair.

use std::time::Duration;

use serde::Deserialize;

use crate::adapter::outbound::sqlite::database::connection::PoolOptions;

/// SQLite database settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite file, or `:memory:`.
    ///
    /// Overridden by the `DATABASE_URL` environment variable.
    pub path: String,
    /// Maximum pooled connections.
    pub pool_size: u32,
    /// How long a writer waits for the database lock.
    pub busy_timeout_ms: u32,
}

impl DatabaseConfig {
    #[must_use]
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_size: self.pool_size,
            busy_timeout_ms: self.busy_timeout_ms,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "rapport.db".to_string(),
            pool_size: 5,
            busy_timeout_ms: 5000,
        }
    }
}

/// Group defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GroupsConfig {
    /// Capacity given to groups created without an explicit limit.
    pub default_max_members: i32,
}

impl Default for GroupsConfig {
    fn default() -> Self {
        Self {
            default_max_members: 500,
        }
    }
}

/// Friend limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FriendsConfig {
    /// Maximum FRIEND edges a single user may own.
    pub max_friends: i64,
}

impl Default for FriendsConfig {
    fn default() -> Self {
        Self { max_friends: 2000 }
    }
}

/// Cache call settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Deadline for a single cache call (default: 200).
    pub op_timeout_ms: u64,
}

impl CacheConfig {
    #[must_use]
    pub const fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { op_timeout_ms: 200 }
    }
}

/// Repair queue and worker settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Jobs buffered before producers start dropping them.
    pub queue_capacity: usize,
    /// Attempts per job before it is abandoned.
    pub max_attempts: u32,
    /// Base delay between attempts; attempt `n` waits `n * backoff_ms`.
    pub backoff_ms: u64,
}

impl RepairConfig {
    #[must_use]
    pub const fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            max_attempts: 5,
            backoff_ms: 100,
        }
    }
}
