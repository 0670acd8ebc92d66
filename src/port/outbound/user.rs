//! User lookup port.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::id::UserId;
use crate::error::Result;

/// Basic profile used to decorate relationship and member listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub uid: UserId,
    pub name: String,
    pub avatar: String,
}

/// Read-only view of the user service.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Whether `uid` names a live (not deleted) user.
    async fn exists(&self, uid: UserId) -> Result<bool>;

    /// Profiles for the given users; unknown IDs are skipped.
    async fn profiles(&self, uids: &[UserId]) -> Result<Vec<UserProfile>>;
}
