//! Repair queue port for cache writes that failed after a commit.
//!
//! Jobs describe the desired end state rather than a delta, so delivering
//! one twice is harmless.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::id::{GroupId, UserId};
use crate::error::Result;

/// Idempotent cache reconciliation job.
///
/// Serialized as `{"operation": "mark-friends", "uid_a": 1, "uid_b": 2}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
pub enum RepairJob {
    /// Record the pair as mutual friends, if the store still agrees.
    MarkFriends { uid_a: UserId, uid_b: UserId },
    /// Drop any positive friendship entry for the pair.
    ClearFriendship { uid_a: UserId, uid_b: UserId },
    /// Drop a member's entry from the group membership bucket.
    EvictMember { group: GroupId, user: UserId },
}

impl RepairJob {
    /// Short operation name for logs.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::MarkFriends { .. } => "mark-friends",
            Self::ClearFriendship { .. } => "clear-friendship",
            Self::EvictMember { .. } => "evict-member",
        }
    }
}

impl fmt::Display for RepairJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MarkFriends { uid_a, uid_b } | Self::ClearFriendship { uid_a, uid_b } => {
                write!(f, "{}({uid_a}, {uid_b})", self.operation())
            }
            Self::EvictMember { group, user } => {
                write!(f, "{}({group}, {user})", self.operation())
            }
        }
    }
}

/// Producer side of the asynchronous, at-least-once repair channel.
#[async_trait]
pub trait RepairQueue: Send + Sync {
    /// Hand a job off for later processing.
    ///
    /// # Errors
    /// Returns [`Error::Queue`](crate::error::Error::Queue) if the queue is
    /// closed or full. Callers log this and move on.
    async fn enqueue(&self, job: RepairJob) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_payload_carries_operation_tag() {
        let job = RepairJob::MarkFriends {
            uid_a: UserId::new(1),
            uid_b: UserId::new(2),
        };
        let json = serde_json::to_value(&job).unwrap();

        assert_eq!(json["operation"], "mark-friends");
        assert_eq!(json["uid_a"], 1);
        assert_eq!(json["uid_b"], 2);

        let back: RepairJob = serde_json::from_value(json).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn display_names_operation() {
        let job = RepairJob::EvictMember {
            group: GroupId::new(5),
            user: UserId::new(8),
        };
        assert_eq!(job.to_string(), "evict-member(5, 8)");
    }
}
