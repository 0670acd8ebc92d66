//! Friend requests and the outcomes of asking to be friends.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::{RequestId, UserId};

/// Lifecycle of a friend request for one ordered pair.
///
/// Requests are never deleted; re-requesting overwrites the status back to
/// [`RequestStatus::Requested`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Requested,
    Accepted,
    Rejected,
}

impl RequestStatus {
    /// Stable integer code used for persistence.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Requested => 0,
            Self::Accepted => 1,
            Self::Rejected => 2,
        }
    }

    /// Decode a persisted status code.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Requested),
            1 => Some(Self::Accepted),
            2 => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Requested => "REQUESTED",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
        };
        f.write_str(s)
    }
}

/// A persisted friend request `requester -> target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRequest {
    pub id: RequestId,
    pub requester: UserId,
    pub target: UserId,
    pub status: RequestStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl FriendRequest {
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.status == RequestStatus::Requested
    }

    /// Whether `user` is the party allowed to confirm this request.
    #[must_use]
    pub fn is_addressed_to(&self, user: UserId) -> bool {
        self.target == user
    }
}

/// Decision taken by the target of a friend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmAction {
    Accept,
    Reject,
}

/// Business result of asking to befriend someone.
///
/// Blocked outcomes are normal results, not errors: nothing was mutated
/// and the caller decides what to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddFriendStatus {
    /// A new request was stored, or a settled one was re-opened.
    SendRequestSuccess,
    /// A pending request already exists for this ordered pair.
    AlreadySentRequest,
    /// The peer already considers the requester a friend; completed
    /// without a request.
    AddFriendSuccess,
    /// Both edges were already FRIEND.
    AlreadyFriends,
    /// The target has blocked the requester.
    BlockedByFriend,
    /// The requester has blocked the target.
    BlockedByMe,
}
