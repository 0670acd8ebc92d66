//! Directed friend relationships and the friend-status state machine.
//!
//! Each user holds an independent status toward every peer they have
//! interacted with, so a pair of users is described by two edges. A pair
//! is *mutual friends* only when both edges are [`FriendStatus::Friend`].
//!
//! # Transition table
//!
//! | from \ to   | STRANGER | FRIEND     | BLOCKED | UNBLOCKED |
//! |-------------|----------|------------|---------|-----------|
//! | STRANGER    | -        | workflow   | yes     | no        |
//! | FRIEND      | yes      | -          | yes     | no        |
//! | BLOCKED     | yes      | no         | -       | yes       |
//! | UNBLOCKED   | yes      | workflow   | yes     | -         |
//!
//! "workflow" transitions are only performed by the friend-request
//! workflow; [`FriendStatus::direct_transition_to`] rejects them.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::UserId;

/// Status of one directed relationship edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FriendStatus {
    Stranger,
    Friend,
    Blocked,
    Unblocked,
}

impl FriendStatus {
    /// Stable integer code used for persistence.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Stranger => 0,
            Self::Friend => 1,
            Self::Blocked => 2,
            Self::Unblocked => 3,
        }
    }

    /// Decode a persisted status code.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Stranger),
            1 => Some(Self::Friend),
            2 => Some(Self::Blocked),
            3 => Some(Self::Unblocked),
            _ => None,
        }
    }

    /// Whether the transition table allows moving from `self` to `target`.
    ///
    /// A transition to the current status is never legal.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Stranger, Self::Friend | Self::Blocked)
                | (Self::Friend, Self::Stranger | Self::Blocked)
                | (Self::Blocked, Self::Unblocked | Self::Stranger)
                | (Self::Unblocked, Self::Friend | Self::Stranger | Self::Blocked)
        )
    }

    /// Validate a transition, returning the target status when legal.
    ///
    /// # Errors
    /// Returns [`DomainError::IllegalTransition`] if the table forbids it.
    pub fn transition_to(self, target: Self) -> Result<Self, DomainError> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(DomainError::IllegalTransition {
                from: self,
                to: target,
            })
        }
    }

    /// Validate a transition requested directly by a user rather than by
    /// the friend-request workflow.
    ///
    /// # Errors
    /// Returns [`DomainError::WorkflowOnly`] when the target is FRIEND, or
    /// [`DomainError::IllegalTransition`] if the table forbids it.
    pub fn direct_transition_to(self, target: Self) -> Result<Self, DomainError> {
        if target == Self::Friend {
            return Err(DomainError::WorkflowOnly { to: target });
        }
        self.transition_to(target)
    }

    /// True for the two statuses that end a mutual friendship.
    #[must_use]
    pub const fn ends_friendship(self) -> bool {
        matches!(self, Self::Stranger | Self::Blocked)
    }
}

impl fmt::Display for FriendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stranger => "STRANGER",
            Self::Friend => "FRIEND",
            Self::Blocked => "BLOCKED",
            Self::Unblocked => "UNBLOCKED",
        };
        f.write_str(s)
    }
}

/// One directed relationship edge `owner -> peer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRelationship {
    pub owner: UserId,
    pub peer: UserId,
    pub status: FriendStatus,
    /// Unix seconds.
    pub created_at: i64,
    /// Unix seconds.
    pub updated_at: i64,
}

impl FriendRelationship {
    /// Create a fresh edge stamped with the current time.
    #[must_use]
    pub fn new(owner: UserId, peer: UserId, status: FriendStatus) -> Self {
        let now = Utc::now().timestamp();
        Self {
            owner,
            peer,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn is_friend(&self) -> bool {
        self.status == FriendStatus::Friend
    }

    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.status == FriendStatus::Blocked
    }

    #[must_use]
    pub fn is_stranger(&self) -> bool {
        self.status == FriendStatus::Stranger
    }

    /// Apply a legal transition and bump `updated_at`.
    ///
    /// # Errors
    /// Returns the transition error and leaves the edge untouched.
    pub fn set_status(&mut self, status: FriendStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(status)?;
        self.updated_at = Utc::now().timestamp();
        Ok(())
    }
}

/// Order a pair of users so that either call order yields the same pair.
#[must_use]
pub fn canonical_pair(a: UserId, b: UserId) -> (UserId, UserId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// True when both directed edges exist and are FRIEND.
#[must_use]
pub fn is_mutual(forward: Option<&FriendRelationship>, reverse: Option<&FriendRelationship>) -> bool {
    forward.is_some_and(FriendRelationship::is_friend) && reverse.is_some_and(FriendRelationship::is_friend)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [FriendStatus; 4] = [
        FriendStatus::Stranger,
        FriendStatus::Friend,
        FriendStatus::Blocked,
        FriendStatus::Unblocked,
    ];

    #[test]
    fn same_status_is_never_legal() {
        for status in ALL {
            assert!(!status.can_transition_to(status), "{status} -> {status}");
        }
    }

    #[test]
    fn blocked_cannot_become_friend_directly() {
        assert!(!FriendStatus::Blocked.can_transition_to(FriendStatus::Friend));
        assert!(FriendStatus::Blocked.can_transition_to(FriendStatus::Unblocked));
        assert!(FriendStatus::Blocked.can_transition_to(FriendStatus::Stranger));
    }

    #[test]
    fn unblocked_only_follows_blocked() {
        for from in ALL {
            let legal = from.can_transition_to(FriendStatus::Unblocked);
            assert_eq!(legal, from == FriendStatus::Blocked, "{from} -> UNBLOCKED");
        }
    }

    #[test]
    fn blocked_reachable_from_every_other_status() {
        for from in ALL.into_iter().filter(|s| *s != FriendStatus::Blocked) {
            assert!(from.can_transition_to(FriendStatus::Blocked), "{from} -> BLOCKED");
        }
    }

    #[test]
    fn stranger_and_friend_are_mutually_reachable() {
        assert!(FriendStatus::Stranger.can_transition_to(FriendStatus::Friend));
        assert!(FriendStatus::Friend.can_transition_to(FriendStatus::Stranger));
    }

    #[test]
    fn direct_transition_rejects_friend() {
        let err = FriendStatus::Stranger
            .direct_transition_to(FriendStatus::Friend)
            .unwrap_err();
        assert_eq!(err, DomainError::WorkflowOnly { to: FriendStatus::Friend });

        assert_eq!(
            FriendStatus::Friend.direct_transition_to(FriendStatus::Blocked),
            Ok(FriendStatus::Blocked)
        );
    }

    #[test]
    fn codes_roundtrip() {
        for status in ALL {
            assert_eq!(FriendStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(FriendStatus::from_code(9), None);
    }

    #[test]
    fn set_status_rejects_illegal_move_without_mutation() {
        let mut edge = FriendRelationship::new(UserId::new(1), UserId::new(2), FriendStatus::Blocked);
        assert!(edge.set_status(FriendStatus::Friend).is_err());
        assert!(edge.is_blocked());

        edge.set_status(FriendStatus::Unblocked).unwrap();
        assert_eq!(edge.status, FriendStatus::Unblocked);
    }

    #[test]
    fn canonical_pair_is_order_independent() {
        let a = UserId::new(9);
        let b = UserId::new(3);
        assert_eq!(canonical_pair(a, b), canonical_pair(b, a));
        assert_eq!(canonical_pair(a, b), (b, a));
    }

    #[test]
    fn mutual_requires_both_edges() {
        let ab = FriendRelationship::new(UserId::new(1), UserId::new(2), FriendStatus::Friend);
        let ba = FriendRelationship::new(UserId::new(2), UserId::new(1), FriendStatus::Friend);
        let ba_stranger = FriendRelationship::new(UserId::new(2), UserId::new(1), FriendStatus::Stranger);

        assert!(is_mutual(Some(&ab), Some(&ba)));
        assert!(!is_mutual(Some(&ab), None));
        assert!(!is_mutual(Some(&ab), Some(&ba_stranger)));
    }
}
