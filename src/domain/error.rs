//! Domain validation errors for core domain types.
//!
//! These errors are raised when a domain rule is violated before any
//! collaborator is touched. They surface to callers as
//! [`ErrorKind::InvalidState`](crate::error::ErrorKind::InvalidState).
//!
//! # Examples
//!
//! ```
//! use rapport::domain::error::DomainError;
//! use rapport::domain::friend::FriendStatus;
//!
//! let result = FriendStatus::Blocked.transition_to(FriendStatus::Friend);
//! assert!(matches!(result, Err(DomainError::IllegalTransition { .. })));
//! ```

use thiserror::Error;

use super::friend::FriendStatus;
use super::request::RequestStatus;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The friend-status transition table does not allow this move.
    #[error("cannot transition friend status from {from} to {to}")]
    IllegalTransition {
        /// Current status of the directed edge.
        from: FriendStatus,
        /// Requested status.
        to: FriendStatus,
    },

    /// Friend status may only become FRIEND through the request workflow.
    #[error("status {to} can only be reached through a friend request")]
    WorkflowOnly {
        /// Requested status.
        to: FriendStatus,
    },

    /// A user cannot hold a relationship with themselves.
    #[error("user {0} cannot befriend themselves")]
    SelfRelationship(i64),

    /// A friend request can only be confirmed while it is pending.
    #[error("friend request is {status}, expected REQUESTED")]
    RequestNotPending {
        /// Current request status.
        status: RequestStatus,
    },

    /// Group capacity must be positive.
    #[error("group capacity must be positive, got {0}")]
    NonPositiveCapacity(i32),
}
