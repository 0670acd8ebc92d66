//! Conversation kinds and deterministic session identifiers.
//!
//! A session identifier is `KKK|AAAAAAAAAAAAAAAAAAAABBBBBBBBBBBBBBBBBBBB`:
//! the 3-digit kind code, a `|` separator and two 20-digit zero-padded
//! participant segments. Derivation is a pure encoding; ordering of the
//! participants for single chats is the caller's job (see
//! [`SessionKind::participants`]).

use serde::{Deserialize, Serialize};

use super::id::{SessionId, UserId};

/// Separator between the kind code and the participant segments.
pub const SESSION_ID_SEPARATOR: char = '|';

/// Kind of conversation a session identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    SingleChat,
    GroupChat,
    Broadcast,
    Channel,
}

impl SessionKind {
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::SingleChat => 0,
            Self::GroupChat => 1,
            Self::Broadcast => 2,
            Self::Channel => 3,
        }
    }

    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::SingleChat),
            1 => Some(Self::GroupChat),
            2 => Some(Self::Broadcast),
            3 => Some(Self::Channel),
            _ => None,
        }
    }

    /// Order the participants the way the backing record stores them.
    ///
    /// Single chats put the lower ID first so both directions of a
    /// conversation share one session. Group chats carry the group ID in
    /// both positions.
    #[must_use]
    pub fn participants(self, from: i64, to: i64) -> (i64, i64) {
        match self {
            Self::SingleChat if from > to => (to, from),
            Self::GroupChat => (to, to),
            _ => (from, to),
        }
    }

    /// Encode the session identifier for this kind.
    #[must_use]
    pub fn derive(self, participant_a: i64, participant_b: i64) -> SessionId {
        let (first, second) = match self {
            Self::SingleChat | Self::Channel => (participant_a, participant_b),
            Self::GroupChat => (participant_b, 0),
            Self::Broadcast => (0, 0),
        };
        SessionId::new(format!(
            "{:03}{SESSION_ID_SEPARATOR}{first:020}{second:020}",
            self.code()
        ))
    }
}

/// Derive a session identifier from a raw kind code.
///
/// Unknown kind codes yield an empty string so they can never collide with
/// a real conversation.
///
/// ```
/// use rapport::domain::session::derive_session_id;
///
/// assert_eq!(
///     derive_session_id(0, 1, 2),
///     "000|0000000000000000000100000000000000000002"
/// );
/// assert_eq!(derive_session_id(256, 1, 2), "");
/// ```
#[must_use]
pub fn derive_session_id(kind: i32, participant_a: i64, participant_b: i64) -> String {
    match SessionKind::from_code(kind) {
        Some(kind) => kind.derive(participant_a, participant_b).as_str().to_string(),
        None => String::new(),
    }
}

/// Backing record of a conversation, created lazily on first use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub kind: SessionKind,
    pub from_id: i64,
    pub to_id: i64,
    pub created_by: UserId,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Session {
    /// Build the record for a conversation between `from` and `to`.
    #[must_use]
    pub fn open(kind: SessionKind, from: i64, to: i64, created_by: UserId) -> Self {
        let (from_id, to_id) = kind.participants(from, to);
        let now = chrono::Utc::now().timestamp();
        Self {
            id: kind.derive(from_id, to_id),
            kind,
            from_id,
            to_id,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}
