//! Groups with bounded capacity and their membership rows.
//!
//! `member_count` is only ever changed by the store's conditional counter
//! update, in the same transaction that inserts or deletes the matching
//! membership rows. Nothing in this module mutates it.

use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{GroupId, UserId};

/// Whether a group currently accepts messages from members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupStatus {
    #[default]
    Active,
    Silent,
}

impl GroupStatus {
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Active => 0,
            Self::Silent => 1,
        }
    }

    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Active),
            1 => Some(Self::Silent),
            _ => None,
        }
    }
}

/// Group metadata plus its capacity counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub owner: UserId,
    pub name: String,
    pub description: String,
    pub avatar: String,
    pub max_members: i32,
    pub member_count: i32,
    pub status: GroupStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Group {
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner == user
    }

    /// Seats left according to this snapshot.
    ///
    /// Only a hint for early rejection; admission is decided by the
    /// conditional counter update.
    #[must_use]
    pub fn remaining_capacity(&self) -> i32 {
        (self.max_members - self.member_count).max(0)
    }

    #[must_use]
    pub fn is_silent(&self) -> bool {
        self.status == GroupStatus::Silent
    }
}

/// Metadata for a group about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    pub owner: UserId,
    pub name: String,
    pub description: String,
    pub avatar: String,
    pub max_members: i32,
}

impl NewGroup {
    /// Build a new group definition.
    ///
    /// # Errors
    /// Returns [`DomainError::NonPositiveCapacity`] when `max_members < 1`;
    /// the owner always occupies one seat.
    pub fn try_new(
        owner: UserId,
        name: impl Into<String>,
        max_members: i32,
    ) -> Result<Self, DomainError> {
        if max_members < 1 {
            return Err(DomainError::NonPositiveCapacity(max_members));
        }
        Ok(Self {
            owner,
            name: name.into(),
            description: String::new(),
            avatar: String::new(),
            max_members,
        })
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = avatar.into();
        self
    }
}

/// Partial metadata update; `None` and empty strings leave a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub avatar: Option<String>,
}

impl GroupUpdate {
    /// Apply non-empty fields onto `group`. Returns whether anything changed.
    pub fn apply(&self, group: &mut Group) -> bool {
        let mut changed = false;
        for (field, value) in [
            (&mut group.name, &self.name),
            (&mut group.description, &self.description),
            (&mut group.avatar, &self.avatar),
        ] {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                if field.as_str() != v {
                    *field = v.to_string();
                    changed = true;
                }
            }
        }
        changed
    }
}

/// Role of a member inside a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Member,
}

impl MemberRole {
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Owner => 0,
            Self::Member => 1,
        }
    }

    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Owner),
            1 => Some(Self::Member),
            _ => None,
        }
    }
}

/// Whether a member may speak in the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    #[default]
    Active,
    Silent,
}

impl MemberStatus {
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Active => 0,
            Self::Silent => 1,
        }
    }

    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Active),
            1 => Some(Self::Silent),
            _ => None,
        }
    }
}

/// One membership row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub group: GroupId,
    pub user: UserId,
    pub role: MemberRole,
    pub status: MemberStatus,
}

impl GroupMember {
    #[must_use]
    pub fn owner(group: GroupId, user: UserId) -> Self {
        Self {
            group,
            user,
            role: MemberRole::Owner,
            status: MemberStatus::Active,
        }
    }

    #[must_use]
    pub fn member(group: GroupId, user: UserId) -> Self {
        Self {
            group,
            user,
            role: MemberRole::Member,
            status: MemberStatus::Active,
        }
    }
}
