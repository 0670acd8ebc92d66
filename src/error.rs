use std::fmt;

use thiserror::Error;

use crate::domain::error::DomainError;
use crate::domain::id::GroupId;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("group {group} cannot admit {requested} member(s), {available} seat(s) left")]
    CapacityExceeded {
        group: GroupId,
        requested: i32,
        available: i32,
    },

    #[error("friend limit of {limit} reached")]
    FriendLimitExceeded { limit: i64 },

    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("database error: {0}")]
    Persistence(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("repair queue error: {0}")]
    Queue(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        Error::Persistence(err.to_string())
    }
}

/// Caller-facing classification of every failure.
///
/// Expected business conditions (`NotFound`, `InvalidState`, `Forbidden`,
/// `CapacityExceeded`) are distinguishable from infrastructure faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Forbidden,
    CapacityExceeded,
    CacheUnavailable,
    PersistenceFailure,
}

impl ErrorKind {
    /// Business outcomes callers are expected to handle, as opposed to
    /// faults in a collaborator.
    #[must_use]
    pub const fn is_expected(self) -> bool {
        matches!(
            self,
            Self::NotFound | Self::InvalidState | Self::Forbidden | Self::CapacityExceeded
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not_found",
            Self::InvalidState => "invalid_state",
            Self::Forbidden => "forbidden",
            Self::CapacityExceeded => "capacity_exceeded",
            Self::CacheUnavailable => "cache_unavailable",
            Self::PersistenceFailure => "persistence_failure",
        };
        f.write_str(s)
    }
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidState(_) | Error::Domain(_) => ErrorKind::InvalidState,
            Error::Forbidden(_) => ErrorKind::Forbidden,
            Error::CapacityExceeded { .. } | Error::FriendLimitExceeded { .. } => {
                ErrorKind::CapacityExceeded
            }
            Error::CacheUnavailable(_) => ErrorKind::CacheUnavailable,
            Error::Persistence(_)
            | Error::Connection(_)
            | Error::Queue(_)
            | Error::Config(_)
            | Error::Json(_)
            | Error::Io(_) => ErrorKind::PersistenceFailure,
        }
    }

    pub(crate) fn not_found(what: impl fmt::Display) -> Self {
        Error::NotFound(what.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::friend::FriendStatus;

    #[test]
    fn domain_errors_are_invalid_state() {
        let err: Error = DomainError::IllegalTransition {
            from: FriendStatus::Blocked,
            to: FriendStatus::Friend,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(err.to_string().contains("BLOCKED"));
    }

    #[test]
    fn capacity_is_distinct_from_persistence() {
        let full = Error::CapacityExceeded {
            group: GroupId::new(1),
            requested: 1,
            available: 0,
        };
        let db: Error = diesel::result::Error::NotFound.into();

        assert_eq!(full.kind(), ErrorKind::CapacityExceeded);
        assert_eq!(db.kind(), ErrorKind::PersistenceFailure);
        assert!(full.kind().is_expected());
        assert!(!db.kind().is_expected());
    }

    #[test]
    fn cache_errors_are_not_expected_outcomes() {
        assert!(!Error::CacheUnavailable("down".into()).kind().is_expected());
    }
}
