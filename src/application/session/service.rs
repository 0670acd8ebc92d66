//! Lazily created session records keyed by the derived identifier.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::id::{SessionId, UserId};
use crate::domain::session::{Session, SessionKind};
use crate::error::{Error, Result};
use crate::port::outbound::store::Database;

/// Read-then-create rounds before giving up on a contended session.
pub const MAX_ATTEMPTS: u32 = 2;

pub struct SessionService<D> {
    db: Arc<D>,
}

impl<D: Database> SessionService<D> {
    pub fn new(db: Arc<D>) -> Self {
        Self { db }
    }

    /// The identifier of the conversation, without touching the store.
    #[must_use]
    pub fn derive(kind: SessionKind, from: i64, to: i64) -> SessionId {
        let (a, b) = kind.participants(from, to);
        kind.derive(a, b)
    }

    /// Return the session for this conversation, creating it on first use.
    ///
    /// A creator that loses the insert race re-reads the winner's row.
    /// After [`MAX_ATTEMPTS`] rounds without a row the call fails.
    pub async fn get_or_create(
        &self,
        kind: SessionKind,
        from: i64,
        to: i64,
        created_by: UserId,
    ) -> Result<Session> {
        let candidate = Session::open(kind, from, to, created_by);

        for attempt in 1..=MAX_ATTEMPTS {
            if let Some(existing) = self.db.run(|repo| repo.get_session(&candidate.id))? {
                return Ok(existing);
            }
            if self.db.run(|repo| repo.create_session(&candidate))? {
                debug!(session = %candidate.id, %created_by, "Session created");
                return Ok(candidate);
            }
            warn!(session = %candidate.id, attempt, "Session insert lost a race, re-reading");
        }

        Err(Error::Persistence(format!(
            "session {} could be neither read nor created after {MAX_ATTEMPTS} attempts",
            candidate.id
        )))
    }
}
