//! Consumer side of the repair queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::application::cache::{MembershipCache, RelationshipCache};
use crate::application::friend::{mark_verified, mutual_in_store};
use crate::error::{Error, Result};
use crate::port::outbound::queue::RepairJob;
use crate::port::outbound::store::Database;

/// Counters reported when the worker stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairStats {
    /// Jobs that eventually succeeded.
    pub completed: u64,
    /// Jobs dropped after exhausting every attempt.
    pub abandoned: u64,
}

/// Handle for stopping a spawned [`RepairWorker`].
pub struct RepairWorkerHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<RepairStats>,
}

impl RepairWorkerHandle {
    /// Stop the worker after it drains the jobs already queued.
    ///
    /// # Errors
    /// Returns an error if the worker task panicked.
    pub async fn shutdown(self) -> Result<RepairStats> {
        let _ = self.shutdown_tx.send(());
        self.task
            .await
            .map_err(|e| Error::Queue(format!("repair worker failed: {e}")))
    }
}

/// Applies repair jobs with bounded, linearly backed-off retries.
pub struct RepairWorker<D> {
    db: Arc<D>,
    relationships: RelationshipCache,
    membership: MembershipCache,
    max_attempts: u32,
    backoff: Duration,
}

impl<D: Database + 'static> RepairWorker<D> {
    pub fn new(
        db: Arc<D>,
        relationships: RelationshipCache,
        membership: MembershipCache,
        max_attempts: u32,
        backoff: Duration,
    ) -> Self {
        Self {
            db,
            relationships,
            membership,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Apply one job once.
    ///
    /// `mark-friends` reconciles the entry with the store: the marker is
    /// written and re-verified only while both edges are FRIEND, and cleared
    /// otherwise. A job that arrives after the pair split, or whose original
    /// write landed late, therefore never leaves a positive behind.
    pub async fn process(&self, job: &RepairJob) -> Result<()> {
        match *job {
            RepairJob::MarkFriends { uid_a, uid_b } => {
                if mutual_in_store(self.db.as_ref(), uid_a, uid_b)? {
                    mark_verified(self.db.as_ref(), &self.relationships, uid_a, uid_b).await?;
                } else {
                    debug!(job = %job, "Pair no longer mutual friends, clearing");
                    self.relationships.clear_friendship(uid_a, uid_b).await?;
                }
                Ok(())
            }
            RepairJob::ClearFriendship { uid_a, uid_b } => {
                self.relationships.clear_friendship(uid_a, uid_b).await
            }
            RepairJob::EvictMember { group, user } => self.membership.evict(group, user).await,
        }
    }

    /// Apply a job, retrying up to `max_attempts` times. Returns whether it
    /// eventually succeeded.
    pub async fn handle(&self, job: RepairJob) -> bool {
        for attempt in 1..=self.max_attempts {
            match self.process(&job).await {
                Ok(()) => {
                    debug!(job = %job, attempt, "Repair job applied");
                    return true;
                }
                Err(e) if attempt < self.max_attempts => {
                    warn!(job = %job, attempt, error = %e, "Repair attempt failed, retrying");
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                Err(e) => {
                    error!(job = %job, attempts = attempt, error = %e, "Repair job abandoned");
                }
            }
        }
        false
    }

    /// Consume `receiver` on a background task until shut down or until
    /// every producer is gone. Dropping the returned handle also stops it.
    pub fn spawn(self, mut receiver: mpsc::Receiver<RepairJob>) -> RepairWorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut stats = RepairStats::default();
            info!(max_attempts = self.max_attempts, "Repair worker started");

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        while let Ok(job) = receiver.try_recv() {
                            self.record(&mut stats, job).await;
                        }
                        break;
                    }
                    next = receiver.recv() => match next {
                        Some(job) => self.record(&mut stats, job).await,
                        None => break,
                    },
                }
            }

            info!(
                completed = stats.completed,
                abandoned = stats.abandoned,
                "Repair worker stopped"
            );
            stats
        });

        RepairWorkerHandle { shutdown_tx, task }
    }

    async fn record(&self, stats: &mut RepairStats, job: RepairJob) {
        if self.handle(job).await {
            stats.completed += 1;
        } else {
            stats.abandoned += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::ChannelRepairQueue;
    use crate::adapter::outbound::sqlite::SqliteDatabase;
    use crate::domain::friend::{FriendRelationship, FriendStatus};
    use crate::domain::id::UserId;
    use crate::domain::id::GroupId;
    use crate::port::outbound::cache::KeyValueCache;
    use crate::port::outbound::queue::RepairQueue;
    use crate::testkit::cache::FlakyCache;
    use crate::testkit::db::TempDb;

    fn uid(n: i64) -> UserId {
        UserId::new(n)
    }

    fn worker(db: &TempDb, cache: Arc<FlakyCache>) -> RepairWorker<SqliteDatabase> {
        let timeout = Duration::from_secs(1);
        RepairWorker::new(
            Arc::new(db.database()),
            RelationshipCache::new(cache.clone(), timeout),
            MembershipCache::new(cache, timeout),
            3,
            Duration::from_millis(1),
        )
    }

    fn befriend(db: &TempDb, a: i64, b: i64) {
        db.database()
            .run(|repo| {
                repo.create_relationship(&FriendRelationship::new(uid(a), uid(b), FriendStatus::Friend))?;
                repo.create_relationship(&FriendRelationship::new(uid(b), uid(a), FriendStatus::Friend))
            })
            .unwrap();
    }

    #[tokio::test]
    async fn mark_friends_requires_mutual_store_state() {
        let db = TempDb::new();
        let cache = Arc::new(FlakyCache::new());
        let worker = worker(&db, cache.clone());
        let relationships = RelationshipCache::new(cache.clone(), Duration::from_secs(1));

        let job = RepairJob::MarkFriends { uid_a: uid(1), uid_b: uid(2) };
        assert!(worker.handle(job.clone()).await);
        assert!(!relationships.is_friend_cached(uid(1), uid(2)).await.unwrap());

        befriend(&db, 1, 2);
        assert!(worker.handle(job).await);
        assert!(relationships.is_friend_cached(uid(1), uid(2)).await.unwrap());
    }

    #[tokio::test]
    async fn mark_job_withdraws_marker_for_split_pair() {
        let db = TempDb::new();
        let cache = Arc::new(FlakyCache::new());
        // A marker whose original write landed after the pair split.
        cache.inner().set("friend_status:1:2", b"1").await.unwrap();
        let worker = worker(&db, cache.clone());

        assert!(worker.handle(RepairJob::MarkFriends { uid_a: uid(1), uid_b: uid(2) }).await);
        assert!(!cache.inner().contains_key("friend_status:1:2"));
    }

    #[tokio::test]
    async fn retries_until_cache_recovers() {
        let db = TempDb::new();
        befriend(&db, 1, 2);
        let cache = Arc::new(FlakyCache::new());
        cache.fail_next(2);
        let worker = worker(&db, cache.clone());

        assert!(worker.handle(RepairJob::MarkFriends { uid_a: uid(2), uid_b: uid(1) }).await);
        assert!(cache.inner().contains_key("friend_status:1:2"));
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let db = TempDb::new();
        let cache = Arc::new(FlakyCache::new());
        cache.set_failing(true);
        let worker = worker(&db, cache);

        assert!(!worker.handle(RepairJob::EvictMember { group: GroupId::new(1), user: uid(2) }).await);
    }

    #[tokio::test]
    async fn spawned_worker_drains_on_shutdown() {
        let db = TempDb::new();
        let cache = Arc::new(FlakyCache::new());
        cache.inner().set("friend_status:1:2", b"1").await.unwrap();
        let (queue, receiver) = ChannelRepairQueue::new(8);
        let handle = worker(&db, cache.clone()).spawn(receiver);

        queue
            .enqueue(RepairJob::ClearFriendship { uid_a: uid(1), uid_b: uid(2) })
            .await
            .unwrap();
        let stats = handle.shutdown().await.unwrap();

        assert_eq!(stats.completed + stats.abandoned, 1);
        assert!(!cache.inner().contains_key("friend_status:1:2"));
    }
}
