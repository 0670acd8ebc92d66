//! Asynchronous reconciliation of cache writes that failed after commit.

use tracing::{error, warn};

use crate::error::Error;
use crate::port::outbound::queue::{RepairJob, RepairQueue};

pub mod worker;

pub use worker::{RepairStats, RepairWorker, RepairWorkerHandle};

/// Hand `job` to the repair queue after a cache write failed with `cause`.
///
/// A queueing failure is logged and swallowed: the queue is the only retry
/// mechanism.
pub(crate) async fn schedule(queue: &dyn RepairQueue, job: RepairJob, cause: &Error) {
    warn!(job = %job, error = %cause, "Cache write failed after commit, scheduling repair");
    if let Err(e) = queue.enqueue(job.clone()).await {
        error!(job = %job, error = %e, "Failed to enqueue repair job");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id::UserId;
    use crate::testkit::queue::RecordingQueue;

    #[tokio::test]
    async fn closed_queue_is_swallowed() {
        let queue = RecordingQueue::new();
        queue.close();
        let job = RepairJob::ClearFriendship {
            uid_a: UserId::new(1),
            uid_b: UserId::new(2),
        };

        schedule(&queue, job, &Error::CacheUnavailable("down".into())).await;
        assert!(queue.jobs().is_empty());
    }
}
