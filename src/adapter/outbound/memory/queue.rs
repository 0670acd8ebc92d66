//! In-process repair queue over a bounded tokio channel.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::port::outbound::queue::{RepairJob, RepairQueue};

/// Producer half of the repair channel.
///
/// Enqueueing never waits: a full channel is reported as
/// [`Error::Queue`] so request paths are not held up by a slow consumer.
#[derive(Debug, Clone)]
pub struct ChannelRepairQueue {
    sender: mpsc::Sender<RepairJob>,
}

impl ChannelRepairQueue {
    /// Create the queue and the receiver a [`RepairWorker`] consumes.
    ///
    /// [`RepairWorker`]: crate::application::repair::RepairWorker
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<RepairJob>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl RepairQueue for ChannelRepairQueue {
    async fn enqueue(&self, job: RepairJob) -> Result<()> {
        match self.sender.try_send(job) {
            Ok(()) => {
                debug!("Repair job enqueued");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(job)) => {
                Err(Error::Queue(format!("repair queue full, dropped {job}")))
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                Err(Error::Queue(format!("repair queue closed, dropped {job}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id::UserId;

    fn job(n: i64) -> RepairJob {
        RepairJob::MarkFriends {
            uid_a: UserId::new(n),
            uid_b: UserId::new(n + 1),
        }
    }

    #[tokio::test]
    async fn delivers_in_order() {
        let (queue, mut receiver) = ChannelRepairQueue::new(4);
        queue.enqueue(job(1)).await.unwrap();
        queue.enqueue(job(2)).await.unwrap();

        assert_eq!(receiver.recv().await, Some(job(1)));
        assert_eq!(receiver.recv().await, Some(job(2)));
    }

    #[tokio::test]
    async fn full_queue_is_an_error() {
        let (queue, _receiver) = ChannelRepairQueue::new(1);
        queue.enqueue(job(1)).await.unwrap();

        let err = queue.enqueue(job(2)).await.unwrap_err();
        assert!(matches!(err, Error::Queue(_)));
    }

    #[tokio::test]
    async fn closed_queue_is_an_error() {
        let (queue, receiver) = ChannelRepairQueue::new(1);
        drop(receiver);

        let err = queue.enqueue(job(1)).await.unwrap_err();
        assert!(err.to_string().contains("closed"));
    }
}
