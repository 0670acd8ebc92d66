//! Repair queue that records jobs instead of delivering them.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::port::outbound::queue::{RepairJob, RepairQueue};

#[derive(Debug, Default)]
pub struct RecordingQueue {
    jobs: Mutex<Vec<RepairJob>>,
    closed: AtomicBool,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every enqueue from now on.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Jobs accepted so far, in order.
    pub fn jobs(&self) -> Vec<RepairJob> {
        self.jobs.lock().clone()
    }
}

#[async_trait]
impl RepairQueue for RecordingQueue {
    async fn enqueue(&self, job: RepairJob) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Queue(format!("queue closed, dropped {job}")));
        }
        self.jobs.lock().push(job);
        Ok(())
    }
}
