//! Outstanding-task accounting
//!
//! The counter is incremented before a task is placed on any channel and
//! decremented exactly once after its final disposition (processed,
//! dropped on cancellation, or dropped by the recursion dedup). The
//! engine's closer awaits zero before closing the task channel; this is
//! the sole synchronization point for scan completion.

use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::Notify;

pub struct OutstandingTasks {
    count: AtomicI64,
    notify: Notify,
}

impl OutstandingTasks {
    pub fn new(initial: i64) -> Self {
        Self {
            count: AtomicI64::new(initial),
            notify: Notify::new(),
        }
    }

    /// Adds `n` (may be negative, e.g. when a producer drops unsent tasks
    /// on cancellation).
    pub fn add(&self, n: i64) {
        let prev = self.count.fetch_add(n, Ordering::AcqRel);
        if prev + n <= 0 {
            self.notify.notify_waiters();
        }
    }

    pub fn done(&self) {
        self.add(-1);
    }

    pub fn outstanding(&self) -> i64 {
        self.count.load(Ordering::Acquire)
    }

    /// Waits until the counter reaches zero. The counter must not be
    /// incremented from zero once a waiter has observed completion.
    pub async fn wait(&self) {
        loop {
            let mut notified = std::pin::pin!(self.notify.notified());
            notified.as_mut().enable();
            if self.count.load(Ordering::Acquire) <= 0 {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn wait_returns_when_counter_drains() {
        let tracker = Arc::new(OutstandingTasks::new(3));
        let waiter = {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move { tracker.wait().await })
        };

        tracker.done();
        tracker.done();
        tracker.done();

        waiter.await.expect("waiter should complete");
        assert_eq!(tracker.outstanding(), 0);
    }

    #[tokio::test]
    async fn wait_on_zero_returns_immediately() {
        let tracker = OutstandingTasks::new(0);
        tracker.wait().await;
    }
}
