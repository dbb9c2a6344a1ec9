//! Recording observers.

use crate::pipeline::Outcome;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;
use tokio::sync::Notify;

struct Recorded<T> {
    outcome: Outcome<T>,
    thread: ThreadId,
}

/// Captures every outcome delivered to it and the thread it arrived on.
///
/// Clones share the same record.
pub struct RecordingObserver<T> {
    records: Arc<Mutex<Vec<Recorded<T>>>>,
    notify: Arc<Notify>,
}

impl<T> Clone for RecordingObserver<T> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            notify: Arc::clone(&self.notify),
        }
    }
}

impl<T> Default for RecordingObserver<T> {
    fn default() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
        }
    }
}

impl<T: Send + 'static> RecordingObserver<T> {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an observer callback feeding this recorder.
    pub fn observer(&self) -> impl FnOnce(Outcome<T>) + Send + 'static {
        let recorder = self.clone();
        move |outcome| {
            recorder.records.lock().push(Recorded {
                outcome,
                thread: thread::current().id(),
            });
            recorder.notify.notify_waiters();
        }
    }

    /// Number of outcomes delivered so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.records.lock().len()
    }

    /// Threads the outcomes were delivered on, in delivery order.
    #[must_use]
    pub fn threads(&self) -> Vec<ThreadId> {
        self.records.lock().iter().map(|r| r.thread).collect()
    }

    /// Removes and returns the delivered outcomes.
    pub fn take(&self) -> Vec<Outcome<T>> {
        self.records.lock().drain(..).map(|r| r.outcome).collect()
    }

    /// Waits until at least `count` outcomes arrived. Returns false on timeout.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.notify.notified();
                if self.count() >= count {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_outcomes() {
        let recorder = RecordingObserver::<i32>::new();
        let observer = recorder.observer();

        observer(Ok(5));
        assert!(recorder.wait_for(1, Duration::from_millis(10)).await);
        assert_eq!(recorder.threads(), vec![thread::current().id()]);
        assert_eq!(recorder.take().pop().unwrap().unwrap(), 5);
        assert_eq!(recorder.count(), 0);
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let recorder = RecordingObserver::<()>::new();
        assert!(!recorder.wait_for(1, Duration::from_millis(10)).await);
    }
}
