//! Scripted producers.

use crate::pipeline::Producer;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

type ErrorFactory = Box<dyn Fn(u32) -> anyhow::Error + Send + Sync>;

/// A producer that fails a fixed number of activations, then succeeds.
///
/// Failures default to a connection reset, which classifies as `Network`.
pub struct ScriptedProducer<T> {
    value: Option<T>,
    failures: u32,
    error: ErrorFactory,
    delay: Option<Duration>,
    activations: AtomicU32,
    releases: AtomicU32,
    attempts: Mutex<Vec<u32>>,
}

impl<T> ScriptedProducer<T> {
    fn scripted(value: Option<T>, failures: u32) -> Self {
        Self {
            value,
            failures,
            error: Box::new(|_| {
                std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset").into()
            }),
            delay: None,
            activations: AtomicU32::new(0),
            releases: AtomicU32::new(0),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Succeeds on the first activation.
    #[must_use]
    pub fn succeeding(value: T) -> Self {
        Self::scripted(Some(value), 0)
    }

    /// Fails `failures` activations, then yields `value`.
    #[must_use]
    pub fn failing_then(failures: u32, value: T) -> Self {
        Self::scripted(Some(value), failures)
    }

    /// Fails every activation.
    #[must_use]
    pub fn always_failing() -> Self {
        Self::scripted(None, u32::MAX)
    }

    /// Replaces the failure. The closure receives the one-based attempt.
    #[must_use]
    pub fn with_error<F>(mut self, error: F) -> Self
    where
        F: Fn(u32) -> anyhow::Error + Send + Sync + 'static,
    {
        self.error = Box::new(error);
        self
    }

    /// Makes each activation sleep first.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of activations so far.
    #[must_use]
    pub fn activations(&self) -> u32 {
        self.activations.load(Ordering::SeqCst)
    }

    /// Number of times the release hook ran.
    #[must_use]
    pub fn releases(&self) -> u32 {
        self.releases.load(Ordering::SeqCst)
    }

    /// Attempt numbers passed to each activation, in order.
    #[must_use]
    pub fn attempts(&self) -> Vec<u32> {
        self.attempts.lock().clone()
    }
}

#[async_trait]
impl<T> Producer<T> for ScriptedProducer<T>
where
    T: Clone + Send + Sync,
{
    async fn activate(&self, attempt: u32) -> anyhow::Result<T> {
        let activation = self.activations.fetch_add(1, Ordering::SeqCst) + 1;
        self.attempts.lock().push(attempt);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.value {
            Some(value) if activation > self.failures => Ok(value.clone()),
            _ => Err((self.error)(attempt)),
        }
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

impl<T: fmt::Debug> fmt::Debug for ScriptedProducer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedProducer")
            .field("value", &self.value)
            .field("failures", &self.failures)
            .field("activations", &self.activations())
            .field("releases", &self.releases())
            .finish_non_exhaustive()
    }
}
