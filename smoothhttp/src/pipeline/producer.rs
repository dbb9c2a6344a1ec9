//! The unit of work a pipeline activates.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Produces one value per activation.
///
/// A producer is activated once per attempt, so each activation must start
/// a fresh request. `release` is called exactly once after the last
/// activation, whatever the outcome.
#[async_trait]
pub trait Producer<T>: Send + Sync {
    /// Runs one attempt. `attempt` is one-based.
    async fn activate(&self, attempt: u32) -> anyhow::Result<T>;

    /// Frees resources held across attempts.
    fn release(&self) {}
}

#[async_trait]
impl<T, P> Producer<T> for Arc<P>
where
    T: Send,
    P: Producer<T> + ?Sized,
{
    async fn activate(&self, attempt: u32) -> anyhow::Result<T> {
        (**self).activate(attempt).await
    }

    fn release(&self) {
        (**self).release();
    }
}

/// A producer backed by an async closure.
pub struct FnProducer<F> {
    activate: F,
}

impl<F> fmt::Debug for FnProducer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProducer").finish_non_exhaustive()
    }
}

/// Wraps an async closure as a [`Producer`].
pub fn from_fn<F, Fut, T>(activate: F) -> FnProducer<F>
where
    F: Fn(u32) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<T>> + Send,
{
    FnProducer { activate }
}

#[async_trait]
impl<F, Fut, T> Producer<T> for FnProducer<F>
where
    F: Fn(u32) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<T>> + Send,
    T: Send,
{
    async fn activate(&self, attempt: u32) -> anyhow::Result<T> {
        (self.activate)(attempt).await
    }
}
