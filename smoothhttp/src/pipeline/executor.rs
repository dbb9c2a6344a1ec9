//! Execution of one logical request.
//!
//! [`ExecutionPipeline::run`] spawns the request on the background runtime,
//! drives it through the stages in [`super::stages`] and delivers the single
//! [`Outcome`] on the caller's [`CompletionContext`].

use super::context::{CompletionContext, Inline};
use super::producer::Producer;
use super::retry::RetryPolicy;
use super::stages::{self, DeliveryState, Outcome};
use crate::cancellation::CancellationToken;
use crate::classify::ErrorClassifier;
use crate::config::HttpConfig;
use crate::errors::{ClassifiedError, ErrorKind};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

/// Runs requests on a background runtime and delivers their outcomes.
#[derive(Clone)]
pub struct ExecutionPipeline {
    background: Handle,
    classifier: Arc<ErrorClassifier>,
    retry: Option<RetryPolicy>,
    attempt_timeout: Option<Duration>,
}

impl ExecutionPipeline {
    /// Creates a pipeline whose work runs on `background`.
    #[must_use]
    pub fn new(background: Handle) -> Self {
        Self {
            background,
            classifier: Arc::new(ErrorClassifier::new()),
            retry: None,
            attempt_timeout: None,
        }
    }

    /// Creates a pipeline on `background` configured from an [`HttpConfig`].
    #[must_use]
    pub fn from_config(background: Handle, config: &HttpConfig) -> Self {
        let mut pipeline = Self::new(background);
        pipeline.retry = config.retry_policy();
        pipeline.attempt_timeout = config.attempt_timeout();
        pipeline
    }

    /// Sets the default retry policy used by [`submit`](Self::submit).
    #[must_use]
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Bounds each activation. Elapsed attempts fail with `Timeout`.
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Replaces the error classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    /// The configured retry policy, present only when retries are enabled.
    #[must_use]
    pub fn retry_policy(&self) -> Option<&RetryPolicy> {
        self.retry.as_ref()
    }

    /// The per-activation timeout, if any.
    #[must_use]
    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout
    }

    /// Runs `producer` with the configured retry policy.
    pub fn submit<T, P, F>(
        &self,
        producer: P,
        completion: Arc<dyn CompletionContext>,
        observer: F,
    ) -> Subscription
    where
        T: Send + 'static,
        P: Producer<T> + 'static,
        F: FnOnce(Outcome<T>) + Send + 'static,
    {
        self.run(producer, completion, self.retry.clone(), observer)
    }

    /// Runs `producer` on the background runtime and delivers its outcome on
    /// `completion` exactly once, unless cancelled first.
    ///
    /// Delivery is only as reliable as `completion`: an [`EventLoop`] that
    /// has shut down drops the outcome, and the subscription stays pending.
    ///
    /// [`EventLoop`]: super::EventLoop
    pub fn run<T, P, F>(
        &self,
        producer: P,
        completion: Arc<dyn CompletionContext>,
        retry: Option<RetryPolicy>,
        observer: F,
    ) -> Subscription
    where
        T: Send + 'static,
        P: Producer<T> + 'static,
        F: FnOnce(Outcome<T>) + Send + 'static,
    {
        let token = CancellationToken::new();
        let delivery = Arc::new(DeliveryState::new());
        let request_id = Uuid::new_v4();
        let span = info_span!("request", request_id = %request_id);

        let classifier = Arc::clone(&self.classifier);
        let timeout = self.attempt_timeout;
        let task_token = token.clone();
        let task_delivery = Arc::clone(&delivery);
        let producer = Arc::new(producer);

        let task = self.background.spawn(
            async move {
                let guard = stages::release_on_completion::<T, _>(Arc::clone(&producer));
                let outcome = stages::retry(
                    producer.as_ref(),
                    retry.as_ref(),
                    &classifier,
                    timeout,
                    &task_token,
                )
                .await;
                guard.release();

                match outcome {
                    Some(outcome) if !task_token.is_cancelled() => {
                        stages::hand_off(completion.as_ref(), task_delivery, outcome, observer);
                    }
                    _ => debug!("Request cancelled before delivery"),
                }
            }
            .instrument(span),
        );

        Subscription {
            request_id,
            token,
            delivery,
            task,
        }
    }

    /// Runs `producer` and awaits its outcome, delivered inline on the
    /// background runtime.
    ///
    /// If the background runtime drops the request before it produces an
    /// outcome (for example during shutdown), this resolves to an `Unknown`
    /// error.
    pub async fn call<T, P>(&self, producer: P, retry: Option<RetryPolicy>) -> Outcome<T>
    where
        T: Send + 'static,
        P: Producer<T> + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let _subscription = self.run(producer, Arc::new(Inline), retry, move |outcome| {
            let _ = sender.send(outcome);
        });
        receiver.await.unwrap_or_else(|_| {
            Err(ClassifiedError::new(
                ErrorKind::Unknown,
                "request ended without an outcome",
            ))
        })
    }
}

impl fmt::Debug for ExecutionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionPipeline")
            .field("retry", &self.retry)
            .field("attempt_timeout", &self.attempt_timeout)
            .finish_non_exhaustive()
    }
}

/// Handle to an in-flight request.
///
/// Dropping the handle does not cancel the request.
#[derive(Debug)]
pub struct Subscription {
    request_id: Uuid,
    token: CancellationToken,
    delivery: Arc<DeliveryState>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Identifier recorded on the request's tracing span.
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Cancels the request. No further activation or delivery happens.
    ///
    /// Returns false if the outcome was already delivered or the request was
    /// already cancelled; the call is then a no-op.
    pub fn cancel(&self) -> bool {
        if !self.delivery.try_cancel() {
            return false;
        }
        self.token.cancel("cancelled by caller");
        true
    }

    /// Returns true if [`cancel`](Self::cancel) won against delivery.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.delivery.is_cancelled()
    }

    /// Returns true once the observer has been called.
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        self.delivery.is_delivered()
    }

    /// Waits for the background work to finish, including release.
    ///
    /// Delivery itself may still be queued on the completion context.
    pub async fn wait(self) {
        if let Err(err) = self.task.await {
            tracing::warn!(request_id = %self.request_id, error = %err, "Request task failed");
        }
    }
}
