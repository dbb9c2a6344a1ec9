//! The stages one logical request passes through.
//!
//! Each stage is a plain function so it can be tested on its own:
//! [`attempt_once`] activates the producer, [`map_errors`] classifies a
//! failure, [`retry`] loops the two under a policy, [`release_on_completion`]
//! arms the release hook and [`hand_off`] delivers on the completion context.

use super::context::CompletionContext;
use super::producer::Producer;
use super::retry::{RetryDecision, RetryPolicy};
use crate::cancellation::{CancellationToken, ReleaseGuard};
use crate::classify::ErrorClassifier;
use crate::errors::ClassifiedError;
use anyhow::anyhow;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// The single result delivered for a logical request.
pub type Outcome<T> = Result<T, ClassifiedError>;

const PENDING: u8 = 0;
const DELIVERED: u8 = 1;
const CANCELLED: u8 = 2;

/// Shared delivery flag deciding whether the observer runs.
///
/// Delivery and cancellation race for the single transition out of
/// `PENDING`; whichever wins decides the request's fate.
#[derive(Debug, Default)]
pub struct DeliveryState {
    state: AtomicU8,
}

impl DeliveryState {
    /// Creates a pending state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the delivery. Returns false if already delivered or cancelled.
    pub fn try_deliver(&self) -> bool {
        self.transition(DELIVERED)
    }

    /// Claims the cancellation. Returns false if already delivered or cancelled.
    pub fn try_cancel(&self) -> bool {
        self.transition(CANCELLED)
    }

    /// Returns true once the observer has been called.
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        self.state.load(Ordering::Acquire) == DELIVERED
    }

    /// Returns true if cancellation won the race.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCELLED
    }

    fn transition(&self, to: u8) -> bool {
        self.state
            .compare_exchange(PENDING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Activates the producer once, bounded by the optional attempt timeout.
///
/// A panic inside the producer is caught and returned as an error, so it is
/// classified and delivered like any other failure.
pub fn attempt_once<'a, T, P>(
    producer: &'a P,
    attempt: u32,
    timeout: Option<Duration>,
) -> BoxFuture<'a, anyhow::Result<T>>
where
    T: Send + 'a,
    P: Producer<T> + ?Sized,
{
    let activation = AssertUnwindSafe(async move { producer.activate(attempt).await })
        .catch_unwind()
        .map(move |result| {
            result.unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                warn!(attempt, panic = message, "Producer panicked");
                Err(anyhow!("producer panicked: {message}"))
            })
        });

    match timeout {
        Some(limit) => async move { tokio::time::timeout(limit, activation).await? }.boxed(),
        None => activation.boxed(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Translates a failure into the taxonomy.
pub fn map_errors(classifier: &ErrorClassifier, failure: anyhow::Error) -> ClassifiedError {
    classifier.classify(failure)
}

/// Runs attempts until success, a terminal failure or cancellation.
///
/// Returns `None` if the token fires. Intermediate failures are logged and
/// dropped; only the final outcome is returned.
pub async fn retry<T, P>(
    producer: &P,
    policy: Option<&RetryPolicy>,
    classifier: &ErrorClassifier,
    timeout: Option<Duration>,
    token: &CancellationToken,
) -> Option<Outcome<T>>
where
    T: Send + 'static,
    P: Producer<T> + ?Sized,
{
    let mut state = policy.map(RetryPolicy::begin);

    loop {
        if token.is_cancelled() {
            return None;
        }
        let attempt = state.as_ref().map_or(1, |s| s.activation());

        let result = tokio::select! {
            biased;
            () = token.cancelled() => return None,
            result = attempt_once(producer, attempt, timeout) => result,
        };

        let error = match result {
            Ok(value) => return Some(Ok(value)),
            Err(failure) => map_errors(classifier, failure),
        };

        let decision = match (policy, state.as_mut()) {
            (Some(policy), Some(state)) => policy.decide(state, &error),
            _ => RetryDecision::NotRetryable,
        };

        match decision {
            RetryDecision::Retry(delay) => {
                debug!(
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %error,
                    "Retrying after error"
                );
                tokio::select! {
                    biased;
                    () = token.cancelled() => return None,
                    () = tokio::time::sleep(delay) => {}
                }
            }
            RetryDecision::GiveUp => {
                warn!(attempts = attempt, error = %error, "Retries exhausted");
                return Some(Err(error));
            }
            RetryDecision::NotRetryable => return Some(Err(error)),
        }
    }
}

/// Arms a guard that releases the producer exactly once.
///
/// The guard fires when released explicitly or when dropped, so a task that
/// exits early on cancellation still releases.
pub fn release_on_completion<T, P>(producer: Arc<P>) -> ReleaseGuard
where
    T: 'static,
    P: Producer<T> + ?Sized + 'static,
{
    ReleaseGuard::new(move || producer.release())
}

/// Delivers the outcome on the completion context, unless cancelled first.
pub fn hand_off<T, F>(
    completion: &dyn CompletionContext,
    delivery: Arc<DeliveryState>,
    outcome: Outcome<T>,
    observer: F,
) where
    T: Send + 'static,
    F: FnOnce(Outcome<T>) + Send + 'static,
{
    completion.dispatch(Box::new(move || {
        if delivery.try_deliver() {
            observer(outcome);
        }
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorKind, HttpStatusError};
    use crate::pipeline::context::Inline;
    use crate::pipeline::producer::from_fn;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_delivery_state_single_transition() {
        let state = DeliveryState::new();
        assert!(state.try_deliver());
        assert!(!state.try_cancel());
        assert!(!state.try_deliver());
        assert!(state.is_delivered());
        assert!(!state.is_cancelled());
    }

    #[tokio::test]
    async fn test_attempt_once_times_out() {
        let producer = from_fn(|_| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(1)
        });
        let err = attempt_once(&producer, 1, Some(Duration::from_millis(10)))
            .await
            .unwrap_err();
        let classified = map_errors(&ErrorClassifier::new(), err);
        assert_eq!(classified.kind, ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_attempt_once_turns_panic_into_unknown_failure() {
        let producer = from_fn(|attempt| async move {
            if attempt > 0 {
                panic!("boom");
            }
            Ok(attempt)
        });
        let err = attempt_once(&producer, 1, None).await.unwrap_err();
        let classified = map_errors(&ErrorClassifier::new(), err);
        assert_eq!(classified.kind, ErrorKind::Unknown);
        assert!(classified.message.contains("boom"), "{}", classified.message);

        let err = attempt_once(&producer, 1, Some(Duration::from_secs(1)))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("producer panicked"));
    }

    #[tokio::test]
    async fn test_retry_without_policy_runs_once() {
        let calls = AtomicU32::new(0);
        let producer = from_fn(|_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, _>(std::io::Error::other("reset").into()) }
        });

        let token = CancellationToken::new();
        let outcome = retry(&producer, None, &ErrorClassifier::new(), None, &token)
            .await
            .unwrap();
        assert_eq!(outcome.unwrap_err().kind, ErrorKind::Network);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_passes_attempt_numbers() {
        let seen = Mutex::new(Vec::new());
        let producer = from_fn(|attempt| {
            seen.lock().push(attempt);
            async move {
                if attempt < 3 {
                    Err(std::io::Error::other("flaky").into())
                } else {
                    Ok(attempt)
                }
            }
        });
        let policy = RetryPolicy::constant(3, 1);

        let token = CancellationToken::new();
        let outcome = retry(&producer, Some(&policy), &ErrorClassifier::new(), None, &token)
            .await
            .unwrap();
        assert_eq!(outcome.unwrap(), 3);
        assert_eq!(*seen.lock(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_retry_stops_on_protocol_error() {
        let calls = AtomicU32::new(0);
        let producer = from_fn(|_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(HttpStatusError::new(404, "").into()) }
        });
        let policy = RetryPolicy::constant(5, 1);

        let token = CancellationToken::new();
        let outcome = retry(&producer, Some(&policy), &ErrorClassifier::new(), None, &token)
            .await
            .unwrap();
        assert_eq!(outcome.unwrap_err().code, 404);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_returns_none_when_cancelled_during_delay() {
        let token = CancellationToken::new();
        let producer = from_fn(|_| async { Err::<(), _>(std::io::Error::other("down").into()) });
        let policy = RetryPolicy::constant(3, 60_000);

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel("shutdown");
        });

        let outcome = retry(&producer, Some(&policy), &ErrorClassifier::new(), None, &token).await;
        assert!(outcome.is_none());
    }

    #[test]
    fn test_hand_off_skips_cancelled_delivery() {
        let delivered = Arc::new(Mutex::new(None));
        let delivery = Arc::new(DeliveryState::new());
        assert!(delivery.try_cancel());

        let sink = delivered.clone();
        hand_off(&Inline, delivery, Ok(1), move |outcome| *sink.lock() = Some(outcome));
        assert!(delivered.lock().is_none());
    }

    #[test]
    fn test_release_guard_calls_producer_once() {
        struct Counting(AtomicU32);

        #[async_trait::async_trait]
        impl Producer<()> for Counting {
            async fn activate(&self, _attempt: u32) -> anyhow::Result<()> {
                Ok(())
            }

            fn release(&self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let producer = Arc::new(Counting(AtomicU32::new(0)));
        let guard = release_on_completion::<(), _>(producer.clone());
        assert!(guard.release());
        drop(guard);
        assert_eq!(producer.0.load(Ordering::SeqCst), 1);
    }
}
