//! Retry policy for request execution.
//!
//! A policy bounds the total number of activations and fixes the pause
//! between them. Only failures whose kind is in the policy's retry set are
//! retried; everything else is delivered straight away.

use crate::errors::{ClassifiedError, ErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Constant-delay retry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total activations, including the first.
    max_attempts: u32,
    /// Pause between activations in milliseconds.
    delay_millis: u64,
    /// Error kinds that trigger another activation.
    retry_on: HashSet<ErrorKind>,
}

impl RetryPolicy {
    /// Creates a policy allowing `max_attempts` activations spaced `delay_millis` apart.
    ///
    /// Network and timeout failures are retried. A count of zero still
    /// allows the first activation.
    #[must_use]
    pub fn constant(max_attempts: u32, delay_millis: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay_millis,
            retry_on: [ErrorKind::Network, ErrorKind::Timeout].into_iter().collect(),
        }
    }

    /// Adds an error kind to the retry set.
    ///
    /// `Cancelled` is ignored; a cancelled request is never re-activated.
    #[must_use]
    pub fn with_retry_on(mut self, kind: ErrorKind) -> Self {
        if kind != ErrorKind::Cancelled {
            self.retry_on.insert(kind);
        }
        self
    }

    /// Total activations allowed.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pause between activations.
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_millis)
    }

    /// Whether an error of this kind would be retried.
    #[must_use]
    pub fn retries(&self, kind: ErrorKind) -> bool {
        kind != ErrorKind::Cancelled && self.retry_on.contains(&kind)
    }

    /// Starts tracking a fresh request.
    #[must_use]
    pub fn begin(&self) -> RetryState {
        RetryState {
            attempt: 0,
            max_attempts: self.max_attempts,
        }
    }

    /// Decides what follows a failed activation and advances the state.
    pub fn decide(&self, state: &mut RetryState, error: &ClassifiedError) -> RetryDecision {
        if !self.retries(error.kind) {
            return RetryDecision::NotRetryable;
        }
        if state.is_exhausted() {
            return RetryDecision::GiveUp;
        }
        state.attempt += 1;
        RetryDecision::Retry(self.delay())
    }
}

/// Per-request retry bookkeeping. Never shared between requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    /// Retries taken so far (0 during the first activation).
    pub attempt: u32,
    max_attempts: u32,
}

impl RetryState {
    /// One-based number of the activation currently running.
    #[must_use]
    pub fn activation(&self) -> u32 {
        self.attempt + 1
    }

    /// Returns true if no activations remain.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.activation() >= self.max_attempts
    }
}

/// Outcome of a retry decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry(Duration),
    /// No more retries, give up.
    GiveUp,
    /// Don't retry, the error is not retryable.
    NotRetryable,
}
