//! Request execution.
//!
//! This module provides:
//! - The [`Producer`] abstraction a request is built from
//! - Constant-delay retry policies
//! - Completion contexts that choose the delivery thread
//! - The named execution stages and the [`ExecutionPipeline`] composing them

mod context;
mod executor;
mod producer;
mod retry;
pub mod stages;


pub use context::{CompletionContext, EventLoop, Inline, Job, RuntimeContext};
pub use executor::{ExecutionPipeline, Subscription};
pub use producer::{from_fn, FnProducer, Producer};
pub use retry::{RetryDecision, RetryPolicy, RetryState};
pub use stages::{DeliveryState, Outcome};
