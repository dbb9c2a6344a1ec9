//! # Smoothhttp
//!
//! Resilient execution of HTTP round trips with tolerant response decoding.
//!
//! Smoothhttp provides:
//!
//! - **Request execution**: run a producer on a background runtime and deliver
//!   its single outcome on a chosen completion context
//! - **Retry**: bounded, constant-delay retry of transient failures
//! - **Error classification**: every failure reaches the caller as one
//!   [`ClassifiedError`](errors::ClassifiedError)
//! - **Tolerant decoding**: coerce loosely typed JSON into typed fields, with
//!   configurable defaults for null or absent values
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use smoothhttp::prelude::*;
//!
//! let config = HttpConfig::from_file("http.json")?;
//! let client = build_client(&config.timeouts)?;
//! let pipeline = ExecutionPipeline::from_config(runtime.handle().clone(), &config);
//!
//! let producer = RequestProducer::new(move || client.get("https://api.example.com/user"))
//!     .decoding::<User>(config.decoder());
//!
//! let main_thread = Arc::new(EventLoop::spawn("main")?);
//! let subscription = pipeline.submit(producer, main_thread, |outcome| match outcome {
//!     Ok(user) => show(user),
//!     Err(err) => report(err.code, &err.message),
//! });
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod classify;
pub mod config;
pub mod decode;
pub mod errors;
pub mod observability;
pub mod pipeline;
pub mod testing;

#[cfg(feature = "transport")]
pub mod transport;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::classify::ErrorClassifier;
    pub use crate::config::{DefaultValuePolicy, HttpConfig, LoggingConfig, TimeoutConfig};
    pub use crate::decode::{
        decode_body, encode_body, ObjectReader, ObjectWriter, ToleranceDecoder, TolerantModel,
    };
    pub use crate::errors::{ClassifiedError, DecodeError, ErrorKind};
    pub use crate::pipeline::{
        from_fn, CompletionContext, EventLoop, ExecutionPipeline, Inline, Outcome, Producer,
        RetryPolicy, RuntimeContext, Subscription,
    };

    #[cfg(feature = "transport")]
    pub use crate::transport::{build_client, DecodingProducer, RequestProducer};
}
