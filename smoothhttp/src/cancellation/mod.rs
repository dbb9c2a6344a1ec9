//! Cooperative cancellation and exactly-once release.
//!
//! This module provides:
//! - CancellationToken, checked by the pipeline at every suspension point
//! - ReleaseGuard, which runs a teardown hook exactly once

mod guard;
mod token;

pub use guard::ReleaseGuard;
pub use token::CancellationToken;
