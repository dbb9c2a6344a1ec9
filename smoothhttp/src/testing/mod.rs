//! Test doubles for code built on smoothhttp.
//!
//! This module provides:
//! - A scripted producer that fails a set number of times before succeeding
//! - A recording observer that captures delivered outcomes and their threads

mod observer;
mod producer;

pub use observer::RecordingObserver;
pub use producer::ScriptedProducer;
