//! Tolerant decoding of loosely typed JSON.
//!
//! This module provides:
//! - Token cursor and sink traits the decoder reads from and writes to
//! - A cursor and sink over `serde_json` values
//! - The per-type [`ToleranceDecoder`]
//! - Object readers and writers for whole response models

mod json;
mod object;
mod token;
mod tolerant;

pub use crate::errors::DecodeError;
pub use json::{kind_of, ValueCursor, ValueSink};
pub use object::{decode_body, encode_body, ObjectReader, ObjectWriter, TolerantModel};
pub use token::{TokenCursor, TokenKind, TokenSink};
pub use tolerant::{Tolerant, ToleranceDecoder, TolerantValue, ValueType};
