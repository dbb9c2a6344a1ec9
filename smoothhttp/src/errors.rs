//! Error types for smoothhttp.
//!
//! Every failure that reaches a caller is a [`ClassifiedError`]. The other
//! types here are the concrete causes the classifier knows how to recognise.

use crate::decode::TokenKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Numeric codes attached to classified errors.
pub mod codes {
    /// Unrecognised failure.
    pub const UNKNOWN: i32 = 1000;
    /// Response body could not be decoded.
    pub const DECODE: i32 = 1001;
    /// Connectivity or IO failure.
    pub const NETWORK: i32 = 1002;
    /// Non-2xx response without a structured error body.
    pub const PROTOCOL: i32 = 1003;
    /// Deadline exceeded.
    pub const TIMEOUT: i32 = 1006;
    /// Request cancelled.
    pub const CANCELLED: i32 = 1009;
}

/// The closed failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Connectivity or IO failure.
    Network,
    /// Deadline exceeded.
    Timeout,
    /// Malformed response body.
    Decode,
    /// Non-2xx HTTP response.
    Protocol,
    /// The request was cancelled.
    Cancelled,
    /// Anything else.
    Unknown,
}

impl ErrorKind {
    /// Returns the code used when the cause carries none of its own.
    #[must_use]
    pub const fn default_code(self) -> i32 {
        match self {
            Self::Network => codes::NETWORK,
            Self::Timeout => codes::TIMEOUT,
            Self::Decode => codes::DECODE,
            Self::Protocol => codes::PROTOCOL,
            Self::Cancelled => codes::CANCELLED,
            Self::Unknown => codes::UNKNOWN,
        }
    }

    /// Whether failures of this kind are worth retrying without extra configuration.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Network | Self::Timeout)
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Decode => "decode",
            Self::Protocol => "protocol",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure translated into the taxonomy, as seen by callers.
#[derive(Debug, Clone, Error)]
#[error("{kind} error [{code}]: {message}")]
pub struct ClassifiedError {
    /// The taxonomy bucket.
    pub kind: ErrorKind,
    /// Numeric code: the server's own code for protocol errors, else a fixed code per kind.
    pub code: i32,
    /// Human-readable message.
    pub message: String,
    /// The original failure, if any.
    pub cause: Option<Arc<anyhow::Error>>,
}

impl ClassifiedError {
    /// Creates a classified error with the kind's default code.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.default_code(),
            message: message.into(),
            cause: None,
        }
    }

    /// Overrides the code.
    #[must_use]
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }

    /// Attaches the original failure.
    #[must_use]
    pub fn with_cause(mut self, cause: Arc<anyhow::Error>) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Returns true if this is a transient failure.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("kind".to_string(), serde_json::json!(self.kind.as_str()));
        map.insert("code".to_string(), serde_json::json!(self.code));
        map.insert("message".to_string(), serde_json::json!(self.message));
        if let Some(ref cause) = self.cause {
            map.insert("cause".to_string(), serde_json::json!(format!("{cause:#}")));
        }
        map
    }
}

/// A non-2xx response, carrying the raw body for the classifier.
#[derive(Debug, Clone, Error)]
#[error("HTTP {status}")]
pub struct HttpStatusError {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl HttpStatusError {
    /// Creates a new status error.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Raised by producers that observe their own cancellation.
#[derive(Debug, Clone, Error)]
#[error("request cancelled: {reason}")]
pub struct RequestCancelled {
    /// Why the request was cancelled.
    pub reason: String,
}

impl RequestCancelled {
    /// Creates a new cancellation error.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors raised while decoding or encoding tolerant values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The token kind cannot produce the requested type.
    #[error("expected {expected}, got {found}")]
    UnexpectedToken {
        /// The requested type.
        expected: &'static str,
        /// The token that was found.
        found: TokenKind,
    },

    /// A string or number token did not parse as the requested type.
    #[error("cannot parse '{input}' as {expected}")]
    Unparseable {
        /// The requested type.
        expected: &'static str,
        /// The offending text.
        input: String,
    },

    /// A value of one type was handed to the encoder of another.
    #[error("value of type {actual} cannot be encoded as {expected}")]
    TypeMismatch {
        /// The encoder's type.
        expected: &'static str,
        /// The value's type.
        actual: &'static str,
    },

    /// NaN and infinities have no JSON representation.
    #[error("non-finite number {0} cannot be written")]
    NonFinite(String),

    /// The document is not valid JSON.
    #[error("malformed document: {0}")]
    Malformed(String),

    /// A field failed to decode.
    #[error("field '{field}': {source}")]
    Field {
        /// The field name.
        field: String,
        /// The underlying failure.
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    /// Wraps this error with the name of the field being decoded.
    #[must_use]
    pub fn in_field(self, field: impl Into<String>) -> Self {
        Self::Field {
            field: field.into(),
            source: Box::new(self),
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// The file path.
        path: String,
        /// The IO failure.
        #[source]
        source: std::io::Error,
    },

    /// The document did not parse.
    #[error("invalid config document: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}
