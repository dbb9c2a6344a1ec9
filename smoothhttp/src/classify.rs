//! Translation of arbitrary failures into [`ClassifiedError`].
//!
//! The classifier walks the error's cause chain and stops at the first cause
//! it recognises. It is a pure function: no logging, no I/O.

use crate::decode::{ObjectReader, ToleranceDecoder};
use crate::errors::{
    ClassifiedError, DecodeError, ErrorKind, HttpStatusError, RequestCancelled,
};
use std::sync::Arc;

/// Maps opaque failures onto the closed error taxonomy.
#[derive(Debug, Clone, Default)]
pub struct ErrorClassifier {
    /// Reads structured error bodies; never substitutes defaults.
    body_decoder: ToleranceDecoder,
}

impl ErrorClassifier {
    /// Creates a classifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies a failure, keeping it as the cause.
    #[must_use]
    pub fn classify(&self, failure: anyhow::Error) -> ClassifiedError {
        let cause = Arc::new(failure);
        let classified = self.classify_ref(&cause);
        if classified.cause.is_some() {
            classified
        } else {
            classified.with_cause(cause)
        }
    }

    /// Classifies a failure by reference.
    #[must_use]
    pub fn classify_ref(&self, failure: &anyhow::Error) -> ClassifiedError {
        for cause in failure.chain() {
            if let Some(classified) = self.classify_cause(cause) {
                return classified;
            }
        }
        ClassifiedError::new(ErrorKind::Unknown, format!("{failure:#}"))
    }

    fn classify_cause(&self, cause: &(dyn std::error::Error + 'static)) -> Option<ClassifiedError> {
        if let Some(err) = cause.downcast_ref::<ClassifiedError>() {
            return Some(err.clone());
        }
        if let Some(err) = cause.downcast_ref::<RequestCancelled>() {
            return Some(ClassifiedError::new(ErrorKind::Cancelled, err.to_string()));
        }
        if let Some(err) = cause.downcast_ref::<HttpStatusError>() {
            return Some(self.classify_status(err));
        }
        if let Some(err) = cause.downcast_ref::<DecodeError>() {
            return Some(ClassifiedError::new(ErrorKind::Decode, err.to_string()));
        }
        if let Some(err) = cause.downcast_ref::<tokio::time::error::Elapsed>() {
            return Some(ClassifiedError::new(ErrorKind::Timeout, err.to_string()));
        }
        if let Some(err) = cause.downcast_ref::<serde_json::Error>() {
            let kind = if err.is_io() {
                ErrorKind::Network
            } else {
                ErrorKind::Decode
            };
            return Some(ClassifiedError::new(kind, err.to_string()));
        }
        if let Some(err) = cause.downcast_ref::<std::io::Error>() {
            let kind = if err.kind() == std::io::ErrorKind::TimedOut {
                ErrorKind::Timeout
            } else {
                ErrorKind::Network
            };
            return Some(ClassifiedError::new(kind, err.to_string()));
        }
        #[cfg(feature = "transport")]
        if let Some(err) = cause.downcast_ref::<reqwest::Error>() {
            return Some(classify_reqwest(err));
        }
        None
    }

    /// Uses the body's own `code`/`message` when the server sent a structured error.
    fn classify_status(&self, err: &HttpStatusError) -> ClassifiedError {
        let fallback = || {
            ClassifiedError::new(ErrorKind::Protocol, format!("HTTP {}", err.status))
                .with_code(i32::from(err.status))
        };

        let Ok(body) = serde_json::from_str::<serde_json::Value>(&err.body) else {
            return fallback();
        };
        let Ok(reader) = ObjectReader::new(&body, &self.body_decoder) else {
            return fallback();
        };

        let code = reader.read::<i32>("code").ok().flatten();
        let message = reader
            .read::<String>("message")
            .ok()
            .flatten()
            .or_else(|| reader.read::<String>("msg").ok().flatten());

        match (code, message) {
            (None, None) => fallback(),
            (code, message) => ClassifiedError::new(
                ErrorKind::Protocol,
                message.unwrap_or_else(|| format!("HTTP {}", err.status)),
            )
            .with_code(code.unwrap_or_else(|| i32::from(err.status))),
        }
    }
}

#[cfg(feature = "transport")]
fn classify_reqwest(err: &reqwest::Error) -> ClassifiedError {
    let kind = if err.is_timeout() {
        ErrorKind::Timeout
    } else if err.is_decode() {
        ErrorKind::Decode
    } else if err.is_status() {
        ErrorKind::Protocol
    } else if err.is_connect() || err.is_request() || err.is_body() {
        ErrorKind::Network
    } else {
        ErrorKind::Unknown
    };

    let classified = ClassifiedError::new(kind, err.to_string());
    match err.status() {
        Some(status) if kind == ErrorKind::Protocol => {
            classified.with_code(i32::from(status.as_u16()))
        }
        _ => classified,
    }
}
