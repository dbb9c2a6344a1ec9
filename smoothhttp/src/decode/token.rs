//! Token-level reader and writer abstractions.

use crate::errors::DecodeError;
use std::fmt;

/// Kind of the next token in a value stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A null marker.
    Null,
    /// `true` or `false`.
    Boolean,
    /// A numeric literal.
    Number,
    /// A string literal.
    String,
    /// The start of an array.
    Array,
    /// The start of an object.
    Object,
    /// No more tokens.
    End,
}

impl TokenKind {
    /// Stable uppercase name, as used in error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Boolean => "BOOLEAN",
            Self::Number => "NUMBER",
            Self::String => "STRING",
            Self::Array => "BEGIN_ARRAY",
            Self::Object => "BEGIN_OBJECT",
            Self::End => "END_DOCUMENT",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A forward-only reader over a structured value stream.
///
/// The decoder only reads from a cursor; it never owns its lifecycle.
/// Each `next_*` call consumes exactly one token and fails with
/// [`DecodeError::UnexpectedToken`] if the token is of another kind.
pub trait TokenCursor {
    /// Returns the kind of the next token without consuming it.
    fn peek(&mut self) -> TokenKind;

    /// Consumes a null marker.
    fn next_null(&mut self) -> Result<(), DecodeError>;

    /// Consumes a boolean.
    fn next_bool(&mut self) -> Result<bool, DecodeError>;

    /// Consumes a number and returns its text with every digit preserved.
    fn next_number(&mut self) -> Result<String, DecodeError>;

    /// Consumes a string.
    fn next_string(&mut self) -> Result<String, DecodeError>;

    /// Consumes whatever value comes next, including nested structures.
    fn skip_value(&mut self);
}

/// A writer with the same capability set as [`TokenCursor`].
pub trait TokenSink {
    /// Writes a null marker.
    fn write_null(&mut self) -> Result<(), DecodeError>;

    /// Writes a boolean.
    fn write_bool(&mut self, value: bool) -> Result<(), DecodeError>;

    /// Writes a number from its lexical text.
    fn write_number(&mut self, text: &str) -> Result<(), DecodeError>;

    /// Writes a string.
    fn write_string(&mut self, value: &str) -> Result<(), DecodeError>;
}
