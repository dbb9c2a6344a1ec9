//! [`TokenCursor`] and [`TokenSink`] over `serde_json` values.

use super::token::{TokenCursor, TokenKind, TokenSink};
use crate::errors::DecodeError;
use serde_json::{Number, Value};
use std::iter::Peekable;
use std::slice::Iter;

/// Returns the token kind a JSON value starts with.
#[must_use]
pub fn kind_of(value: &Value) -> TokenKind {
    match value {
        Value::Null => TokenKind::Null,
        Value::Bool(_) => TokenKind::Boolean,
        Value::Number(_) => TokenKind::Number,
        Value::String(_) => TokenKind::String,
        Value::Array(_) => TokenKind::Array,
        Value::Object(_) => TokenKind::Object,
    }
}

/// A forward-only cursor over a sequence of JSON values.
///
/// Numbers keep every digit because the crate enables `serde_json`'s
/// `arbitrary_precision` feature. The exponent may be renormalised
/// (`1e40` reads back as `1e+40`).
#[derive(Debug, Clone)]
pub struct ValueCursor<'a> {
    values: Peekable<Iter<'a, Value>>,
}

impl<'a> ValueCursor<'a> {
    /// Creates a cursor over a single value.
    #[must_use]
    pub fn new(value: &'a Value) -> Self {
        Self::over(std::slice::from_ref(value))
    }

    /// Creates a cursor over consecutive values.
    #[must_use]
    pub fn over(values: &'a [Value]) -> Self {
        Self {
            values: values.iter().peekable(),
        }
    }

    fn take(&mut self, expected: &'static str, kind: TokenKind) -> Result<&'a Value, DecodeError> {
        let found = self.peek();
        if found != kind {
            return Err(DecodeError::UnexpectedToken { expected, found });
        }
        self.values.next().ok_or(DecodeError::UnexpectedToken {
            expected,
            found: TokenKind::End,
        })
    }
}

impl TokenCursor for ValueCursor<'_> {
    fn peek(&mut self) -> TokenKind {
        self.values.peek().map_or(TokenKind::End, |v| kind_of(v))
    }

    fn next_null(&mut self) -> Result<(), DecodeError> {
        self.take("null", TokenKind::Null).map(|_| ())
    }

    fn next_bool(&mut self) -> Result<bool, DecodeError> {
        match self.take("boolean", TokenKind::Boolean)? {
            Value::Bool(b) => Ok(*b),
            other => Err(DecodeError::UnexpectedToken {
                expected: "boolean",
                found: kind_of(other),
            }),
        }
    }

    fn next_number(&mut self) -> Result<String, DecodeError> {
        match self.take("number", TokenKind::Number)? {
            Value::Number(n) => Ok(n.to_string()),
            other => Err(DecodeError::UnexpectedToken {
                expected: "number",
                found: kind_of(other),
            }),
        }
    }

    fn next_string(&mut self) -> Result<String, DecodeError> {
        match self.take("string", TokenKind::String)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(DecodeError::UnexpectedToken {
                expected: "string",
                found: kind_of(other),
            }),
        }
    }

    fn skip_value(&mut self) {
        self.values.next();
    }
}

/// A sink that collects written tokens as JSON values.
#[derive(Debug, Clone, Default)]
pub struct ValueSink {
    values: Vec<Value>,
}

impl ValueSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last written value, or null if nothing was written.
    #[must_use]
    pub fn into_value(mut self) -> Value {
        self.values.pop().unwrap_or(Value::Null)
    }

    /// Returns every written value in order.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl TokenSink for ValueSink {
    fn write_null(&mut self) -> Result<(), DecodeError> {
        self.values.push(Value::Null);
        Ok(())
    }

    fn write_bool(&mut self, value: bool) -> Result<(), DecodeError> {
        self.values.push(Value::Bool(value));
        Ok(())
    }

    fn write_number(&mut self, text: &str) -> Result<(), DecodeError> {
        let number: Number = text.parse().map_err(|_| DecodeError::Unparseable {
            expected: "number",
            input: text.to_string(),
        })?;
        self.values.push(Value::Number(number));
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> Result<(), DecodeError> {
        self.values.push(Value::String(value.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cursor_walks_sequence() {
        let values: Vec<Value> = serde_json::from_str(r#"[null, true, 12.50, "x"]"#).unwrap();
        let mut cursor = ValueCursor::over(&values);

        assert_eq!(cursor.peek(), TokenKind::Null);
        cursor.next_null().unwrap();
        assert!(cursor.next_bool().unwrap());
        assert_eq!(cursor.next_number().unwrap(), "12.50");
        assert_eq!(cursor.next_string().unwrap(), "x");
        assert_eq!(cursor.peek(), TokenKind::End);
    }

    #[test]
    fn test_cursor_rejects_wrong_kind_without_consuming() {
        let value = json!("text");
        let mut cursor = ValueCursor::new(&value);

        let err = cursor.next_bool().unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnexpectedToken {
                expected: "boolean",
                found: TokenKind::String
            }
        );
        assert_eq!(cursor.peek(), TokenKind::String);
    }

    #[test]
    fn test_sink_keeps_number_text() {
        let mut sink = ValueSink::new();
        sink.write_number("3.14159265358979323846").unwrap();

        assert_eq!(sink.into_value().to_string(), "3.14159265358979323846");
    }

    #[test]
    fn test_sink_rejects_bad_number_text() {
        let mut sink = ValueSink::new();
        assert!(sink.write_number("NaN").is_err());
    }
}
