//! Tolerant per-type decoding with default-value substitution.
//!
//! Each [`ValueType`] decodes one logical value from a [`TokenCursor`]:
//!
//! - null yields the configured default, or `None` when no defaults exist
//! - a token of the native kind is returned as is
//! - a string token is coerced into numeric and boolean targets
//! - a boolean token is coerced into string targets
//!
//! Anything else is a [`DecodeError`].

use super::token::{TokenCursor, TokenKind, TokenSink};
use crate::config::DefaultValuePolicy;
use crate::errors::DecodeError;
use bigdecimal::BigDecimal;
use serde_json::Number;
use std::str::FromStr;
use std::sync::Arc;

/// `i64::MAX` as the nearest `f64`; integral values at or above it lose
/// precision when cast back.
const I64_MAGNITUDE_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// The closed set of primitive target types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// `bool`
    Boolean,
    /// `i32`
    Int32,
    /// `i64`
    Int64,
    /// `f32`
    Float32,
    /// `f64`
    Float64,
    /// A JSON number with every digit preserved.
    Number,
    /// `String`
    String,
    /// An exact decimal.
    Decimal,
}

impl ValueType {
    /// Name used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Int32 => "i32",
            Self::Int64 => "i64",
            Self::Float32 => "f32",
            Self::Float64 => "f64",
            Self::Number => "number",
            Self::String => "string",
            Self::Decimal => "decimal",
        }
    }
}

/// A decoded value tagged with its type.
#[derive(Debug, Clone, PartialEq)]
pub enum TolerantValue {
    /// `bool`
    Boolean(bool),
    /// `i32`
    Int32(i32),
    /// `i64`
    Int64(i64),
    /// `f32`
    Float32(f32),
    /// `f64`
    Float64(f64),
    /// An untyped number.
    Number(Number),
    /// `String`
    String(String),
    /// An arbitrary-precision decimal.
    Decimal(BigDecimal),
}

impl TolerantValue {
    /// Returns the type tag of this value.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Boolean(_) => ValueType::Boolean,
            Self::Int32(_) => ValueType::Int32,
            Self::Int64(_) => ValueType::Int64,
            Self::Float32(_) => ValueType::Float32,
            Self::Float64(_) => ValueType::Float64,
            Self::Number(_) => ValueType::Number,
            Self::String(_) => ValueType::String,
            Self::Decimal(_) => ValueType::Decimal,
        }
    }
}

/// Rust types with a tolerant wire representation.
pub trait Tolerant: Sized {
    /// The type tag the decoder dispatches on.
    const TYPE: ValueType;

    /// Extracts the Rust value from a tagged value of the same type.
    fn from_value(value: TolerantValue) -> Option<Self>;

    /// Wraps the Rust value in its tagged form.
    fn to_value(&self) -> TolerantValue;
}

macro_rules! impl_tolerant {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Tolerant for $ty {
                const TYPE: ValueType = ValueType::$variant;

                fn from_value(value: TolerantValue) -> Option<Self> {
                    match value {
                        TolerantValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                #[allow(clippy::clone_on_copy)]
                fn to_value(&self) -> TolerantValue {
                    TolerantValue::$variant(self.clone())
                }
            }
        )*
    };
}

impl_tolerant! {
    bool => Boolean,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    Number => Number,
    String => String,
    BigDecimal => Decimal,
}

/// Decodes and encodes primitive values, substituting configured defaults.
///
/// Cheap to clone; the default values are shared read-only.
#[derive(Debug, Clone, Default)]
pub struct ToleranceDecoder {
    policy: Option<Arc<DefaultValuePolicy>>,
}

impl ToleranceDecoder {
    /// Creates a decoder. `None` disables default substitution.
    #[must_use]
    pub fn new(policy: Option<Arc<DefaultValuePolicy>>) -> Self {
        Self { policy }
    }

    /// Creates a decoder that substitutes the given defaults.
    #[must_use]
    pub fn with_defaults(policy: DefaultValuePolicy) -> Self {
        Self::new(Some(Arc::new(policy)))
    }

    /// Returns the default values, if configured.
    #[must_use]
    pub fn policy(&self) -> Option<&DefaultValuePolicy> {
        self.policy.as_deref()
    }

    /// Returns the configured default for a type.
    #[must_use]
    pub fn default_for(&self, ty: ValueType) -> Option<TolerantValue> {
        let policy = self.policy.as_deref()?;
        let value = match ty {
            ValueType::Boolean => TolerantValue::Boolean(policy.def_boolean),
            ValueType::Int32 => TolerantValue::Int32(policy.def_int32),
            ValueType::Int64 => TolerantValue::Int64(policy.def_int64),
            ValueType::Float32 => TolerantValue::Float32(policy.def_float32),
            ValueType::Float64 => TolerantValue::Float64(policy.def_float64),
            ValueType::Number => TolerantValue::Number(Number::from_f64(policy.def_float64)?),
            ValueType::String => TolerantValue::String(policy.def_string.clone()),
            ValueType::Decimal => TolerantValue::Decimal(policy.def_decimal()),
        };
        Some(value)
    }

    /// Decodes one value of type `ty`.
    ///
    /// Returns `Ok(None)` for a null token when no defaults are configured.
    pub fn decode(
        &self,
        ty: ValueType,
        cursor: &mut dyn TokenCursor,
    ) -> Result<Option<TolerantValue>, DecodeError> {
        let found = cursor.peek();
        let value = match (ty, found) {
            (_, TokenKind::Null) => {
                cursor.next_null()?;
                return Ok(self.default_for(ty));
            }
            (ValueType::Boolean, TokenKind::Boolean) => TolerantValue::Boolean(cursor.next_bool()?),
            (ValueType::String, TokenKind::String) => TolerantValue::String(cursor.next_string()?),
            (ValueType::String, TokenKind::Number) => {
                TolerantValue::String(format_number(&cursor.next_number()?)?)
            }
            (ValueType::String, TokenKind::Boolean) => {
                TolerantValue::String(cursor.next_bool()?.to_string())
            }
            (
                ValueType::Int32
                | ValueType::Int64
                | ValueType::Float32
                | ValueType::Float64
                | ValueType::Number
                | ValueType::Decimal,
                TokenKind::Number,
            ) => parse_number_token(ty, &cursor.next_number()?)?,
            (_, TokenKind::String) => {
                let text = cursor.next_string()?;
                if text.is_empty() {
                    if let Some(default) = self.default_for(ty) {
                        return Ok(Some(default));
                    }
                }
                parse_string(ty, &text)?
            }
            _ => {
                return Err(DecodeError::UnexpectedToken {
                    expected: ty.name(),
                    found,
                });
            }
        };
        Ok(Some(value))
    }

    /// Encodes one value of type `ty`. `None` writes the default, or null.
    pub fn encode(
        &self,
        ty: ValueType,
        value: Option<&TolerantValue>,
        sink: &mut dyn TokenSink,
    ) -> Result<(), DecodeError> {
        let substituted;
        let value = match value {
            Some(value) => value,
            None => match self.default_for(ty) {
                Some(default) => {
                    substituted = default;
                    &substituted
                }
                None => return sink.write_null(),
            },
        };

        if value.value_type() != ty {
            return Err(DecodeError::TypeMismatch {
                expected: ty.name(),
                actual: value.value_type().name(),
            });
        }

        match value {
            TolerantValue::Boolean(b) => sink.write_bool(*b),
            TolerantValue::Int32(i) => sink.write_number(&i.to_string()),
            TolerantValue::Int64(i) => sink.write_number(&i.to_string()),
            TolerantValue::Float32(f) if f.is_finite() => sink.write_number(&f.to_string()),
            TolerantValue::Float64(f) if f.is_finite() => sink.write_number(&f.to_string()),
            TolerantValue::Float32(f) => Err(DecodeError::NonFinite(f.to_string())),
            TolerantValue::Float64(f) => Err(DecodeError::NonFinite(f.to_string())),
            TolerantValue::Number(n) => sink.write_number(&n.to_string()),
            TolerantValue::String(s) => sink.write_string(s),
            TolerantValue::Decimal(d) => sink.write_number(&d.to_string()),
        }
    }

    /// Decodes a typed value.
    pub fn read<T: Tolerant>(
        &self,
        cursor: &mut dyn TokenCursor,
    ) -> Result<Option<T>, DecodeError> {
        Ok(self.decode(T::TYPE, cursor)?.and_then(T::from_value))
    }

    /// Encodes a typed value.
    pub fn write<T: Tolerant>(
        &self,
        value: Option<&T>,
        sink: &mut dyn TokenSink,
    ) -> Result<(), DecodeError> {
        self.encode(T::TYPE, value.map(Tolerant::to_value).as_ref(), sink)
    }
}

fn unparseable(ty: ValueType, input: &str) -> DecodeError {
    DecodeError::Unparseable {
        expected: ty.name(),
        input: input.to_string(),
    }
}

/// Parses the lexical text of a number token.
///
/// Integer targets accept integral values written with a fraction or
/// exponent (`42.0`, `1e3`).
fn parse_number_token(ty: ValueType, text: &str) -> Result<TolerantValue, DecodeError> {
    match ty {
        ValueType::Int32 => text
            .parse::<i32>()
            .ok()
            .or_else(|| integral_f64(text).and_then(|v| i32::try_from(v).ok()))
            .map(TolerantValue::Int32)
            .ok_or_else(|| unparseable(ty, text)),
        ValueType::Int64 => text
            .parse::<i64>()
            .ok()
            .or_else(|| integral_f64(text))
            .map(TolerantValue::Int64)
            .ok_or_else(|| unparseable(ty, text)),
        _ => parse_string(ty, text),
    }
}

/// Parses `text` as `f64` and returns it as `i64` if it is integral and in range.
#[allow(clippy::cast_possible_truncation)]
fn integral_f64(text: &str) -> Option<i64> {
    let value: f64 = text.parse().ok()?;
    (value.fract() == 0.0 && value.abs() < I64_MAGNITUDE_LIMIT).then(|| value as i64)
}

/// Parses string content into a numeric or boolean target.
#[allow(clippy::cast_possible_truncation)]
fn parse_string(ty: ValueType, text: &str) -> Result<TolerantValue, DecodeError> {
    let parsed = match ty {
        ValueType::Boolean => {
            if text.eq_ignore_ascii_case("true") {
                Some(TolerantValue::Boolean(true))
            } else if text.eq_ignore_ascii_case("false") {
                Some(TolerantValue::Boolean(false))
            } else {
                None
            }
        }
        ValueType::Int32 => text.parse().ok().map(TolerantValue::Int32),
        ValueType::Int64 => text.parse().ok().map(TolerantValue::Int64),
        ValueType::Float32 => text
            .parse::<f64>()
            .ok()
            .map(|v| TolerantValue::Float32(v as f32)),
        ValueType::Float64 => text.parse().ok().map(TolerantValue::Float64),
        ValueType::Number => Number::from_str(text).ok().map(TolerantValue::Number),
        ValueType::Decimal => parse_decimal(text).map(TolerantValue::Decimal),
        ValueType::String => Some(TolerantValue::String(text.to_string())),
    };
    parsed.ok_or_else(|| unparseable(ty, text))
}

/// Parses a decimal from its digits, never through a float.
///
/// Every digit is kept regardless of length or exponent.
fn parse_decimal(text: &str) -> Option<BigDecimal> {
    BigDecimal::from_str(text).ok()
}

/// Formats a number token for a string target.
///
/// Integer literals keep their digits. Other values go through `f64`:
/// integral values drop the fraction unless their magnitude reaches
/// `i64::MAX`, in which case the float form is used as is.
#[allow(clippy::cast_possible_truncation)]
fn format_number(text: &str) -> Result<String, DecodeError> {
    if let Ok(value) = text.parse::<i64>() {
        return Ok(value.to_string());
    }
    let value: f64 = text
        .parse()
        .map_err(|_| unparseable(ValueType::String, text))?;
    if value.abs() >= I64_MAGNITUDE_LIMIT {
        return Ok(value.to_string());
    }
    if value.fract() == 0.0 {
        Ok((value as i64).to_string())
    } else {
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{ValueCursor, ValueSink};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn defaults() -> ToleranceDecoder {
        ToleranceDecoder::with_defaults(
            DefaultValuePolicy::new()
                .with_boolean(true)
                .with_int32(99)
                .with_int64(-1)
                .with_float32(1.5)
                .with_float64(2.5)
                .with_string("none"),
        )
    }

    fn raw(json: &str) -> Value {
        serde_json::from_str(json).unwrap()
    }

    fn decode(
        decoder: &ToleranceDecoder,
        ty: ValueType,
        value: &Value,
    ) -> Result<Option<TolerantValue>, DecodeError> {
        decoder.decode(ty, &mut ValueCursor::new(value))
    }

    #[test]
    fn test_null_int_with_default() {
        let value = json!(null);
        let result = decode(&defaults(), ValueType::Int32, &value).unwrap();
        assert_eq!(result, Some(TolerantValue::Int32(99)));
    }

    #[test]
    fn test_null_without_policy_returns_absent_and_stops() {
        let decoder = ToleranceDecoder::default();
        let values = vec![json!(null), json!(5)];
        let mut cursor = ValueCursor::over(&values);

        assert_eq!(decoder.read::<i32>(&mut cursor).unwrap(), None);
        // The null branch must not fall through and swallow the next token.
        assert_eq!(cursor.peek(), TokenKind::Number);
        assert_eq!(decoder.read::<i32>(&mut cursor).unwrap(), Some(5));
    }

    #[test]
    fn test_null_without_policy_for_every_type() {
        let decoder = ToleranceDecoder::default();
        let value = json!(null);
        for ty in [
            ValueType::Boolean,
            ValueType::Int32,
            ValueType::Int64,
            ValueType::Float32,
            ValueType::Float64,
            ValueType::Number,
            ValueType::String,
            ValueType::Decimal,
        ] {
            assert_eq!(decode(&decoder, ty, &value).unwrap(), None, "{ty:?}");
        }
    }

    #[test]
    fn test_null_defaults_are_idempotent() {
        let decoder = defaults();
        let value = json!(null);
        for ty in [ValueType::Boolean, ValueType::Int64, ValueType::Float32, ValueType::String] {
            let first = decode(&decoder, ty, &value).unwrap();
            let second = decode(&decoder, ty, &value).unwrap();
            assert_eq!(first, second);
            assert_eq!(first, decoder.default_for(ty));
        }
    }

    #[test]
    fn test_null_decimal_uses_integer_default() {
        let value = json!(null);
        let result = decode(&defaults(), ValueType::Decimal, &value).unwrap();
        assert_eq!(result, Some(TolerantValue::Decimal(BigDecimal::from(99))));
    }

    #[test]
    fn test_string_true_into_boolean() {
        let value = json!("true");
        let decoder = ToleranceDecoder::default();
        assert_eq!(decoder.read::<bool>(&mut ValueCursor::new(&value)).unwrap(), Some(true));

        let value = json!("FALSE");
        assert_eq!(decoder.read::<bool>(&mut ValueCursor::new(&value)).unwrap(), Some(false));
    }

    #[test]
    fn test_string_into_numbers() {
        let decoder = ToleranceDecoder::default();
        assert_eq!(
            decode(&decoder, ValueType::Int32, &json!("42")).unwrap(),
            Some(TolerantValue::Int32(42))
        );
        assert_eq!(
            decode(&decoder, ValueType::Int64, &json!("-9000000000")).unwrap(),
            Some(TolerantValue::Int64(-9_000_000_000))
        );
        assert_eq!(
            decode(&decoder, ValueType::Float64, &json!("0.25")).unwrap(),
            Some(TolerantValue::Float64(0.25))
        );
    }

    #[test]
    fn test_empty_string_uses_default_only_when_configured() {
        let value = json!("");
        assert_eq!(
            decode(&defaults(), ValueType::Int32, &value).unwrap(),
            Some(TolerantValue::Int32(99))
        );
        assert_eq!(
            decode(&defaults(), ValueType::Boolean, &value).unwrap(),
            Some(TolerantValue::Boolean(true))
        );

        let err = decode(&ToleranceDecoder::default(), ValueType::Int32, &value).unwrap_err();
        assert!(matches!(err, DecodeError::Unparseable { expected: "i32", .. }));
    }

    #[test]
    fn test_unparseable_string_fails_even_with_defaults() {
        let err = decode(&defaults(), ValueType::Int32, &json!("abc")).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Unparseable {
                expected: "i32",
                input: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_integral_number_token_into_int() {
        let decoder = ToleranceDecoder::default();
        assert_eq!(
            decode(&decoder, ValueType::Int32, &raw("42.0")).unwrap(),
            Some(TolerantValue::Int32(42))
        );
        assert_eq!(
            decode(&decoder, ValueType::Int64, &raw("1e3")).unwrap(),
            Some(TolerantValue::Int64(1000))
        );
        assert!(decode(&decoder, ValueType::Int32, &raw("42.5")).is_err());
        assert!(decode(&decoder, ValueType::Int32, &raw("3000000000")).is_err());
    }

    #[test]
    fn test_float_narrows_from_double() {
        let decoder = ToleranceDecoder::default();
        let result = decoder.read::<f32>(&mut ValueCursor::new(&raw("0.1"))).unwrap();
        assert_eq!(result, Some(0.1_f32));
    }

    #[test]
    fn test_number_token_into_string() {
        let decoder = ToleranceDecoder::default();
        let read = |json: &str| decoder.read::<String>(&mut ValueCursor::new(&raw(json))).unwrap();

        assert_eq!(read("42.0"), Some("42".to_string()));
        assert_eq!(read("3.5"), Some("3.5".to_string()));
        assert_eq!(read("-7"), Some("-7".to_string()));
        assert_eq!(read("9007199254740993"), Some("9007199254740993".to_string()));
        assert_eq!(read("1e20"), Some("100000000000000000000".to_string()));
    }

    #[test]
    fn test_boolean_token_into_string() {
        let decoder = ToleranceDecoder::default();
        let value = json!(false);
        assert_eq!(
            decoder.read::<String>(&mut ValueCursor::new(&value)).unwrap(),
            Some("false".to_string())
        );
    }

    #[test]
    fn test_mismatched_token_fails() {
        let decoder = defaults();
        let err = decode(&decoder, ValueType::Int32, &json!(true)).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnexpectedToken {
                expected: "i32",
                found: TokenKind::Boolean
            }
        );

        let err = decode(&decoder, ValueType::String, &json!({"a": 1})).unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedToken { found: TokenKind::Object, .. }));

        let err = decode(&decoder, ValueType::Boolean, &json!(1)).unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedToken { found: TokenKind::Number, .. }));
    }

    fn read_decimal(decoder: &ToleranceDecoder, value: &Value) -> BigDecimal {
        decoder
            .read::<BigDecimal>(&mut ValueCursor::new(value))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_decimal_keeps_exact_text() {
        let decoder = ToleranceDecoder::default();
        let (digits, scale) =
            read_decimal(&decoder, &raw("0.1000000000000000000000001")).into_bigint_and_exponent();
        assert_eq!(digits.to_string(), "1000000000000000000000001");
        assert_eq!(scale, 25);

        let scientific = read_decimal(&decoder, &raw("1.5e2"));
        assert_eq!(scientific, BigDecimal::from(150));

        let (digits, scale) = read_decimal(&decoder, &json!("12.50")).into_bigint_and_exponent();
        assert_eq!(digits.to_string(), "1250");
        assert_eq!(scale, 2);
    }

    #[test]
    fn test_decimal_beyond_28_digits_is_not_rounded() {
        let decoder = ToleranceDecoder::default();

        let (digits, scale) = read_decimal(&decoder, &raw("0.123456789012345678901234567891"))
            .into_bigint_and_exponent();
        assert_eq!(digits.to_string(), "123456789012345678901234567891");
        assert_eq!(scale, 30);

        let whole = read_decimal(&decoder, &raw("123456789012345678901234567890"));
        assert_eq!(whole, BigDecimal::from_str("123456789012345678901234567890").unwrap());

        let large = read_decimal(&decoder, &raw("1e40"));
        let expected = format!("1{}", "0".repeat(40));
        assert_eq!(large, BigDecimal::from_str(&expected).unwrap());

        let from_string = read_decimal(&decoder, &json!("-98765432109876543210.0123456789012345"));
        let (digits, scale) = from_string.into_bigint_and_exponent();
        assert_eq!(digits.to_string(), "-987654321098765432100123456789012345");
        assert_eq!(scale, 16);
    }

    #[test]
    fn test_number_type_accepts_numeric_strings_only() {
        let decoder = ToleranceDecoder::default();
        let number = decoder
            .read::<Number>(&mut ValueCursor::new(&json!("12.000")))
            .unwrap()
            .unwrap();
        assert_eq!(number.to_string(), "12.000");
        assert!(decoder.read::<Number>(&mut ValueCursor::new(&json!("twelve"))).is_err());
    }

    #[test]
    fn test_encode_none_writes_default_or_null() {
        let mut sink = ValueSink::new();
        defaults().write::<i32>(None, &mut sink).unwrap();
        ToleranceDecoder::default().write::<i32>(None, &mut sink).unwrap();
        defaults().write::<String>(None, &mut sink).unwrap();

        assert_eq!(sink.into_values(), vec![json!(99), Value::Null, json!("none")]);
    }

    #[test]
    fn test_encode_rejects_mismatch_and_non_finite() {
        let decoder = ToleranceDecoder::default();
        let mut sink = ValueSink::new();

        let err = decoder
            .encode(ValueType::Int32, Some(&TolerantValue::Boolean(true)), &mut sink)
            .unwrap_err();
        assert!(matches!(err, DecodeError::TypeMismatch { expected: "i32", actual: "boolean" }));

        let err = decoder.write(Some(&f64::NAN), &mut sink).unwrap_err();
        assert!(matches!(err, DecodeError::NonFinite(_)));
    }

    #[test]
    fn test_decode_encode_round_trip() {
        let decoder = ToleranceDecoder::default();
        let samples = vec![
            TolerantValue::Boolean(false),
            TolerantValue::Int32(i32::MIN),
            TolerantValue::Int64(i64::MAX),
            TolerantValue::Float32(0.1),
            TolerantValue::Float64(-1234.5678),
            TolerantValue::String("héllo".to_string()),
            TolerantValue::Decimal(BigDecimal::from_str("-0.000001").unwrap()),
        ];

        for sample in samples {
            let ty = sample.value_type();
            let mut sink = ValueSink::new();
            decoder.encode(ty, Some(&sample), &mut sink).unwrap();
            let written = sink.into_value();
            let decoded = decode(&decoder, ty, &written).unwrap();
            assert_eq!(decoded, Some(sample));
        }
    }
}
