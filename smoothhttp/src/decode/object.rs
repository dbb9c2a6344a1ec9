//! Field-level access to JSON objects through the tolerant decoder.

use super::json::{kind_of, ValueCursor, ValueSink};
use super::tolerant::{Tolerant, ToleranceDecoder};
use crate::errors::DecodeError;
use serde_json::{Map, Value};

static NULL: Value = Value::Null;

/// Reads named fields of a JSON object. Missing keys read as null.
#[derive(Debug, Clone, Copy)]
pub struct ObjectReader<'a> {
    object: &'a Map<String, Value>,
    decoder: &'a ToleranceDecoder,
}

impl<'a> ObjectReader<'a> {
    /// Wraps a JSON value that must be an object.
    pub fn new(value: &'a Value, decoder: &'a ToleranceDecoder) -> Result<Self, DecodeError> {
        match value {
            Value::Object(object) => Ok(Self { object, decoder }),
            other => Err(DecodeError::UnexpectedToken {
                expected: "object",
                found: kind_of(other),
            }),
        }
    }

    /// Decodes a field, returning `None` when it is null or absent and no default applies.
    pub fn read<T: Tolerant>(&self, field: &str) -> Result<Option<T>, DecodeError> {
        let value = self.object.get(field).unwrap_or(&NULL);
        self.decoder
            .read(&mut ValueCursor::new(value))
            .map_err(|e| e.in_field(field))
    }

    /// Decodes a field that must end up with a value, either from the wire or a default.
    pub fn require<T: Tolerant>(&self, field: &str) -> Result<T, DecodeError> {
        self.read(field)?.ok_or_else(|| {
            DecodeError::UnexpectedToken {
                expected: T::TYPE.name(),
                found: super::TokenKind::Null,
            }
            .in_field(field)
        })
    }

    /// Decodes a nested object field.
    pub fn nested<M: TolerantModel>(&self, field: &str) -> Result<Option<M>, DecodeError> {
        match self.object.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => ObjectReader::new(value, self.decoder)
                .and_then(|reader| M::read_from(&reader))
                .map(Some)
                .map_err(|e| e.in_field(field)),
        }
    }

    /// Decodes an array field element by element. Null or absent reads as empty.
    pub fn list<T: Tolerant>(&self, field: &str) -> Result<Vec<Option<T>>, DecodeError> {
        match self.object.get(field) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => {
                let mut cursor = ValueCursor::over(items);
                let mut out = Vec::with_capacity(items.len());
                for _ in items {
                    out.push(self.decoder.read(&mut cursor).map_err(|e| e.in_field(field))?);
                }
                Ok(out)
            }
            Some(other) => Err(DecodeError::UnexpectedToken {
                expected: "array",
                found: kind_of(other),
            }
            .in_field(field)),
        }
    }

    /// Returns the decoder backing this reader.
    #[must_use]
    pub fn decoder(&self) -> &'a ToleranceDecoder {
        self.decoder
    }
}

/// Builds a JSON object through the tolerant encoder.
#[derive(Debug, Clone)]
pub struct ObjectWriter<'a> {
    object: Map<String, Value>,
    decoder: &'a ToleranceDecoder,
}

impl<'a> ObjectWriter<'a> {
    /// Creates an empty writer.
    #[must_use]
    pub fn new(decoder: &'a ToleranceDecoder) -> Self {
        Self {
            object: Map::new(),
            decoder,
        }
    }

    /// Writes a field. `None` becomes the configured default, or null.
    pub fn write<T: Tolerant>(
        &mut self,
        field: &str,
        value: Option<&T>,
    ) -> Result<&mut Self, DecodeError> {
        let mut sink = ValueSink::new();
        self.decoder
            .write(value, &mut sink)
            .map_err(|e| e.in_field(field))?;
        self.object.insert(field.to_string(), sink.into_value());
        Ok(self)
    }

    /// Writes a nested model.
    pub fn nested<M: TolerantModel>(
        &mut self,
        field: &str,
        value: Option<&M>,
    ) -> Result<&mut Self, DecodeError> {
        let encoded = match value {
            Some(model) => {
                let mut inner = ObjectWriter::new(self.decoder);
                model.write_to(&mut inner).map_err(|e| e.in_field(field))?;
                inner.finish()
            }
            None => Value::Null,
        };
        self.object.insert(field.to_string(), encoded);
        Ok(self)
    }

    /// Returns the finished object.
    #[must_use]
    pub fn finish(self) -> Value {
        Value::Object(self.object)
    }
}

/// A response model decoded field by field.
pub trait TolerantModel: Sized {
    /// Reads the model from an object.
    fn read_from(reader: &ObjectReader<'_>) -> Result<Self, DecodeError>;

    /// Writes the model into an object.
    fn write_to(&self, writer: &mut ObjectWriter<'_>) -> Result<(), DecodeError>;
}

/// Materializes a model from a raw response body.
pub fn decode_body<M: TolerantModel>(
    body: &[u8],
    decoder: &ToleranceDecoder,
) -> Result<M, DecodeError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    M::read_from(&ObjectReader::new(&value, decoder)?)
}

/// Serializes a model into a request body.
pub fn encode_body<M: TolerantModel>(
    model: &M,
    decoder: &ToleranceDecoder,
) -> Result<Vec<u8>, DecodeError> {
    let mut writer = ObjectWriter::new(decoder);
    model.write_to(&mut writer)?;
    serde_json::to_vec(&writer.finish()).map_err(|e| DecodeError::Malformed(e.to_string()))
}
