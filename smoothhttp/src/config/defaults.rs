//! Fallback values substituted by the tolerant decoder.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// One fallback value per primitive type.
///
/// Built once at configuration time and shared read-only (usually behind an
/// `Arc`) by every decode and encode operation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultValuePolicy {
    /// Default for boolean fields.
    pub def_boolean: bool,
    /// Default for 32-bit integer fields.
    pub def_int32: i32,
    /// Default for 64-bit integer fields.
    pub def_int64: i64,
    /// Default for single-precision fields.
    pub def_float32: f32,
    /// Default for double-precision and untyped number fields.
    pub def_float64: f64,
    /// Default for string fields.
    pub def_string: String,
    /// Seed for decimal fields. Falls back to `def_int32` when unset.
    pub def_decimal_seed: Option<i64>,
}

impl DefaultValuePolicy {
    /// Creates a policy where every default is the type's zero value.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the boolean default.
    #[must_use]
    pub fn with_boolean(mut self, value: bool) -> Self {
        self.def_boolean = value;
        self
    }

    /// Sets the 32-bit integer default.
    #[must_use]
    pub fn with_int32(mut self, value: i32) -> Self {
        self.def_int32 = value;
        self
    }

    /// Sets the 64-bit integer default.
    #[must_use]
    pub fn with_int64(mut self, value: i64) -> Self {
        self.def_int64 = value;
        self
    }

    /// Sets the single-precision default.
    #[must_use]
    pub fn with_float32(mut self, value: f32) -> Self {
        self.def_float32 = value;
        self
    }

    /// Sets the double-precision default.
    #[must_use]
    pub fn with_float64(mut self, value: f64) -> Self {
        self.def_float64 = value;
        self
    }

    /// Sets the string default.
    #[must_use]
    pub fn with_string(mut self, value: impl Into<String>) -> Self {
        self.def_string = value.into();
        self
    }

    /// Sets the decimal seed.
    #[must_use]
    pub fn with_decimal_seed(mut self, seed: i64) -> Self {
        self.def_decimal_seed = Some(seed);
        self
    }

    /// Returns the decimal default, built from the integer seed.
    #[must_use]
    pub fn def_decimal(&self) -> BigDecimal {
        BigDecimal::from(self.def_decimal_seed.unwrap_or_else(|| i64::from(self.def_int32)))
    }
}
