use crate::error::{Error, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::fmt;
use std::str::FromStr;

/// Type-erased value stored in the graph. Handles convert to and from their
/// concrete type through [`NodeValue`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Decimal(Decimal),
    Optional(Option<Decimal>),
    Bool(bool),
    Text(String),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Decimal(_) => Decimal::KIND,
            Value::Optional(_) => Option::<Decimal>::KIND,
            Value::Bool(_) => bool::KIND,
            Value::Text(_) => String::KIND,
        }
    }

    /// Representation equality: decimals must agree on both value and scale,
    /// so `1.0` and `1.00` count as different values.
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Decimal(a), Value::Decimal(b)) => same_decimal(a, b),
            (Value::Optional(Some(a)), Value::Optional(Some(b))) => same_decimal(a, b),
            (Value::Optional(None), Value::Optional(None)) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }

    pub fn as_decimal(&self) -> Result<Decimal> {
        match self {
            Value::Decimal(value) => Ok(*value),
            other => Err(Error::TypeMismatch {
                expected: Decimal::KIND,
                found: other.kind(),
            }),
        }
    }

    /// Reads a decimal out of a decimal or nullable-decimal value, treating an
    /// absent value as zero.
    pub fn zero_if_absent(&self) -> Result<Decimal> {
        match self {
            Value::Decimal(value) => Ok(*value),
            Value::Optional(value) => Ok(value.unwrap_or(Decimal::ZERO)),
            other => Err(Error::TypeMismatch {
                expected: Decimal::KIND,
                found: other.kind(),
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Decimal(value) => write!(f, "{value}"),
            Value::Optional(Some(value)) => write!(f, "{value}"),
            Value::Optional(None) => f.write_str("null"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Text(value) => f.write_str(value),
        }
    }
}

fn same_decimal(a: &Decimal, b: &Decimal) -> bool {
    a == b && a.scale() == b.scale()
}

/// A concrete type a node can hold.
pub trait NodeValue: Clone + 'static {
    const KIND: &'static str;
    /// Prefix used in diagnostic strings, e.g. `Decimal` in `DecimalProperty [...]`.
    const LABEL: &'static str;

    fn into_value(self) -> Value;

    fn peek(value: &Value) -> Option<&Self>;

    fn default_value() -> Self;

    fn from_value(value: &Value) -> Result<Self> {
        Self::peek(value).cloned().ok_or(Error::TypeMismatch {
            expected: Self::KIND,
            found: value.kind(),
        })
    }
}

impl NodeValue for Decimal {
    const KIND: &'static str = "decimal";
    const LABEL: &'static str = "Decimal";

    fn into_value(self) -> Value {
        Value::Decimal(self)
    }

    fn peek(value: &Value) -> Option<&Self> {
        match value {
            Value::Decimal(v) => Some(v),
            _ => None,
        }
    }

    fn default_value() -> Self {
        Decimal::ZERO
    }
}

impl NodeValue for Option<Decimal> {
    const KIND: &'static str = "optional decimal";
    const LABEL: &'static str = "Object";

    fn into_value(self) -> Value {
        Value::Optional(self)
    }

    fn peek(value: &Value) -> Option<&Self> {
        match value {
            Value::Optional(v) => Some(v),
            _ => None,
        }
    }

    fn default_value() -> Self {
        None
    }
}

impl NodeValue for bool {
    const KIND: &'static str = "boolean";
    const LABEL: &'static str = "Boolean";

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn peek(value: &Value) -> Option<&Self> {
        match value {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    fn default_value() -> Self {
        false
    }
}

impl NodeValue for String {
    const KIND: &'static str = "string";
    const LABEL: &'static str = "String";

    fn into_value(self) -> Value {
        Value::Text(self)
    }

    fn peek(value: &Value) -> Option<&Self> {
        match value {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    fn default_value() -> Self {
        String::new()
    }
}

// Literal coercions. Floats go through their shortest round-trip text so that
// `25.668f64` becomes exactly `25.668` rather than its binary expansion.

pub fn decimal_from_f64(literal: f64) -> Result<Decimal> {
    if literal == 0.0 {
        return Ok(Decimal::ZERO);
    }
    parse_literal(literal.is_finite(), literal.to_string())
}

pub fn decimal_from_f32(literal: f32) -> Result<Decimal> {
    if literal == 0.0 {
        return Ok(Decimal::ZERO);
    }
    parse_literal(literal.is_finite(), literal.to_string())
}

/// `Decimal::from_str` rounds digits past the 28th place away, so the parse
/// only counts if it reproduces the literal's shortest text.
fn parse_literal(finite: bool, text: String) -> Result<Decimal> {
    match Decimal::from_str(&text) {
        Ok(value) if finite && value.normalize().to_string() == text => Ok(value),
        _ => Err(Error::NotRepresentable { literal: text }),
    }
}

// Numeric coercions. Integers truncate toward zero and then narrow with
// two's-complement wrap-around.

pub fn int_value(value: &Decimal) -> i32 {
    truncated(value) as i32
}

pub fn long_value(value: &Decimal) -> i64 {
    truncated(value) as i64
}

pub fn float_value(value: &Decimal) -> f32 {
    value.to_f32().unwrap_or_default()
}

pub fn double_value(value: &Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

fn truncated(value: &Decimal) -> i128 {
    value.trunc().to_i128().unwrap_or_default()
}
