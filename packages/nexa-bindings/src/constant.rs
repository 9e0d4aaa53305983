use crate::error::Result;
use crate::nodes::NodeRef;
use crate::observable::{Observable, ObservableValue};
use crate::value::{decimal_from_f32, decimal_from_f64};
use rust_decimal::Decimal;
use std::fmt;

/// An immutable decimal. It has no graph node, never fires, and ignores
/// listener registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Constant {
    value: Decimal,
}

impl Constant {
    pub fn new(value: Decimal) -> Self {
        Self { value }
    }

    pub fn from_i32(value: i32) -> Self {
        Self::new(Decimal::from(value))
    }

    pub fn from_i64(value: i64) -> Self {
        Self::new(Decimal::from(value))
    }

    pub fn from_f32(value: f32) -> Result<Self> {
        Ok(Self::new(decimal_from_f32(value)?))
    }

    pub fn from_f64(value: f64) -> Result<Self> {
        Ok(Self::new(decimal_from_f64(value)?))
    }

    pub fn value(&self) -> Decimal {
        self.value
    }
}

impl From<Decimal> for Constant {
    fn from(value: Decimal) -> Self {
        Self::new(value)
    }
}

impl Observable for Constant {
    fn node(&self) -> Option<&NodeRef> {
        None
    }
}

impl ObservableValue for Constant {
    type Value = Decimal;

    fn get(&self) -> Result<Decimal> {
        Ok(self.value)
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DecimalConstant [value: {}]", self.value)
    }
}
