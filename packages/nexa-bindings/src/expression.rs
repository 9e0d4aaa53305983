//! Fluent form of the combinators.
//!
//! [`DecimalExpression`] is implemented for every decimal holder, so
//! `price.multiply(&quantity)?.add(0.5)?` builds the same nodes as the
//! functions in [`bindings`](crate::bindings).

use crate::binding::{Binding, BooleanBinding, DecimalBinding, ObjectBinding, StringBinding};
use crate::bindings;
use crate::error::Result;
use crate::format::{DecimalFormatter, PlainFormatter};
use crate::observable::{IntoOperand, ObservableValue};
use crate::operator::Operator;
use rust_decimal::Decimal;
use smallvec::smallvec;

pub trait DecimalExpression: ObservableValue<Value = Decimal> {
    fn negate(&self) -> Result<DecimalBinding> {
        bindings::negate(self)
    }

    fn add(&self, other: impl IntoOperand) -> Result<DecimalBinding> {
        bindings::add(self, other)
    }

    fn subtract(&self, other: impl IntoOperand) -> Result<DecimalBinding> {
        bindings::subtract(self, other)
    }

    fn multiply(&self, other: impl IntoOperand) -> Result<DecimalBinding> {
        bindings::multiply(self, other)
    }

    fn divide(&self, other: impl IntoOperand) -> Result<DecimalBinding> {
        bindings::divide(self, other)
    }

    fn is_equal_to(&self, other: impl IntoOperand) -> Result<BooleanBinding> {
        bindings::equal(self, other)
    }

    fn is_not_equal_to(&self, other: impl IntoOperand) -> Result<BooleanBinding> {
        bindings::not_equal(self, other)
    }

    fn greater_than(&self, other: impl IntoOperand) -> Result<BooleanBinding> {
        bindings::greater_than(self, other)
    }

    fn less_than(&self, other: impl IntoOperand) -> Result<BooleanBinding> {
        bindings::less_than(self, other)
    }

    fn greater_than_or_equal_to(&self, other: impl IntoOperand) -> Result<BooleanBinding> {
        bindings::greater_than_or_equal(self, other)
    }

    fn less_than_or_equal_to(&self, other: impl IntoOperand) -> Result<BooleanBinding> {
        bindings::less_than_or_equal(self, other)
    }

    /// Canonical text of the value, scale preserved.
    fn as_string(&self) -> Result<StringBinding> {
        bindings::format(self, PlainFormatter)
    }

    /// Text through a host-supplied formatter, e.g. one that knows the locale.
    fn as_string_with(&self, formatter: impl DecimalFormatter + 'static) -> Result<StringBinding> {
        bindings::format(self, formatter)
    }

    /// The same value as a nullable decimal.
    fn as_object(&self) -> Result<ObjectBinding> {
        Ok(Binding::from_operator(
            Operator::Wrap,
            smallvec![self.operand()?],
        ))
    }
}

impl<T: ObservableValue<Value = Decimal> + ?Sized> DecimalExpression for T {}

/// A derived decimal expression mirroring `source`.
pub fn decimal_expression<S>(source: &S) -> Result<DecimalBinding>
where
    S: ObservableValue<Value = Decimal> + ?Sized,
{
    Ok(Binding::from_operator(
        Operator::Identity,
        smallvec![source.operand()?],
    ))
}

/// A derived decimal expression over a nullable source; absent reads as zero.
pub fn decimal_expression_optional<S>(source: &S) -> Result<DecimalBinding>
where
    S: ObservableValue<Value = Option<Decimal>> + ?Sized,
{
    Ok(Binding::from_operator(
        Operator::ZeroIfAbsent,
        smallvec![source.operand()?],
    ))
}
