//! Functional form of the combinators.
//!
//! Every operand position accepts a reactive decimal holder or a literal
//! (`i32`, `i64`, `f32`, `f64`, `Decimal`); literals become constants.
//! Operands are checked before anything is built, so a disposed operand fails
//! here rather than at a later `get()`. Arithmetic errors such as a
//! non-terminating division surface at `get()`.

use crate::binding::{Binding, BooleanBinding, DecimalBinding, StringBinding};
use crate::error::Result;
use crate::format::DecimalFormatter;
use crate::observable::{IntoOperand, Observable};
use crate::operator::Operator;
use crate::value::NodeValue;
use rust_decimal::Decimal;
use smallvec::smallvec;
use std::fmt;
use std::rc::Rc;

fn unary<T: NodeValue>(operator: Operator, value: impl IntoOperand) -> Result<Binding<T>> {
    Ok(Binding::from_operator(operator, smallvec![value.into_operand()?]))
}

fn binary<T: NodeValue>(
    operator: Operator,
    a: impl IntoOperand,
    b: impl IntoOperand,
) -> Result<Binding<T>> {
    let operands = smallvec![a.into_operand()?, b.into_operand()?];
    Ok(Binding::from_operator(operator, operands))
}

pub fn negate(value: impl IntoOperand) -> Result<DecimalBinding> {
    unary(Operator::Negate, value)
}

pub fn add(a: impl IntoOperand, b: impl IntoOperand) -> Result<DecimalBinding> {
    binary(Operator::Add, a, b)
}

pub fn subtract(a: impl IntoOperand, b: impl IntoOperand) -> Result<DecimalBinding> {
    binary(Operator::Subtract, a, b)
}

pub fn multiply(a: impl IntoOperand, b: impl IntoOperand) -> Result<DecimalBinding> {
    binary(Operator::Multiply, a, b)
}

/// Exact division under the thread's [`DivisionPolicy`](crate::DivisionPolicy).
pub fn divide(a: impl IntoOperand, b: impl IntoOperand) -> Result<DecimalBinding> {
    binary(Operator::Divide, a, b)
}

pub fn equal(a: impl IntoOperand, b: impl IntoOperand) -> Result<BooleanBinding> {
    binary(Operator::Equal, a, b)
}

pub fn not_equal(a: impl IntoOperand, b: impl IntoOperand) -> Result<BooleanBinding> {
    binary(Operator::NotEqual, a, b)
}

pub fn greater_than(a: impl IntoOperand, b: impl IntoOperand) -> Result<BooleanBinding> {
    binary(Operator::GreaterThan, a, b)
}

pub fn less_than(a: impl IntoOperand, b: impl IntoOperand) -> Result<BooleanBinding> {
    binary(Operator::LessThan, a, b)
}

pub fn greater_than_or_equal(a: impl IntoOperand, b: impl IntoOperand) -> Result<BooleanBinding> {
    binary(Operator::GreaterThanOrEqual, a, b)
}

pub fn less_than_or_equal(a: impl IntoOperand, b: impl IntoOperand) -> Result<BooleanBinding> {
    binary(Operator::LessThanOrEqual, a, b)
}

/// Renders the current value through `formatter`.
pub fn format(
    value: impl IntoOperand,
    formatter: impl DecimalFormatter + 'static,
) -> Result<StringBinding> {
    unary(Operator::Format(Rc::new(formatter)), value)
}

/// A decimal binding over a fallible callable.
///
/// Unlike [`Binding::new`], a failing `compute` does not propagate: the error
/// is logged and the binding reads as zero.
pub fn create_decimal_binding<F, E>(
    compute: F,
    dependencies: &[&dyn Observable],
) -> Result<DecimalBinding>
where
    F: Fn() -> std::result::Result<Decimal, E> + 'static,
    E: fmt::Display,
{
    Binding::new(dependencies, move || match compute() {
        Ok(value) => Ok(value),
        Err(err) => {
            tracing::warn!(%err, "decimal binding computation failed, using zero");
            Ok(Decimal::ZERO)
        }
    })
}
