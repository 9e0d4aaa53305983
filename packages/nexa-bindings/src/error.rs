use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The node was disposed (or dropped) and can no longer be read or used as an operand.
    #[error("Operand has been disposed.")]
    Disposed,

    /// A write was attempted on a property that currently mirrors an upstream source.
    #[error("{target}A bound value cannot be set.")]
    BoundValueCannotBeSet { target: String },

    #[error("Division by zero.")]
    DivisionByZero,

    #[error("Non-terminating decimal expansion dividing {dividend} by {divisor}; no exact representable decimal result.")]
    NonTerminatingDecimal { dividend: Decimal, divisor: Decimal },

    /// The exact result needs more than 28 fractional digits or 96 bits of mantissa.
    #[error("Result of {op} has no exact decimal representation.")]
    Inexact { op: &'static str },

    #[error("Decimal overflow in {op}.")]
    Overflow { op: &'static str },

    #[error("Literal {literal} cannot be represented as a decimal.")]
    NotRepresentable { literal: String },

    #[error("Expected a {expected} value, found {found}.")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}
