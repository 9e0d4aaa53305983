use crate::config::DivisionPolicy;
use crate::error::{Error, Result};
use crate::format::DecimalFormatter;
use crate::nodes::Operand;
use crate::value::Value;
use num_rational::Ratio;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// Compute rule of a derived node. Combinator nodes carry one of the tagged
/// operators; custom nodes carry a closure.
#[derive(Clone)]
pub enum Operator {
    Negate,
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    /// Mirrors its single operand unchanged.
    Identity,
    /// Mirrors a decimal or nullable-decimal operand, reading absent as zero.
    ZeroIfAbsent,
    /// Lifts a decimal operand into a nullable decimal.
    Wrap,
    Format(Rc<dyn DecimalFormatter>),
    Compute(Rc<dyn Fn() -> Result<Value>>),
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Negate => "neg",
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThanOrEqual => "<=",
            Operator::Identity => "id",
            Operator::ZeroIfAbsent => "zero_if_absent",
            Operator::Wrap => "wrap",
            Operator::Format(_) => "format",
            Operator::Compute(_) => "compute",
        }
    }

    pub(crate) fn evaluate(&self, operands: &[Operand], division: DivisionPolicy) -> Result<Value> {
        let value = match self {
            Operator::Negate => Value::Decimal(-decimal(operands, 0)?),
            Operator::Add => {
                let (a, b) = pair(operands)?;
                Value::Decimal(sum(a, b, "add")?)
            }
            Operator::Subtract => {
                let (a, b) = pair(operands)?;
                Value::Decimal(sum(a, -b, "subtract")?)
            }
            Operator::Multiply => {
                let (a, b) = pair(operands)?;
                Value::Decimal(multiply(a, b)?)
            }
            Operator::Divide => {
                let (a, b) = pair(operands)?;
                Value::Decimal(divide(a, b, division)?)
            }
            Operator::Equal => Value::Bool(compare(operands)? == Ordering::Equal),
            Operator::NotEqual => Value::Bool(compare(operands)? != Ordering::Equal),
            Operator::GreaterThan => Value::Bool(compare(operands)? == Ordering::Greater),
            Operator::LessThan => Value::Bool(compare(operands)? == Ordering::Less),
            Operator::GreaterThanOrEqual => Value::Bool(compare(operands)? != Ordering::Less),
            Operator::LessThanOrEqual => Value::Bool(compare(operands)? != Ordering::Greater),
            Operator::Identity => operand(operands, 0)?.read()?,
            Operator::ZeroIfAbsent => {
                Value::Decimal(operand(operands, 0)?.read()?.zero_if_absent()?)
            }
            Operator::Wrap => Value::Optional(Some(decimal(operands, 0)?)),
            Operator::Format(formatter) => Value::Text(formatter.format(&decimal(operands, 0)?)),
            Operator::Compute(compute) => compute()?,
        };
        Ok(value)
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

fn operand(operands: &[Operand], index: usize) -> Result<&Operand> {
    operands.get(index).ok_or(Error::Disposed)
}

fn decimal(operands: &[Operand], index: usize) -> Result<Decimal> {
    operand(operands, index)?.read()?.as_decimal()
}

fn pair(operands: &[Operand]) -> Result<(Decimal, Decimal)> {
    Ok((decimal(operands, 0)?, decimal(operands, 1)?))
}

/// Three-way numeric comparison; scale is ignored, so `1.0 == 1.00`.
fn compare(operands: &[Operand]) -> Result<Ordering> {
    let (a, b) = pair(operands)?;
    Ok(a.cmp(&b))
}

/// Largest scale a `Decimal` can carry.
const MAX_SCALE: u32 = 28;
/// Mantissas are 96 bits wide.
const MANTISSA_LIMIT: u128 = 1 << 96;

fn magnitude(value: Decimal) -> u128 {
    value.mantissa().unsigned_abs()
}

/// Builds `±mantissa × 10^-scale`, dropping only trailing zeros to make it
/// fit. Anything else would be rounding.
fn exact(negative: bool, mut mantissa: u128, mut scale: u32, op: &'static str) -> Result<Decimal> {
    while (scale > MAX_SCALE || mantissa >= MANTISSA_LIMIT) && scale > 0 && mantissa % 10 == 0 {
        mantissa /= 10;
        scale -= 1;
    }
    if mantissa >= MANTISSA_LIMIT {
        return Err(if scale == 0 {
            Error::Overflow { op }
        } else {
            Error::Inexact { op }
        });
    }
    if scale > MAX_SCALE {
        return Err(Error::Inexact { op });
    }
    Ok(Decimal::from_parts(
        mantissa as u32,
        (mantissa >> 32) as u32,
        (mantissa >> 64) as u32,
        negative,
        scale,
    ))
}

/// `checked_add` only reports integer overflow; when the aligned operands need
/// more than 96 bits it silently rounds the fractional part instead.
fn sum(a: Decimal, b: Decimal, op: &'static str) -> Result<Decimal> {
    let overflow = || {
        if a.checked_add(b).is_none() {
            Error::Overflow { op }
        } else {
            Error::Inexact { op }
        }
    };
    let scale = a.scale().max(b.scale());
    let aligned = |value: Decimal| {
        10i128
            .checked_pow(scale - value.scale())
            .and_then(|factor| value.mantissa().checked_mul(factor))
    };
    let total = aligned(a)
        .zip(aligned(b))
        .and_then(|(a, b)| a.checked_add(b))
        .ok_or_else(overflow)?;
    exact(total < 0, total.unsigned_abs(), scale, op)
}

/// Exact product. The representation follows `checked_mul` (scales add up)
/// whenever the result fits.
fn multiply(a: Decimal, b: Decimal) -> Result<Decimal> {
    const OP: &str = "multiply";
    let negative = a.is_sign_negative() != b.is_sign_negative();
    let product = |a: Decimal, b: Decimal| {
        magnitude(a)
            .checked_mul(magnitude(b))
            .map(|mantissa| (mantissa, a.scale() + b.scale()))
    };
    match product(a, b).or_else(|| product(a.normalize(), b.normalize())) {
        Some((mantissa, scale)) => exact(negative, mantissa, scale, OP),
        None if a.checked_mul(b).is_none() => Err(Error::Overflow { op: OP }),
        None => Err(Error::Inexact { op: OP }),
    }
}

pub(crate) fn divide(
    dividend: Decimal,
    divisor: Decimal,
    policy: DivisionPolicy,
) -> Result<Decimal> {
    if divisor.is_zero() {
        return Err(Error::DivisionByZero);
    }
    match policy {
        DivisionPolicy::Exact => exact_quotient(dividend, divisor),
        DivisionPolicy::Rounded { scale, rounding } => dividend
            .checked_div(divisor)
            .map(|quotient| quotient.round_dp_with_strategy(scale, rounding.into()))
            .ok_or(Error::Overflow { op: "divide" }),
    }
}

/// The quotient of two decimals terminates iff the reduced ratio of their
/// mantissas has a denominator of the form `2^x × 5^y`; the scales only
/// contribute powers of ten. A terminating quotient is then built digit for
/// digit instead of going through `checked_div`, which rounds past 28 places.
fn exact_quotient(dividend: Decimal, divisor: Decimal) -> Result<Decimal> {
    const OP: &str = "divide";
    let ratio = Ratio::new(magnitude(dividend), magnitude(divisor));
    let mut denominator = *ratio.denom();
    let (mut twos, mut fives) = (0u32, 0u32);
    while denominator % 2 == 0 {
        denominator /= 2;
        twos += 1;
    }
    while denominator % 5 == 0 {
        denominator /= 5;
        fives += 1;
    }
    if denominator != 1 {
        return Err(Error::NonTerminatingDecimal { dividend, divisor });
    }

    // numer / (2^twos × 5^fives) == numer × 2^(digits - twos) × 5^(digits - fives) / 10^digits
    let digits = twos.max(fives);
    let mantissa = 2u128
        .checked_pow(digits - twos)
        .zip(5u128.checked_pow(digits - fives))
        .and_then(|(two, five)| ratio.numer().checked_mul(two)?.checked_mul(five))
        .ok_or(Error::Inexact { op: OP })?;

    let negative = dividend.is_sign_negative() != divisor.is_sign_negative();
    let scale = i64::from(dividend.scale()) - i64::from(divisor.scale()) + i64::from(digits);
    match u32::try_from(scale) {
        Ok(scale) => exact(negative, mantissa, scale, OP),
        Err(_) => {
            let shift = u32::try_from(-scale).map_err(|_| Error::Overflow { op: OP })?;
            let mantissa = 10u128
                .checked_pow(shift)
                .and_then(|factor| mantissa.checked_mul(factor))
                .ok_or(Error::Overflow { op: OP })?;
            exact(negative, mantissa, 0, OP)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Rounding;
    use rust_decimal_macros::dec;

    fn constants(values: &[Decimal]) -> Vec<Operand> {
        values
            .iter()
            .map(|value| Operand::Constant(Value::Decimal(*value)))
            .collect()
    }

    #[test]
    fn test_exact_division_accepts_terminating_quotients() {
        let quotient = divide(dec!(35.670), dec!(2), DivisionPolicy::Exact).unwrap();
        assert_eq!(quotient, dec!(17.835));
        assert_eq!(divide(dec!(1), dec!(8), DivisionPolicy::Exact).unwrap(), dec!(0.125));
        assert_eq!(divide(dec!(-3), dec!(0.6), DivisionPolicy::Exact).unwrap(), dec!(-5));
        assert_eq!(divide(dec!(0), dec!(3), DivisionPolicy::Exact).unwrap(), dec!(0));
    }

    #[test]
    fn test_exact_division_rejects_repeating_quotients() {
        assert_eq!(
            divide(dec!(1), dec!(3), DivisionPolicy::Exact),
            Err(Error::NonTerminatingDecimal {
                dividend: dec!(1),
                divisor: dec!(3)
            })
        );
        assert!(divide(dec!(2), dec!(3), DivisionPolicy::Exact).is_err());
        // 6/3 reduces away the factor of three.
        assert_eq!(divide(dec!(6), dec!(3), DivisionPolicy::Exact).unwrap(), dec!(2));
    }

    #[test]
    fn test_exact_division_rejects_quotients_past_the_last_digit() {
        // 1 / 2^90 terminates, but only after 90 fractional digits.
        let divisor = Decimal::from(1u128 << 90);
        assert_eq!(
            divide(dec!(1), divisor, DivisionPolicy::Exact),
            Err(Error::Inexact { op: "divide" })
        );
        // 1e-28 / 0.8 would come back as 1e-28 if rounded.
        assert_eq!(
            divide(dec!(0.0000000000000000000000000001), dec!(0.8), DivisionPolicy::Exact),
            Err(Error::Inexact { op: "divide" })
        );
        let quotient = divide(dec!(1), Decimal::from(1u128 << 20), DivisionPolicy::Exact).unwrap();
        assert_eq!(quotient, dec!(0.00000095367431640625));
    }

    #[test]
    fn test_exact_division_keeps_integer_quotients() {
        assert_eq!(divide(dec!(300), dec!(0.03), DivisionPolicy::Exact).unwrap(), dec!(10000));
        assert_eq!(
            divide(Decimal::MAX, dec!(0.5), DivisionPolicy::Exact),
            Err(Error::Overflow { op: "divide" })
        );
    }

    #[test]
    fn test_products_are_exact_or_rejected() {
        let operands = constants(&[dec!(0.00000000000001), dec!(0.000000000000001)]);
        assert_eq!(
            Operator::Multiply.evaluate(&operands, DivisionPolicy::Exact),
            Err(Error::Inexact { op: "multiply" })
        );

        // Too many significant digits for the mantissa, even at a small scale.
        let operands = constants(&[dec!(12345678901.234567), dec!(12345678901.234567)]);
        assert_eq!(
            Operator::Multiply.evaluate(&operands, DivisionPolicy::Exact),
            Err(Error::Inexact { op: "multiply" })
        );

        // Trailing zeros past the last representable place are dropped.
        let operands = constants(&[dec!(0.00000000000002), dec!(0.000000000000005)]);
        assert_eq!(
            Operator::Multiply.evaluate(&operands, DivisionPolicy::Exact),
            Ok(Value::Decimal(dec!(0.0000000000000000000000000001)))
        );

        let operands = constants(&[dec!(1.50), dec!(2.0)]);
        let product = Operator::Multiply
            .evaluate(&operands, DivisionPolicy::Exact)
            .unwrap();
        assert_eq!(product.as_decimal().unwrap().to_string(), "3.000");
    }

    #[test]
    fn test_sums_are_exact_or_rejected() {
        let operands = constants(&[dec!(10000000000000000000000000000), dec!(0.1)]);
        assert_eq!(
            Operator::Add.evaluate(&operands, DivisionPolicy::Exact),
            Err(Error::Inexact { op: "add" })
        );
        let operands = constants(&[dec!(0.10), dec!(0.2)]);
        let total = Operator::Subtract
            .evaluate(&operands, DivisionPolicy::Exact)
            .unwrap();
        assert_eq!(total.as_decimal().unwrap().to_string(), "-0.10");
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            divide(dec!(1), dec!(0.00), DivisionPolicy::Exact),
            Err(Error::DivisionByZero)
        );
    }

    #[test]
    fn test_rounded_division() {
        let policy = DivisionPolicy::Rounded {
            scale: 4,
            rounding: Rounding::HalfUp,
        };
        assert_eq!(divide(dec!(2), dec!(3), policy).unwrap(), dec!(0.6667));
        let policy = DivisionPolicy::Rounded {
            scale: 2,
            rounding: Rounding::Down,
        };
        assert_eq!(divide(dec!(2), dec!(3), policy).unwrap(), dec!(0.66));
    }

    #[test]
    fn test_relational_operators_ignore_scale() {
        let operands = constants(&[dec!(1.0), dec!(1.00)]);
        let eq = Operator::Equal
            .evaluate(&operands, DivisionPolicy::Exact)
            .unwrap();
        assert_eq!(eq, Value::Bool(true));

        let operands = constants(&[dec!(0.1), dec!(0.10000000000000001)]);
        let gt = Operator::LessThan
            .evaluate(&operands, DivisionPolicy::Exact)
            .unwrap();
        assert_eq!(gt, Value::Bool(true));
    }

    #[test]
    fn test_overflow_is_reported() {
        let operands = constants(&[Decimal::MAX, dec!(1)]);
        assert_eq!(
            Operator::Add.evaluate(&operands, DivisionPolicy::Exact),
            Err(Error::Overflow { op: "add" })
        );
    }

    #[test]
    fn test_type_mismatch_on_boolean_operand() {
        let operands = vec![
            Operand::Constant(Value::Bool(true)),
            Operand::Constant(Value::Decimal(dec!(1))),
        ];
        assert!(matches!(
            Operator::Add.evaluate(&operands, DivisionPolicy::Exact),
            Err(Error::TypeMismatch { .. })
        ));
    }
}
