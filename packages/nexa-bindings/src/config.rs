use rust_decimal::RoundingStrategy;

/// Engine settings for the current thread's graph.
///
/// Settings are consulted when a node recomputes, so changing them affects the
/// next `get()` of every stale node but never marks anything invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    pub division: DivisionPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum DivisionPolicy {
    /// The quotient must have a terminating decimal expansion, otherwise the
    /// read fails with `Error::NonTerminatingDecimal`. One that terminates
    /// past the 28th fractional digit fails with `Error::Inexact`.
    #[default]
    Exact,
    /// The quotient is rounded to `scale` fractional digits.
    Rounded { scale: u32, rounding: Rounding },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Rounding {
    #[default]
    HalfUp,
    HalfEven,
    HalfDown,
    Down,
    Up,
    Floor,
    Ceiling,
}

impl From<Rounding> for RoundingStrategy {
    fn from(rounding: Rounding) -> Self {
        match rounding {
            Rounding::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            Rounding::HalfEven => RoundingStrategy::MidpointNearestEven,
            Rounding::HalfDown => RoundingStrategy::MidpointTowardZero,
            Rounding::Down => RoundingStrategy::ToZero,
            Rounding::Up => RoundingStrategy::AwayFromZero,
            Rounding::Floor => RoundingStrategy::ToNegativeInfinity,
            Rounding::Ceiling => RoundingStrategy::ToPositiveInfinity,
        }
    }
}
