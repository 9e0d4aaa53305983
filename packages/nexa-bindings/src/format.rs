//! Text rendering for derive-to-text bindings.
//!
//! The engine only supplies the up-to-date decimal; how it becomes text is up
//! to a [`DecimalFormatter`]. Locale-aware formatting belongs to the host,
//! which plugs its own formatter in, usually as a closure.

use rust_decimal::Decimal;

pub trait DecimalFormatter {
    fn format(&self, value: &Decimal) -> String;
}

impl<F> DecimalFormatter for F
where
    F: Fn(&Decimal) -> String,
{
    fn format(&self, value: &Decimal) -> String {
        self(value)
    }
}

/// Canonical decimal text, scale preserved (`1.50` stays `1.50`).
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFormatter;

impl DecimalFormatter for PlainFormatter {
    fn format(&self, value: &Decimal) -> String {
        value.to_string()
    }
}
