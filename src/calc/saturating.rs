//! Overflow-free decimal arithmetic
//!
//! `Decimal` operators panic outside roughly ±7.9e28. Every multiply, divide
//! and sum in the engine clamps at that range instead.

use rust_decimal::Decimal;

/// Quotient clamped to `Decimal::MAX`/`MIN`; a zero divisor yields zero
pub fn saturating_div(numerator: Decimal, divisor: Decimal) -> Decimal {
    if divisor.is_zero() {
        return Decimal::ZERO;
    }
    numerator.checked_div(divisor).unwrap_or_else(|| {
        if numerator.is_sign_negative() == divisor.is_sign_negative() {
            Decimal::MAX
        } else {
            Decimal::MIN
        }
    })
}

/// Sum clamped to the representable range
pub fn saturating_sum<I: IntoIterator<Item = Decimal>>(values: I) -> Decimal {
    values
        .into_iter()
        .fold(Decimal::ZERO, |acc, v| acc.saturating_add(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_div_clamps() {
        let tiny = Decimal::new(1, 20);
        assert_eq!(saturating_div(Decimal::from(1_000_000_000), tiny), Decimal::MAX);
        assert_eq!(saturating_div(Decimal::from(-1_000_000_000), tiny), Decimal::MIN);
        assert_eq!(saturating_div(Decimal::from(-1_000_000_000), -tiny), Decimal::MAX);
    }

    #[test]
    fn test_div_ordinary_and_zero() {
        assert_eq!(saturating_div(Decimal::from(300), Decimal::from(4)), Decimal::from(75));
        assert_eq!(saturating_div(Decimal::from(300), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_sum_clamps() {
        assert_eq!(saturating_sum([Decimal::MAX, Decimal::MAX]), Decimal::MAX);
        assert_eq!(saturating_sum([Decimal::from(2), Decimal::from(3)]), Decimal::from(5));
        assert_eq!(saturating_sum(Vec::new()), Decimal::ZERO);
    }
}
