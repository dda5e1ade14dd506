//! Display rounding
//!
//! Accumulation stays in `Decimal`; only reported values pass through here.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Round half-up (ties away from zero) to `dp` places
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Round for display and convert to f64
pub fn to_display(value: Decimal, dp: u32) -> f64 {
    round_half_up(value, dp).to_f64().unwrap_or(0.0)
}

/// One decimal place: weights and nutrients
pub fn one_dp(value: Decimal) -> f64 {
    to_display(value, 1)
}

/// Two decimal places: money
pub fn money(value: Decimal) -> f64 {
    to_display(value, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(v: &str) -> Decimal {
        v.parse().unwrap()
    }

    #[test]
    fn test_ties_round_away_from_zero() {
        assert_eq!(round_half_up(d("2.5"), 0), d("3"));
        assert_eq!(round_half_up(d("-2.5"), 0), d("-3"));
        assert_eq!(round_half_up(d("0.25"), 1), d("0.3"));
        assert_eq!(round_half_up(d("1.005"), 2), d("1.01"));
    }

    #[test]
    fn test_display_values() {
        assert_eq!(one_dp(d("239.96")), 240.0);
        assert_eq!(money(d("93.745")), 93.75);
        assert_eq!(money(Decimal::ZERO), 0.0);
    }
}
