//! Effective serving derivation
//!
//! Both calculators divide by the serving count produced here.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::rounding::round_half_up;
use super::saturating::saturating_div;

/// Serving count and per-serving weight used for division
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveServings {
    pub servings: u32,
    pub piece_weight_g: Decimal,
}

impl EffectiveServings {
    pub fn divisor(&self) -> Decimal {
        Decimal::from(self.servings)
    }
}

/// Derive servings from the batch weight after yield.
///
/// A positive target piece weight fixes the piece weight and sets servings to
/// `round_half_up(total / target)`, at least 1. Otherwise the declared count
/// (at least 1) splits the total evenly.
pub fn effective_servings(
    total_weight_g: Decimal,
    declared_servings: u32,
    target_piece_weight_g: Option<Decimal>,
) -> EffectiveServings {
    if let Some(target) = target_piece_weight_g.filter(|w| *w > Decimal::ZERO) {
        let servings = clamp_servings(round_half_up(saturating_div(total_weight_g, target), 0));
        return EffectiveServings { servings, piece_weight_g: target };
    }

    let servings = declared_servings.max(1);
    EffectiveServings {
        servings,
        piece_weight_g: saturating_div(total_weight_g, Decimal::from(servings)),
    }
}

fn clamp_servings(count: Decimal) -> u32 {
    if count < Decimal::ONE {
        return 1;
    }
    count.to_u32().unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(v: &str) -> Decimal {
        v.parse().unwrap()
    }

    #[test]
    fn test_declared_servings() {
        let s = effective_servings(d("600"), 12, None);
        assert_eq!(s.servings, 12);
        assert_eq!(s.piece_weight_g, d("50"));
    }

    #[test]
    fn test_zero_declared_is_one() {
        let s = effective_servings(d("600"), 0, None);
        assert_eq!(s.servings, 1);
        assert_eq!(s.piece_weight_g, d("600"));
    }

    #[test]
    fn test_target_piece_weight() {
        // 625 / 50 = 12.5 rounds up
        let s = effective_servings(d("625"), 3, Some(d("50")));
        assert_eq!(s.servings, 13);
        assert_eq!(s.piece_weight_g, d("50"));

        let s = effective_servings(d("620"), 3, Some(d("50")));
        assert_eq!(s.servings, 12);
    }

    #[test]
    fn test_target_floors_at_one() {
        let s = effective_servings(d("10"), 5, Some(d("50")));
        assert_eq!(s.servings, 1);
        assert_eq!(s.piece_weight_g, d("50"));

        let s = effective_servings(Decimal::ZERO, 5, Some(d("50")));
        assert_eq!(s.servings, 1);
    }

    #[test]
    fn test_non_positive_target_ignored() {
        let s = effective_servings(d("300"), 4, Some(Decimal::ZERO));
        assert_eq!(s.servings, 4);
        assert_eq!(s.piece_weight_g, d("75"));

        let s = effective_servings(d("300"), 4, Some(d("-10")));
        assert_eq!(s.servings, 4);
    }
}
