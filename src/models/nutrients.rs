//! Shared nutrient data structure
//!
//! Used for ingredient densities (per 100 g) and for the unrounded
//! accumulators of the nutrition calculator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calc::saturating_div;

/// The six label nutrients, in exact decimal form
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nutrients {
    pub kcal: Decimal,
    pub carbs: Decimal,   // grams
    pub protein: Decimal, // grams
    pub fat: Decimal,     // grams
    pub sugar: Decimal,   // grams
    pub sodium: Decimal,  // milligrams
}

impl Nutrients {
    /// All zeros
    pub fn zero() -> Self {
        Self::default()
    }

    /// Scale every nutrient by a multiplier, clamping at the decimal range
    pub fn scale(&self, multiplier: Decimal) -> Self {
        Self {
            kcal: self.kcal.saturating_mul(multiplier),
            carbs: self.carbs.saturating_mul(multiplier),
            protein: self.protein.saturating_mul(multiplier),
            fat: self.fat.saturating_mul(multiplier),
            sugar: self.sugar.saturating_mul(multiplier),
            sodium: self.sodium.saturating_mul(multiplier),
        }
    }

    /// Divide every nutrient by a divisor; a zero divisor yields zeros
    pub fn divide(&self, divisor: Decimal) -> Self {
        if divisor.is_zero() {
            return Self::zero();
        }
        Self {
            kcal: saturating_div(self.kcal, divisor),
            carbs: saturating_div(self.carbs, divisor),
            protein: saturating_div(self.protein, divisor),
            fat: saturating_div(self.fat, divisor),
            sugar: saturating_div(self.sugar, divisor),
            sodium: saturating_div(self.sodium, divisor),
        }
    }

    /// Add another set of nutrients to this one
    pub fn add(&self, other: &Nutrients) -> Self {
        Self {
            kcal: self.kcal.saturating_add(other.kcal),
            carbs: self.carbs.saturating_add(other.carbs),
            protein: self.protein.saturating_add(other.protein),
            fat: self.fat.saturating_add(other.fat),
            sugar: self.sugar.saturating_add(other.sugar),
            sodium: self.sodium.saturating_add(other.sodium),
        }
    }

    /// True if any density is negative
    pub fn has_negative(&self) -> bool {
        [self.kcal, self.carbs, self.protein, self.fat, self.sugar, self.sodium]
            .iter()
            .any(|v| v.is_sign_negative() && !v.is_zero())
    }
}

impl std::ops::Add for Nutrients {
    type Output = Nutrients;

    fn add(self, other: Nutrients) -> Nutrients {
        Nutrients::add(&self, &other)
    }
}

impl std::ops::AddAssign for Nutrients {
    fn add_assign(&mut self, other: Nutrients) {
        *self = Nutrients::add(self, &other);
    }
}

impl std::ops::Mul<Decimal> for Nutrients {
    type Output = Nutrients;

    fn mul(self, multiplier: Decimal) -> Nutrients {
        self.scale(multiplier)
    }
}

impl std::iter::Sum for Nutrients {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Nutrients::zero(), |acc, n| acc + n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Nutrients {
        Nutrients {
            kcal: Decimal::from(200),
            carbs: Decimal::from(30),
            protein: Decimal::from(5),
            fat: Decimal::from(8),
            sugar: Decimal::from(12),
            sodium: Decimal::from(150),
        }
    }

    #[test]
    fn test_scale_and_sum() {
        let half = sample().scale(Decimal::new(5, 1));
        assert_eq!(half.kcal, Decimal::from(100));

        let total: Nutrients = vec![sample(), half].into_iter().sum();
        assert_eq!(total.kcal, Decimal::from(300));
        assert_eq!(total.sodium, Decimal::from(225));
    }

    #[test]
    fn test_divide_by_zero_yields_zero() {
        assert_eq!(sample().divide(Decimal::ZERO), Nutrients::zero());
        assert_eq!(sample().divide(Decimal::from(2)).protein, Decimal::new(25, 1));
    }

    #[test]
    fn test_has_negative() {
        assert!(!sample().has_negative());
        let mut n = sample();
        n.fat = Decimal::from(-1);
        assert!(n.has_negative());
    }
}
