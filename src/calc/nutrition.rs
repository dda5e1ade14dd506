//! Nutrition calculator
//!
//! Sums per-line nutrient contributions, shrinks the batch by the yield rate
//! and splits it into effective servings.

use rust_decimal::Decimal;
use serde::Serialize;

use super::rounding::{one_dp, to_display};
use super::{resolve_lines, servings_for, unresolved_items};
use crate::models::{Nutrients, Recipe, RecipeLine};

/// The six label nutrients, rounded for display
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NutrientFacts {
    pub kcal: f64,
    pub carbs: f64,
    pub protein: f64,
    pub fat: f64,
    pub sugar: f64,
    pub sodium: f64,
}

impl From<&Nutrients> for NutrientFacts {
    fn from(n: &Nutrients) -> Self {
        Self {
            kcal: one_dp(n.kcal),
            carbs: one_dp(n.carbs),
            protein: one_dp(n.protein),
            fat: one_dp(n.fat),
            sugar: one_dp(n.sugar),
            sodium: one_dp(n.sodium),
        }
    }
}

/// Nutrition result for one recipe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutritionSummary {
    pub servings: u32,
    pub piece_weight_g: f64,
    pub total_weight_g: f64,
    pub totals: NutrientFacts,
    pub per_serving: NutrientFacts,
    /// Yield percent actually applied, as a whole number
    pub yield_rate: f64,
    /// Ingredients measured by volume with no density (counted as 0 g)
    pub unresolved_items: Vec<String>,
}

/// Compute the nutrition summary for a recipe snapshot
pub fn compute_nutrition(recipe: &Recipe, lines: &[RecipeLine]) -> NutritionSummary {
    let resolved = resolve_lines(lines);

    let raw_totals: Nutrients = resolved
        .iter()
        .map(|r| r.line.ingredient.nutrients.scale(r.mass.grams / Decimal::ONE_HUNDRED))
        .sum();

    let yield_fraction = recipe.yield_fraction();
    let totals = raw_totals.scale(yield_fraction);
    let (total_weight, servings) = servings_for(recipe, &resolved);
    let per_serving = totals.divide(servings.divisor());

    tracing::debug!(
        "Nutrition for recipe {}: {} g after yield, {} servings, {} kcal",
        recipe.id,
        total_weight,
        servings.servings,
        totals.kcal
    );

    NutritionSummary {
        servings: servings.servings,
        piece_weight_g: one_dp(servings.piece_weight_g),
        total_weight_g: one_dp(total_weight),
        totals: NutrientFacts::from(&totals),
        per_serving: NutrientFacts::from(&per_serving),
        yield_rate: to_display(yield_fraction.saturating_mul(Decimal::ONE_HUNDRED), 0),
        unresolved_items: unresolved_items(&resolved),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::fixtures::{ingredient, line, recipe};

    #[test]
    fn test_single_line_example() {
        let a = ingredient("A", "200", "50", None);
        let summary = compute_nutrition(&recipe(1, "100", None), &[line(a, Some("150"), None)]);

        assert_eq!(summary.totals.kcal, 300.0);
        assert_eq!(summary.per_serving.kcal, 300.0);
        assert_eq!(summary.total_weight_g, 150.0);
        assert_eq!(summary.piece_weight_g, 150.0);
        assert_eq!(summary.servings, 1);
        assert_eq!(summary.yield_rate, 100.0);
        assert!(summary.unresolved_items.is_empty());
    }

    #[test]
    fn test_yield_shrinks_totals_and_weight() {
        let a = ingredient("A", "200", "50", None);
        let summary = compute_nutrition(&recipe(1, "80", None), &[line(a, Some("150"), None)]);

        assert_eq!(summary.totals.kcal, 240.0);
        assert_eq!(summary.total_weight_g, 120.0);
        assert_eq!(summary.yield_rate, 80.0);
    }

    #[test]
    fn test_full_yield_is_plain_sum() {
        let lines = vec![
            line(ingredient("Flour", "364", "0", None), Some("250"), None),
            line(ingredient("Milk", "65", "0", Some("1.03")), None, Some("200")),
            line(ingredient("Sugar", "387", "0", None), Some("120"), None),
        ];
        let summary = compute_nutrition(&recipe(1, "100", None), &lines);

        // 910 + 133.9 + 464.4
        assert_eq!(summary.totals.kcal, 1508.3);
        // 250 + 206 + 120
        assert_eq!(summary.total_weight_g, 576.0);
    }

    #[test]
    fn test_per_serving_times_servings_matches_totals() {
        let lines = vec![
            line(ingredient("Butter", "717", "0", None), Some("113"), None),
            line(ingredient("Cream", "340", "0", Some("0.99")), None, Some("237")),
        ];
        for servings in [1, 3, 7, 12] {
            let summary = compute_nutrition(&recipe(servings, "91", None), &lines);
            let s = summary.servings as f64;
            let tolerance = 0.05 * (s + 1.0) + 1e-9;
            for (per, total) in [
                (summary.per_serving.kcal, summary.totals.kcal),
                (summary.per_serving.carbs, summary.totals.carbs),
                (summary.per_serving.protein, summary.totals.protein),
                (summary.per_serving.fat, summary.totals.fat),
                (summary.per_serving.sugar, summary.totals.sugar),
                (summary.per_serving.sodium, summary.totals.sodium),
            ] {
                assert!((per * s - total).abs() <= tolerance, "{per} * {s} vs {total}");
            }
        }
    }

    #[test]
    fn test_target_piece_weight_drives_servings() {
        let a = ingredient("A", "200", "0", None);
        // 1000 g * 0.9 = 900 g, 900 / 40 = 22.5 -> 23
        let summary = compute_nutrition(&recipe(2, "90", Some("40")), &[line(a, Some("1000"), None)]);
        assert_eq!(summary.servings, 23);
        assert_eq!(summary.piece_weight_g, 40.0);
    }

    #[test]
    fn test_volume_without_density_is_flagged() {
        let lines = vec![
            line(ingredient("Flour", "364", "0", None), Some("100"), None),
            line(ingredient("Syrup", "300", "0", None), None, Some("100")),
        ];
        let summary = compute_nutrition(&recipe(1, "100", None), &lines);

        assert_eq!(summary.totals.kcal, 364.0);
        assert_eq!(summary.total_weight_g, 100.0);
        assert_eq!(summary.unresolved_items, vec!["Test Syrup".to_string()]);
    }

    #[test]
    fn test_degenerate_inputs_do_not_fail() {
        let summary = compute_nutrition(&recipe(0, "0", None), &[]);
        assert_eq!(summary.servings, 1);
        assert_eq!(summary.total_weight_g, 0.0);
        assert_eq!(summary.piece_weight_g, 0.0);
        assert_eq!(summary.totals, NutrientFacts::default());
        assert_eq!(summary.yield_rate, 100.0);
    }

    #[test]
    fn test_negative_nutrients_accepted() {
        let a = ingredient("Odd", "-50", "0", None);
        let summary = compute_nutrition(&recipe(1, "100", None), &[line(a, Some("200"), None)]);
        assert_eq!(summary.totals.kcal, -100.0);
    }

    #[test]
    fn test_recompute_is_identical() {
        let lines = vec![
            line(ingredient("Flour", "364.3", "0", None), Some("333.3"), None),
            line(ingredient("Milk", "65.1", "0", Some("1.031")), None, Some("177.7")),
        ];
        let r = recipe(7, "93.5", None);
        assert_eq!(compute_nutrition(&r, &lines), compute_nutrition(&r, &lines));
    }

    #[test]
    fn test_extreme_magnitudes_saturate() {
        let a = ingredient("A", "200", "50", None);
        let summary = compute_nutrition(
            &recipe(1, "100", Some("0.00000000000000000001")),
            &[line(a, Some("1000000000"), None)],
        );
        assert_eq!(summary.servings, u32::MAX);
        assert_eq!(summary.totals.kcal, 2_000_000_000.0);

        let dense = ingredient("Dense", "70000000000000000000000000000", "0", Some("70000000000000000000000000000"));
        let summary = compute_nutrition(
            &recipe(1, "100", None),
            &[line(dense.clone(), None, Some("1000000")), line(dense, Some("50000000000000000000000000000"), None)],
        );
        assert!(summary.totals.kcal.is_finite());
        assert!(summary.totals.kcal > 7.0e28);
        assert_eq!(summary.servings, 1);
    }
}
