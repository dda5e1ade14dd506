//! Cost calculator
//!
//! Ingredient cost is spent before baking, so a lower yield raises the cost of
//! what is left to sell. Adjustment runs opposite to the nutrition side.

use rust_decimal::Decimal;
use serde::Serialize;

use super::rounding::{money, one_dp};
use super::saturating::saturating_div;
use super::{resolve_lines, servings_for, unresolved_items};
use crate::models::{Recipe, RecipeLine};

/// Margin used when the caller gives none: 150% of cost
pub const DEFAULT_MARGIN_PERCENT: Decimal = Decimal::from_parts(150, 0, 0, false, 0);

/// Cost of one line, rounded for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemCost {
    pub ingredient: String,
    pub amount_g: f64,
    pub price_per_100g: f64,
    pub cost: f64,
}

/// Cost and pricing result for one recipe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostSummary {
    pub total_cost: f64,
    pub adjusted_total_cost: f64,
    pub cost_per_piece: f64,
    pub suggested_price_per_piece: f64,
    pub suggested_total_price: f64,
    pub margin_percent: f64,
    pub yield_rate: f64,
    pub servings: u32,
    pub items_cost: Vec<ItemCost>,
    pub unresolved_items: Vec<String>,
}

/// Compute cost and suggested pricing for a recipe snapshot.
///
/// `margin_percent` is not validated; a negative margin gives a negative price.
pub fn compute_cost(recipe: &Recipe, lines: &[RecipeLine], margin_percent: Decimal) -> CostSummary {
    let resolved = resolve_lines(lines);

    let mut raw_total = Decimal::ZERO;
    let mut items_cost = Vec::with_capacity(resolved.len());
    for r in &resolved {
        let price = r.line.ingredient.price_per_100g;
        let cost = (r.mass.grams / Decimal::ONE_HUNDRED).saturating_mul(price);
        raw_total = raw_total.saturating_add(cost);
        items_cost.push(ItemCost {
            ingredient: r.line.ingredient.display_name(),
            amount_g: one_dp(r.mass.grams),
            price_per_100g: money(price),
            cost: money(cost),
        });
    }

    let yield_fraction = recipe.yield_fraction();
    let adjusted_total = if yield_fraction > Decimal::ZERO {
        saturating_div(raw_total, yield_fraction)
    } else {
        raw_total
    };

    let (_, servings) = servings_for(recipe, &resolved);
    let cost_per_piece = saturating_div(adjusted_total, servings.divisor());

    let multiplier = margin_percent / Decimal::ONE_HUNDRED;

    tracing::debug!(
        "Cost for recipe {}: raw {}, adjusted {}, {} servings, margin {}%",
        recipe.id,
        raw_total,
        adjusted_total,
        servings.servings,
        margin_percent
    );

    CostSummary {
        total_cost: money(raw_total),
        adjusted_total_cost: money(adjusted_total),
        cost_per_piece: money(cost_per_piece),
        suggested_price_per_piece: money(cost_per_piece.saturating_mul(multiplier)),
        suggested_total_price: money(adjusted_total.saturating_mul(multiplier)),
        margin_percent: money(margin_percent),
        yield_rate: money(yield_fraction.saturating_mul(Decimal::ONE_HUNDRED)),
        servings: servings.servings,
        items_cost,
        unresolved_items: unresolved_items(&resolved),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::compute_nutrition;
    use crate::calc::fixtures::{d, ingredient, line, recipe};

    #[test]
    fn test_single_line_example() {
        let a = ingredient("A", "200", "50", None);
        let summary = compute_cost(
            &recipe(1, "100", None),
            &[line(a, Some("150"), None)],
            DEFAULT_MARGIN_PERCENT,
        );

        assert_eq!(summary.total_cost, 75.0);
        assert_eq!(summary.adjusted_total_cost, 75.0);
        assert_eq!(summary.cost_per_piece, 75.0);
        assert_eq!(summary.suggested_price_per_piece, 112.5);
        assert_eq!(summary.suggested_total_price, 112.5);
        assert_eq!(summary.margin_percent, 150.0);
        assert_eq!(summary.servings, 1);
        assert_eq!(
            summary.items_cost,
            vec![ItemCost {
                ingredient: "Test A".to_string(),
                amount_g: 150.0,
                price_per_100g: 50.0,
                cost: 75.0,
            }]
        );
    }

    #[test]
    fn test_yield_inflates_cost() {
        let a = ingredient("A", "200", "50", None);
        let summary = compute_cost(
            &recipe(1, "80", None),
            &[line(a, Some("150"), None)],
            DEFAULT_MARGIN_PERCENT,
        );

        assert_eq!(summary.total_cost, 75.0);
        assert_eq!(summary.adjusted_total_cost, 93.75);
        assert_eq!(summary.yield_rate, 80.0);
    }

    #[test]
    fn test_negative_yield_falls_back_to_raw() {
        let a = ingredient("A", "200", "50", None);
        let summary = compute_cost(&recipe(1, "-20", None), &[line(a, Some("150"), None)], d("100"));
        assert_eq!(summary.adjusted_total_cost, 75.0);
    }

    #[test]
    fn test_servings_match_nutrition() {
        let lines = vec![
            line(ingredient("Flour", "364", "0.45", None), Some("480"), None),
            line(ingredient("Milk", "65", "0.3", Some("1.03")), None, Some("310")),
            line(ingredient("Yeast", "325", "2.1", None), Some("7"), None),
        ];
        for r in [
            recipe(1, "100", None),
            recipe(8, "89", None),
            recipe(3, "92", Some("55")),
            recipe(0, "0", Some("1000")),
        ] {
            let cost = compute_cost(&r, &lines, DEFAULT_MARGIN_PERCENT);
            let nutrition = compute_nutrition(&r, &lines);
            assert_eq!(cost.servings, nutrition.servings);
        }
    }

    #[test]
    fn test_per_piece_uses_effective_servings() {
        let a = ingredient("Dough", "250", "1", None);
        // 1000 g, yield 100, piece 40 g -> 25 servings; cost 10, per piece 0.40
        let summary = compute_cost(&recipe(1, "100", Some("40")), &[line(a, Some("1000"), None)], d("200"));
        assert_eq!(summary.servings, 25);
        assert_eq!(summary.cost_per_piece, 0.4);
        assert_eq!(summary.suggested_price_per_piece, 0.8);
        assert_eq!(summary.suggested_total_price, 20.0);
    }

    #[test]
    fn test_rounding_is_display_only() {
        // three lines of 0.333.. each; summed unrounded then rounded
        let lines: Vec<_> = (0..3)
            .map(|_| line(ingredient("Salt", "0", "1", None), Some("33.3333"), None))
            .collect();
        let summary = compute_cost(&recipe(1, "100", None), &lines, DEFAULT_MARGIN_PERCENT);

        assert!(summary.items_cost.iter().all(|i| i.cost == 0.33));
        assert_eq!(summary.total_cost, 1.0);
    }

    #[test]
    fn test_zero_and_negative_margin() {
        let a = ingredient("A", "200", "50", None);
        let lines = [line(a, Some("150"), None)];
        let r = recipe(1, "100", None);

        let zero = compute_cost(&r, &lines, Decimal::ZERO);
        assert_eq!(zero.suggested_price_per_piece, 0.0);

        let negative = compute_cost(&r, &lines, d("-50"));
        assert_eq!(negative.suggested_price_per_piece, -37.5);
    }

    #[test]
    fn test_free_ingredients_and_no_lines() {
        let free = ingredient("Water", "0", "0", Some("1"));
        let summary = compute_cost(&recipe(0, "100", None), &[line(free, None, Some("500"))], DEFAULT_MARGIN_PERCENT);
        assert_eq!(summary.total_cost, 0.0);
        assert_eq!(summary.cost_per_piece, 0.0);
        assert_eq!(summary.items_cost[0].amount_g, 500.0);

        let empty = compute_cost(&recipe(1, "100", None), &[], DEFAULT_MARGIN_PERCENT);
        assert_eq!(empty.total_cost, 0.0);
        assert!(empty.items_cost.is_empty());
    }

    #[test]
    fn test_extreme_magnitudes_saturate() {
        let a = ingredient("A", "200", "70000000000000000000000000000", None);
        let summary = compute_cost(
            &recipe(1, "0.000000000000000000000001", Some("0.00000000000000000001")),
            &[line(a.clone(), Some("1000000000"), None), line(a, Some("1000000000"), None)],
            d("70000000000000000000000000000"),
        );
        assert!(summary.total_cost.is_finite());
        assert!(summary.adjusted_total_cost > 7.0e28);
        assert!(summary.suggested_total_price > 7.0e28);
        assert!(summary.cost_per_piece.is_finite());
    }
}
