//! Recipe calculation engine
//!
//! Pure functions from a recipe snapshot (recipe + lines with ingredient
//! profiles) to nutrition and cost summaries. Nothing here touches storage.

pub mod cost;
pub mod nutrition;
pub mod quantity;
pub mod rounding;
pub mod saturating;
pub mod servings;

use rust_decimal::Decimal;

use crate::models::{Recipe, RecipeLine};

pub use cost::{compute_cost, CostSummary, ItemCost, DEFAULT_MARGIN_PERCENT};
pub use nutrition::{compute_nutrition, NutrientFacts, NutritionSummary};
pub use quantity::{resolve_line, resolve_mass, QuantitySource, ResolvedMass};
pub use rounding::round_half_up;
pub use saturating::{saturating_div, saturating_sum};
pub use servings::{effective_servings, EffectiveServings};

/// A line paired with its resolved mass
pub(crate) struct ResolvedLine<'a> {
    pub line: &'a RecipeLine,
    pub mass: ResolvedMass,
}

pub(crate) fn resolve_lines(lines: &[RecipeLine]) -> Vec<ResolvedLine<'_>> {
    lines
        .iter()
        .map(|line| ResolvedLine { line, mass: resolve_line(line) })
        .collect()
}

/// Names of ingredients whose volume could not be converted
pub(crate) fn unresolved_items(resolved: &[ResolvedLine<'_>]) -> Vec<String> {
    resolved
        .iter()
        .filter(|r| r.mass.is_unresolved())
        .map(|r| r.line.ingredient.display_name())
        .collect()
}

/// Raw batch weight before yield
pub(crate) fn raw_weight(resolved: &[ResolvedLine<'_>]) -> Decimal {
    saturating_sum(resolved.iter().map(|r| r.mass.grams))
}

/// Servings for a recipe, derived from the batch weight after yield
pub(crate) fn servings_for(recipe: &Recipe, resolved: &[ResolvedLine<'_>]) -> (Decimal, EffectiveServings) {
    let total_weight = raw_weight(resolved).saturating_mul(recipe.yield_fraction());
    let servings = effective_servings(total_weight, recipe.servings, recipe.piece_weight_g);
    (total_weight, servings)
}
