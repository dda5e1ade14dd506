//! Calculation MCP Tools
//!
//! Load a recipe snapshot and run the nutrition or cost calculator over it.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::calc::{compute_cost, compute_nutrition, CostSummary, NutritionSummary};
use crate::db::Database;
use crate::models::{recipe_allergens, Allergen, Recipe, RecipeItem, RecipeLine};
use crate::presets::{all_presets, YieldPreset};

/// Response for calculate_nutrition
#[derive(Debug, Serialize)]
pub struct RecipeNutritionResponse {
    pub recipe_id: i64,
    pub title: String,
    #[serde(flatten)]
    pub nutrition: NutritionSummary,
    pub allergens: Vec<Allergen>,
}

/// Response for calculate_cost
#[derive(Debug, Serialize)]
pub struct RecipeCostResponse {
    pub recipe_id: i64,
    pub title: String,
    #[serde(flatten)]
    pub cost: CostSummary,
}

/// Response for list_yield_presets
#[derive(Debug, Serialize)]
pub struct YieldPresetsResponse {
    pub presets: Vec<YieldPreset>,
}

/// Recipe plus all lines, read inside one transaction so a concurrent item
/// edit cannot land between the two reads
pub(crate) fn load_snapshot(db: &Database, recipe_id: i64) -> Result<(Recipe, Vec<RecipeLine>), String> {
    let snapshot = db
        .with_snapshot(|conn| {
            let Some(recipe) = Recipe::get_by_id(conn, recipe_id)? else {
                return Ok(None);
            };
            let lines = RecipeItem::get_lines_for_recipe(conn, recipe_id)?;
            Ok(Some((recipe, lines)))
        })
        .map_err(|e| format!("Failed to load recipe: {}", e))?;

    snapshot.ok_or_else(|| format!("Recipe not found with id: {}", recipe_id))
}

/// Nutrition facts for a recipe
pub fn calculate_nutrition(db: &Database, recipe_id: i64) -> Result<RecipeNutritionResponse, String> {
    let (recipe, lines) = load_snapshot(db, recipe_id)?;

    let nutrition = compute_nutrition(&recipe, &lines);

    Ok(RecipeNutritionResponse {
        recipe_id,
        title: recipe.title,
        nutrition,
        allergens: recipe_allergens(&lines),
    })
}

/// Cost and suggested pricing for a recipe
pub fn calculate_cost(db: &Database, recipe_id: i64, margin_percent: Decimal) -> Result<RecipeCostResponse, String> {
    let (recipe, lines) = load_snapshot(db, recipe_id)?;

    let cost = compute_cost(&recipe, &lines, margin_percent);

    Ok(RecipeCostResponse {
        recipe_id,
        title: recipe.title,
        cost,
    })
}

/// Default yield rate for every category
pub fn list_yield_presets() -> YieldPresetsResponse {
    YieldPresetsResponse { presets: all_presets() }
}
