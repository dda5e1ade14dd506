//! Ingredient MCP Tools
//!
//! Tools for managing ingredient profiles.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::Database;
use crate::models::{Allergen, Ingredient, IngredientCreate, IngredientUpdate};

/// Response for add_ingredient
#[derive(Debug, Serialize)]
pub struct AddIngredientResponse {
    pub id: i64,
    pub brand: String,
    pub name: String,
    pub created_at: String,
}

/// Summary of an ingredient for list/search results
#[derive(Debug, Serialize)]
pub struct IngredientSummary {
    pub id: i64,
    pub brand: String,
    pub name: String,
    pub unit: String,
    pub kcal_per100g: Decimal,
    pub price_per_100g: Decimal,
    pub density_g_per_ml: Option<Decimal>,
    pub allergens: Vec<Allergen>,
}

impl From<&Ingredient> for IngredientSummary {
    fn from(item: &Ingredient) -> Self {
        Self {
            id: item.id,
            brand: item.brand.clone(),
            name: item.name.clone(),
            unit: item.unit.clone(),
            kcal_per100g: item.nutrients.kcal,
            price_per_100g: item.price_per_100g,
            density_g_per_ml: item.density_g_per_ml,
            allergens: item.allergens.allergens(),
        }
    }
}

/// Response for search_ingredients
#[derive(Debug, Serialize)]
pub struct SearchIngredientsResponse {
    pub items: Vec<IngredientSummary>,
    pub total: usize,
}

/// Full ingredient detail with usage
#[derive(Debug, Serialize)]
pub struct IngredientDetail {
    #[serde(flatten)]
    pub ingredient: Ingredient,
    pub usage_count: i64,
    pub used_in_recipes: Vec<String>,
}

/// Response for list_ingredients
#[derive(Debug, Serialize)]
pub struct ListIngredientsResponse {
    pub items: Vec<IngredientSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Response for update_ingredient
#[derive(Debug, Serialize)]
pub struct UpdateIngredientResponse {
    pub success: bool,
    pub updated_at: String,
    /// Recipes whose calculations now reflect the new profile
    pub affected_recipes: Vec<String>,
}

/// Response for delete_ingredient blocked
#[derive(Debug, Serialize)]
pub struct DeleteIngredientBlockedResponse {
    pub error: String,
    pub usage_count: i64,
    pub used_in_recipes: Vec<String>,
}

/// Response for successful delete_ingredient
#[derive(Debug, Serialize)]
pub struct DeleteIngredientSuccessResponse {
    pub success: bool,
    pub deleted_id: i64,
}

fn check_non_negative(field: &str, value: Option<Decimal>) -> Result<(), String> {
    match value {
        Some(v) if v.is_sign_negative() && !v.is_zero() => Err(format!("{} cannot be negative", field)),
        _ => Ok(()),
    }
}

fn validate_profile(
    nutrients: [(&str, Option<Decimal>); 6],
    price: Option<Decimal>,
    density: Option<Decimal>,
) -> Result<(), String> {
    for (field, value) in nutrients {
        check_non_negative(field, value)?;
    }
    check_non_negative("price_per_100g", price)?;
    check_non_negative("density_g_per_ml", density)
}

/// Add a new ingredient
pub fn add_ingredient(db: &Database, mut data: IngredientCreate) -> Result<AddIngredientResponse, String> {
    data.name = data.name.trim().to_string();
    data.brand = data.brand.trim().to_string();
    if data.name.is_empty() {
        return Err("Ingredient name cannot be empty".to_string());
    }
    if data.unit.trim().is_empty() {
        data.unit = "g".to_string();
    }

    validate_profile(
        [
            ("kcal_per100g", Some(data.kcal_per100g)),
            ("carbs_per100g", Some(data.carbs_per100g)),
            ("protein_per100g", Some(data.protein_per100g)),
            ("fat_per100g", Some(data.fat_per100g)),
            ("sugar_per100g", Some(data.sugar_per100g)),
            ("sodium_per100g", Some(data.sodium_per100g)),
        ],
        Some(data.price_per_100g),
        data.density_g_per_ml,
    )?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let existing = Ingredient::find_by_identity(&conn, &data.brand, &data.name)
        .map_err(|e| format!("Database error: {}", e))?;
    if let Some(existing) = existing {
        return Err(format!(
            "Ingredient '{}' already exists with id: {}",
            existing.display_name(),
            existing.id
        ));
    }

    let item = Ingredient::create(&conn, &data)
        .map_err(|e| format!("Failed to create ingredient: {}", e))?;

    Ok(AddIngredientResponse {
        id: item.id,
        brand: item.brand,
        name: item.name,
        created_at: item.created_at,
    })
}

/// Search ingredients by name or brand
pub fn search_ingredients(db: &Database, query: &str, limit: i64) -> Result<SearchIngredientsResponse, String> {
    let limit = limit.clamp(1, 100);
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let items = Ingredient::search(&conn, query.trim(), limit)
        .map_err(|e| format!("Search failed: {}", e))?;

    let summaries: Vec<IngredientSummary> = items.iter().map(IngredientSummary::from).collect();
    let total = summaries.len();

    Ok(SearchIngredientsResponse { items: summaries, total })
}

/// Get an ingredient by ID with usage information
pub fn get_ingredient(db: &Database, id: i64) -> Result<Option<IngredientDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let item = Ingredient::get_by_id(&conn, id)
        .map_err(|e| format!("Failed to get ingredient: {}", e))?;

    match item {
        Some(ingredient) => {
            let usage_count = Ingredient::get_usage_count(&conn, id)
                .map_err(|e| format!("Failed to get usage count: {}", e))?;
            let used_in_recipes = Ingredient::get_used_in_recipes(&conn, id)
                .map_err(|e| format!("Failed to get recipe usage: {}", e))?;

            Ok(Some(IngredientDetail { ingredient, usage_count, used_in_recipes }))
        }
        None => Ok(None),
    }
}

/// List ingredients ordered by brand and name
pub fn list_ingredients(db: &Database, limit: i64, offset: i64) -> Result<ListIngredientsResponse, String> {
    let limit = limit.clamp(1, 200);
    let offset = offset.max(0);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let items = Ingredient::list(&conn, limit, offset)
        .map_err(|e| format!("Failed to list ingredients: {}", e))?;
    let total = Ingredient::count(&conn)
        .map_err(|e| format!("Failed to count ingredients: {}", e))?;

    Ok(ListIngredientsResponse {
        items: items.iter().map(IngredientSummary::from).collect(),
        total,
        limit,
        offset,
    })
}

/// Update an ingredient. A density of 0 clears it.
pub fn update_ingredient(db: &Database, id: i64, data: IngredientUpdate) -> Result<UpdateIngredientResponse, String> {
    if let Some(name) = &data.name {
        if name.trim().is_empty() {
            return Err("Ingredient name cannot be empty".to_string());
        }
    }
    validate_profile(
        [
            ("kcal_per100g", data.kcal_per100g),
            ("carbs_per100g", data.carbs_per100g),
            ("protein_per100g", data.protein_per100g),
            ("fat_per100g", data.fat_per100g),
            ("sugar_per100g", data.sugar_per100g),
            ("sodium_per100g", data.sodium_per100g),
        ],
        data.price_per_100g,
        data.density_g_per_ml,
    )?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let updated = Ingredient::update(&conn, id, &data)
        .map_err(|e| format!("Failed to update ingredient: {}", e))?;

    match updated {
        Some(item) => {
            let affected_recipes = Ingredient::get_used_in_recipes(&conn, id)
                .map_err(|e| format!("Failed to get recipe usage: {}", e))?;

            Ok(UpdateIngredientResponse {
                success: true,
                updated_at: item.updated_at,
                affected_recipes,
            })
        }
        None => Err(format!("Ingredient not found with id: {}", id)),
    }
}

/// Delete an ingredient (blocked while any recipe uses it)
pub fn delete_ingredient(
    db: &Database,
    id: i64,
) -> Result<Result<DeleteIngredientSuccessResponse, DeleteIngredientBlockedResponse>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let ingredient = Ingredient::get_by_id(&conn, id)
        .map_err(|e| format!("Database error: {}", e))?;
    if ingredient.is_none() {
        return Err(format!("Ingredient not found with id: {}", id));
    }

    let usage_count = Ingredient::get_usage_count(&conn, id)
        .map_err(|e| format!("Failed to check usage: {}", e))?;

    if usage_count > 0 {
        let used_in_recipes = Ingredient::get_used_in_recipes(&conn, id)
            .map_err(|e| format!("Failed to get recipe usage: {}", e))?;

        tracing::warn!("Refused to delete ingredient {}: used by {} item(s)", id, usage_count);

        return Ok(Err(DeleteIngredientBlockedResponse {
            error: format!("Cannot delete ingredient: used in {} recipe item(s)", usage_count),
            usage_count,
            used_in_recipes,
        }));
    }

    Ingredient::delete(&conn, id)
        .map_err(|e| format!("Failed to delete ingredient: {}", e))?;

    Ok(Ok(DeleteIngredientSuccessResponse { success: true, deleted_id: id }))
}
