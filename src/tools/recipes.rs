//! Recipe MCP Tools
//!
//! Tools for managing recipes and their items.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::Database;
use crate::models::{
    recipe_allergens, Allergen, Category, Ingredient, Recipe, RecipeCreate, RecipeItem,
    RecipeItemCreate, RecipeItemDetail, RecipeItemUpdate, RecipeUpdate,
};

/// Response for create_recipe
#[derive(Debug, Serialize)]
pub struct CreateRecipeResponse {
    pub id: i64,
    pub title: String,
    pub yield_rate: Decimal,
    pub public_id: Option<String>,
    pub created_at: String,
}

/// Full recipe detail with items and allergens
#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub items: Vec<RecipeItemDetail>,
    pub allergens: Vec<Allergen>,
}

/// Recipe summary for listing
#[derive(Debug, Serialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub title: String,
    pub category: Option<Category>,
    pub servings: u32,
    pub yield_rate: Decimal,
    pub item_count: usize,
    pub created_at: String,
}

/// Response for list_recipes
#[derive(Debug, Serialize)]
pub struct ListRecipesResponse {
    pub recipes: Vec<RecipeSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Response for successful update
#[derive(Debug, Serialize)]
pub struct RecipeUpdateResponse {
    pub success: bool,
    /// Yield rate after any re-derivation from measured weights
    pub yield_rate: Decimal,
    pub updated_at: String,
}

/// Response for successful delete
#[derive(Debug, Serialize)]
pub struct RecipeDeleteResponse {
    pub success: bool,
    pub deleted_id: i64,
    pub items_removed: usize,
}

/// Response for add_recipe_item
#[derive(Debug, Serialize)]
pub struct AddRecipeItemResponse {
    pub id: i64,
    pub recipe_id: i64,
    pub ingredient_id: i64,
    pub ingredient: String,
    pub amount_g: Option<Decimal>,
    pub amount_ml: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

fn check_non_negative(field: &str, value: Option<Decimal>) -> Result<(), String> {
    match value {
        Some(v) if v.is_sign_negative() && !v.is_zero() => Err(format!("{} cannot be negative", field)),
        _ => Ok(()),
    }
}

fn validate_measurements(
    piece_weight_g: Option<Decimal>,
    yield_rate: Option<Decimal>,
    pre_bake_weight_g: Option<Decimal>,
    post_bake_weight_g: Option<Decimal>,
) -> Result<(), String> {
    check_non_negative("piece_weight_g", piece_weight_g)?;
    check_non_negative("yield_rate", yield_rate)?;
    check_non_negative("pre_bake_weight_g", pre_bake_weight_g)?;
    check_non_negative("post_bake_weight_g", post_bake_weight_g)
}

fn is_positive(value: Option<Decimal>) -> bool {
    value.map_or(false, |v| v > Decimal::ZERO)
}

// ============================================================================
// Recipe Tools
// ============================================================================

/// Create a new recipe and assign its public share id
pub fn create_recipe(db: &Database, data: RecipeCreate) -> Result<CreateRecipeResponse, String> {
    if data.title.trim().is_empty() {
        return Err("Recipe title cannot be empty".to_string());
    }
    if data.servings == 0 {
        return Err("servings must be greater than 0".to_string());
    }
    validate_measurements(
        data.piece_weight_g,
        data.yield_rate,
        data.pre_bake_weight_g,
        data.post_bake_weight_g,
    )?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let recipe = Recipe::create(&conn, &data)
        .map_err(|e| format!("Failed to create recipe: {}", e))?;
    let public_id = Recipe::ensure_public_id(&conn, recipe.id)
        .map_err(|e| format!("Failed to assign public id: {}", e))?;

    tracing::debug!("Created recipe {} with yield {}%", recipe.id, recipe.yield_rate);

    Ok(CreateRecipeResponse {
        id: recipe.id,
        title: recipe.title,
        yield_rate: recipe.yield_rate,
        public_id,
        created_at: recipe.created_at,
    })
}

fn recipe_detail(conn: &rusqlite::Connection, recipe: Recipe) -> Result<RecipeDetail, String> {
    let items = RecipeItem::get_details_for_recipe(conn, recipe.id)
        .map_err(|e| format!("Failed to get items: {}", e))?;
    let lines = RecipeItem::get_lines_for_recipe(conn, recipe.id)
        .map_err(|e| format!("Failed to get ingredients: {}", e))?;

    Ok(RecipeDetail {
        recipe,
        items,
        allergens: recipe_allergens(&lines),
    })
}

/// Get a recipe with full details
pub fn get_recipe(db: &Database, id: i64) -> Result<Option<RecipeDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let recipe = Recipe::get_by_id(&conn, id)
        .map_err(|e| format!("Failed to get recipe: {}", e))?;

    recipe.map(|r| recipe_detail(&conn, r)).transpose()
}

/// Get a recipe by its public share id
pub fn get_recipe_by_public_id(db: &Database, public_id: &str) -> Result<Option<RecipeDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let recipe = Recipe::get_by_public_id(&conn, public_id.trim())
        .map_err(|e| format!("Failed to get recipe: {}", e))?;

    recipe.map(|r| recipe_detail(&conn, r)).transpose()
}

/// List recipes, newest first
pub fn list_recipes(
    db: &Database,
    query: Option<&str>,
    category: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<ListRecipesResponse, String> {
    let limit = limit.clamp(1, 200);
    let offset = offset.max(0);
    let category = match category {
        Some(c) => Some(c.parse::<Category>().map_err(|_| format!("Unknown category: {}", c))?),
        None => None,
    };

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let recipes = Recipe::list(&conn, query, category, limit, offset)
        .map_err(|e| format!("Failed to list recipes: {}", e))?;

    let total = Recipe::count(&conn, category)
        .map_err(|e| format!("Failed to count recipes: {}", e))?;

    let mut summaries = Vec::new();
    for recipe in recipes {
        let items = RecipeItem::get_for_recipe(&conn, recipe.id)
            .map_err(|e| format!("Failed to get items: {}", e))?;

        summaries.push(RecipeSummary {
            id: recipe.id,
            title: recipe.title,
            category: recipe.category,
            servings: recipe.servings,
            yield_rate: recipe.yield_rate,
            item_count: items.len(),
            created_at: recipe.created_at,
        });
    }

    Ok(ListRecipesResponse {
        recipes: summaries,
        total,
        limit,
        offset,
    })
}

/// Update a recipe. Measured weights, when both present, override the yield rate.
pub fn update_recipe(db: &Database, id: i64, data: RecipeUpdate) -> Result<RecipeUpdateResponse, String> {
    if let Some(title) = &data.title {
        if title.trim().is_empty() {
            return Err("Recipe title cannot be empty".to_string());
        }
    }
    if data.servings == Some(0) {
        return Err("servings must be greater than 0".to_string());
    }
    validate_measurements(
        data.piece_weight_g,
        data.yield_rate,
        data.pre_bake_weight_g,
        data.post_bake_weight_g,
    )?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let updated = Recipe::update(&conn, id, &data)
        .map_err(|e| format!("Failed to update recipe: {}", e))?;

    match updated {
        Some(recipe) => Ok(RecipeUpdateResponse {
            success: true,
            yield_rate: recipe.yield_rate,
            updated_at: recipe.updated_at,
        }),
        None => Err(format!("Recipe not found with id: {}", id)),
    }
}

/// Delete a recipe together with its items
pub fn delete_recipe(db: &Database, id: i64) -> Result<RecipeDeleteResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let recipe = Recipe::get_by_id(&conn, id)
        .map_err(|e| format!("Database error: {}", e))?;
    if recipe.is_none() {
        return Err(format!("Recipe not found with id: {}", id));
    }

    let items_removed = RecipeItem::get_for_recipe(&conn, id)
        .map_err(|e| format!("Failed to get items: {}", e))?
        .len();

    Recipe::delete(&conn, id)
        .map_err(|e| format!("Failed to delete recipe: {}", e))?;

    Ok(RecipeDeleteResponse {
        success: true,
        deleted_id: id,
        items_removed,
    })
}

// ============================================================================
// Recipe Item Tools
// ============================================================================

/// Add an ingredient line to a recipe
pub fn add_recipe_item(db: &Database, data: RecipeItemCreate) -> Result<AddRecipeItemResponse, String> {
    check_non_negative("amount_g", data.amount_g)?;
    check_non_negative("amount_ml", data.amount_ml)?;
    if !is_positive(data.amount_g) && !is_positive(data.amount_ml) {
        return Err("Either amount_g or amount_ml must be greater than 0".to_string());
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let recipe = Recipe::get_by_id(&conn, data.recipe_id)
        .map_err(|e| format!("Database error checking recipe: {}", e))?;
    if recipe.is_none() {
        return Err(format!("Recipe not found with id: {}", data.recipe_id));
    }

    let ingredient = Ingredient::get_by_id(&conn, data.ingredient_id)
        .map_err(|e| format!("Database error checking ingredient: {}", e))?
        .ok_or_else(|| format!("Ingredient not found with id: {}", data.ingredient_id))?;

    let warning = (!is_positive(data.amount_g) && ingredient.density_g_per_ml.is_none()).then(|| {
        format!(
            "'{}' has no density; its volume will count as 0 g until one is set",
            ingredient.display_name()
        )
    });

    let item = RecipeItem::create(&conn, &data)
        .map_err(|e| format!("Failed to add item: {}", e))?;

    Ok(AddRecipeItemResponse {
        id: item.id,
        recipe_id: item.recipe_id,
        ingredient_id: item.ingredient_id,
        ingredient: ingredient.display_name(),
        amount_g: item.amount_g,
        amount_ml: item.amount_ml,
        warning,
    })
}

/// Update a recipe item
pub fn update_recipe_item(db: &Database, id: i64, data: RecipeItemUpdate) -> Result<Option<RecipeItem>, String> {
    check_non_negative("amount_g", data.amount_g)?;
    check_non_negative("amount_ml", data.amount_ml)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if let Some(ingredient_id) = data.ingredient_id {
        let ingredient = Ingredient::get_by_id(&conn, ingredient_id)
            .map_err(|e| format!("Database error checking ingredient: {}", e))?;
        if ingredient.is_none() {
            return Err(format!("Ingredient not found with id: {}", ingredient_id));
        }
    }

    RecipeItem::update(&conn, id, &data)
        .map_err(|e| format!("Failed to update item: {}", e))
}

/// Remove an item from a recipe
pub fn remove_recipe_item(db: &Database, id: i64) -> Result<bool, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    RecipeItem::delete(&conn, id)
        .map_err(|e| format!("Failed to remove item: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::{AllergenFlags, IngredientCreate};

    fn test_db() -> Database {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| run_migrations(conn)).unwrap();
        db
    }

    fn add_ingredient(db: &Database, name: &str, density: Option<Decimal>, allergens: AllergenFlags) -> i64 {
        db.with_conn(|conn| {
            Ingredient::create(
                conn,
                &IngredientCreate {
                    name: name.to_string(),
                    unit: "g".to_string(),
                    density_g_per_ml: density,
                    allergens,
                    ..Default::default()
                },
            )
        })
        .unwrap()
        .id
    }

    #[test]
    fn test_create_uses_category_preset() {
        let db = test_db();
        let created = create_recipe(
            &db,
            RecipeCreate {
                title: "Choux".to_string(),
                category: Some(Category::Choux),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(created.yield_rate, Decimal::from(78));
        assert!(created.public_id.is_some());

        let by_public = get_recipe_by_public_id(&db, created.public_id.as_deref().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(by_public.recipe.id, created.id);
    }

    #[test]
    fn test_create_validates() {
        let db = test_db();
        assert!(create_recipe(&db, RecipeCreate { title: " ".to_string(), ..Default::default() }).is_err());
        assert!(create_recipe(
            &db,
            RecipeCreate { title: "Tart".to_string(), servings: 0, ..Default::default() }
        )
        .is_err());
        assert!(create_recipe(
            &db,
            RecipeCreate {
                title: "Tart".to_string(),
                piece_weight_g: Some(Decimal::from(-5)),
                ..Default::default()
            }
        )
        .is_err());
    }

    #[test]
    fn test_update_rederives_yield() {
        let db = test_db();
        let id = create_recipe(&db, RecipeCreate { title: "Pound".to_string(), ..Default::default() })
            .unwrap()
            .id;

        let updated = update_recipe(
            &db,
            id,
            RecipeUpdate {
                yield_rate: Some(Decimal::from(95)),
                pre_bake_weight_g: Some(Decimal::from(1000)),
                post_bake_weight_g: Some(Decimal::from(880)),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.yield_rate, Decimal::from(88));

        assert!(update_recipe(&db, 999, RecipeUpdate::default()).is_err());
    }

    #[test]
    fn test_items_and_allergens() {
        let db = test_db();
        let recipe_id = create_recipe(&db, RecipeCreate { title: "Custard".to_string(), ..Default::default() })
            .unwrap()
            .id;
        let milk = add_ingredient(&db, "Milk", None, AllergenFlags { contains_milk: true, ..Default::default() });
        let egg = add_ingredient(&db, "Egg", None, AllergenFlags { contains_egg: true, ..Default::default() });

        let added = add_recipe_item(
            &db,
            RecipeItemCreate { recipe_id, ingredient_id: milk, amount_g: None, amount_ml: Some(Decimal::from(500)) },
        )
        .unwrap();
        assert!(added.warning.is_some());

        add_recipe_item(
            &db,
            RecipeItemCreate { recipe_id, ingredient_id: egg, amount_g: Some(Decimal::from(120)), amount_ml: None },
        )
        .unwrap();

        let no_amount = add_recipe_item(
            &db,
            RecipeItemCreate { recipe_id, ingredient_id: egg, amount_g: None, amount_ml: None },
        );
        assert!(no_amount.is_err());

        let detail = get_recipe(&db, recipe_id).unwrap().unwrap();
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.allergens, vec![Allergen::Milk, Allergen::Egg]);

        let updated = update_recipe_item(
            &db,
            added.id,
            RecipeItemUpdate { amount_g: Some(Decimal::from(515)), ..Default::default() },
        )
        .unwrap()
        .unwrap();
        assert_eq!(updated.amount_g, Some(Decimal::from(515)));

        let deleted = delete_recipe(&db, recipe_id).unwrap();
        assert_eq!(deleted.items_removed, 2);
        assert!(get_recipe(&db, recipe_id).unwrap().is_none());
        assert!(!remove_recipe_item(&db, added.id).unwrap());
    }

    #[test]
    fn test_list_filters_by_category() {
        let db = test_db();
        for (title, category) in [
            ("Chocolate Cookie", Category::Cookie),
            ("Oat Cookie", Category::Cookie),
            ("Baguette", Category::Baguette),
        ] {
            create_recipe(
                &db,
                RecipeCreate { title: title.to_string(), category: Some(category), ..Default::default() },
            )
            .unwrap();
        }

        let cookies = list_recipes(&db, None, Some("cookie"), 50, 0).unwrap();
        assert_eq!(cookies.total, 2);
        // newest first
        assert_eq!(cookies.recipes[0].title, "Oat Cookie");

        let searched = list_recipes(&db, Some("choc"), None, 50, 0).unwrap();
        assert_eq!(searched.recipes.len(), 1);

        assert!(list_recipes(&db, None, Some("pizza"), 50, 0).is_err());
    }
}
