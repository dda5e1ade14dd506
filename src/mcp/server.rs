//! BakeCalc MCP Server Implementation
//!
//! Exposes the ingredient, recipe and calculation tools over MCP.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::db::migrations::get_schema_version;
use crate::db::Database;
use crate::models::{
    AllergenFlags, Category, IngredientCreate, IngredientUpdate, RecipeCreate, RecipeItemCreate,
    RecipeItemUpdate, RecipeUpdate,
};
use crate::tools::status::StatusTracker;
use crate::tools::{calculations, imports, ingredients, labels, recipes};

/// BakeCalc MCP Service
#[derive(Clone)]
pub struct BakecalcService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    /// Margin used by calculate_cost when the caller gives none
    default_margin: Decimal,
    /// TrueType font for labels, resolved once at startup
    label_font: Option<PathBuf>,
    tool_router: ToolRouter<BakecalcService>,
}

impl BakecalcService {
    pub fn new(config: Config, database: Database) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(config.database_path))),
            database,
            default_margin: config.default_margin,
            label_font: labels::resolve_label_font(config.label_font.as_deref()),
            tool_router: Self::tool_router(),
        }
    }
}

/// JSON numbers arrive as f64; the calculators work in Decimal
fn to_decimal(field: &str, value: f64) -> Result<Decimal, McpError> {
    if !value.is_finite() {
        return Err(McpError::invalid_params(format!("{} must be a finite number", field), None));
    }
    Decimal::from_f64(value)
        .ok_or_else(|| McpError::invalid_params(format!("{} is out of range: {}", field, value), None))
}

fn opt_decimal(field: &str, value: Option<f64>) -> Result<Option<Decimal>, McpError> {
    value.map(|v| to_decimal(field, v)).transpose()
}

fn parse_category(raw: Option<&str>) -> Result<Option<Category>, McpError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(code) => code
            .parse::<Category>()
            .map(Some)
            .map_err(|_| McpError::invalid_params(format!("Unknown category: {}", code), None)),
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn not_found(kind: &str, key: impl std::fmt::Display) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(format!(
        r#"{{"error": "{} not found", "id": "{}"}}"#,
        kind, key
    ))]))
}

// ============================================================================
// Ingredient Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddIngredientParams {
    /// Brand or supplier (optional)
    #[serde(default)]
    pub brand: String,
    pub name: String,
    /// Unit label, informational only (default "g")
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub kcal_per100g: f64,
    #[serde(default)]
    pub carbs_per100g: f64,
    #[serde(default)]
    pub protein_per100g: f64,
    #[serde(default)]
    pub fat_per100g: f64,
    #[serde(default)]
    pub sugar_per100g: f64,
    /// Sodium in mg per 100 g
    #[serde(default)]
    pub sodium_per100g: f64,
    /// Grams per millilitre; needed for items measured by volume
    pub density_g_per_ml: Option<f64>,
    #[serde(default)]
    pub price_per_100g: f64,
    #[serde(default)]
    pub contains_milk: bool,
    #[serde(default)]
    pub contains_egg: bool,
    #[serde(default)]
    pub contains_gluten: bool,
    #[serde(default)]
    pub contains_nuts: bool,
    #[serde(default)]
    pub contains_soy: bool,
    #[serde(default)]
    pub contains_shellfish: bool,
}

fn default_unit() -> String { "g".to_string() }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchIngredientsParams {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
}

fn default_search_limit() -> i64 { 20 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IdParams {
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PageParams {
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_list_limit() -> i64 { 50 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateIngredientParams {
    pub id: i64,
    pub brand: Option<String>,
    pub name: Option<String>,
    pub unit: Option<String>,
    pub kcal_per100g: Option<f64>,
    pub carbs_per100g: Option<f64>,
    pub protein_per100g: Option<f64>,
    pub fat_per100g: Option<f64>,
    pub sugar_per100g: Option<f64>,
    pub sodium_per100g: Option<f64>,
    /// Set to 0 to clear the density
    pub density_g_per_ml: Option<f64>,
    pub price_per_100g: Option<f64>,
    pub contains_milk: Option<bool>,
    pub contains_egg: Option<bool>,
    pub contains_gluten: Option<bool>,
    pub contains_nuts: Option<bool>,
    pub contains_soy: Option<bool>,
    pub contains_shellfish: Option<bool>,
}

// ============================================================================
// Recipe Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateRecipeParams {
    pub title: String,
    /// Category code such as SPONGE or COOKIE; pre-fills the yield rate
    pub category: Option<String>,
    /// Declared number of pieces (default 1)
    #[serde(default = "default_servings")]
    pub servings: u32,
    pub notes: Option<String>,
    /// Target weight of one piece in grams; overrides the declared servings
    pub piece_weight_g: Option<f64>,
    /// Percent of raw weight left after baking (default from category, else 100)
    pub yield_rate: Option<f64>,
    pub pre_bake_weight_g: Option<f64>,
    pub post_bake_weight_g: Option<f64>,
}

fn default_servings() -> u32 { 1 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetRecipeByPublicIdParams {
    pub public_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListRecipesParams {
    /// Search in the title (optional)
    pub query: Option<String>,
    /// Only recipes of this category code (optional)
    pub category: Option<String>,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateRecipeParams {
    pub id: i64,
    pub title: Option<String>,
    pub category: Option<String>,
    pub servings: Option<u32>,
    pub notes: Option<String>,
    pub piece_weight_g: Option<f64>,
    pub yield_rate: Option<f64>,
    pub pre_bake_weight_g: Option<f64>,
    pub post_bake_weight_g: Option<f64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddRecipeItemParams {
    pub recipe_id: i64,
    pub ingredient_id: i64,
    /// Amount in grams
    pub amount_g: Option<f64>,
    /// Amount in millilitres, converted with the ingredient's density
    pub amount_ml: Option<f64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateRecipeItemParams {
    /// Recipe item ID
    pub id: i64,
    pub ingredient_id: Option<i64>,
    pub amount_g: Option<f64>,
    pub amount_ml: Option<f64>,
}

// ============================================================================
// Calculation Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RecipeIdParams {
    pub recipe_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CalculateCostParams {
    pub recipe_id: i64,
    /// Markup percent over cost (default 150)
    pub margin_percent: Option<f64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ImportIngredientsParams {
    /// Path of a CSV, .xlsx, .xls or .ods file readable by the server
    pub path: String,
    /// Overwrite ingredients that already exist with the same brand and name
    #[serde(default)]
    pub update_existing: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GenerateLabelParams {
    pub recipe_id: i64,
    /// Where to write the PDF
    pub output_path: String,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl BakecalcService {
    // --- Status ---

    #[tool(description = "Get the current status of the BakeCalc service including build info, database status, and usage instructions")]
    async fn bakecalc_status(&self) -> Result<CallToolResult, McpError> {
        let schema_version = self.database.with_conn(get_schema_version).ok();
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status(schema_version);
        json_result(&status)
    }

    // --- Ingredients ---

    #[tool(description = "Create an ingredient with nutrition and price per 100 g, density for volume measures, and allergen flags")]
    fn add_ingredient(&self, Parameters(p): Parameters<AddIngredientParams>) -> Result<CallToolResult, McpError> {
        let data = IngredientCreate {
            brand: p.brand,
            name: p.name,
            unit: p.unit,
            kcal_per100g: to_decimal("kcal_per100g", p.kcal_per100g)?,
            carbs_per100g: to_decimal("carbs_per100g", p.carbs_per100g)?,
            protein_per100g: to_decimal("protein_per100g", p.protein_per100g)?,
            fat_per100g: to_decimal("fat_per100g", p.fat_per100g)?,
            sugar_per100g: to_decimal("sugar_per100g", p.sugar_per100g)?,
            sodium_per100g: to_decimal("sodium_per100g", p.sodium_per100g)?,
            density_g_per_ml: opt_decimal("density_g_per_ml", p.density_g_per_ml)?,
            price_per_100g: to_decimal("price_per_100g", p.price_per_100g)?,
            allergens: AllergenFlags {
                contains_milk: p.contains_milk,
                contains_egg: p.contains_egg,
                contains_gluten: p.contains_gluten,
                contains_nuts: p.contains_nuts,
                contains_soy: p.contains_soy,
                contains_shellfish: p.contains_shellfish,
            },
        };
        let result = ingredients::add_ingredient(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Search ingredients by name or brand")]
    fn search_ingredients(&self, Parameters(p): Parameters<SearchIngredientsParams>) -> Result<CallToolResult, McpError> {
        let result = ingredients::search_ingredients(&self.database, &p.query, p.limit)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get full details for an ingredient including the recipes that use it")]
    fn get_ingredient(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        match ingredients::get_ingredient(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))? {
            Some(detail) => json_result(&detail),
            None => not_found("Ingredient", p.id),
        }
    }

    #[tool(description = "List ingredients alphabetically with pagination")]
    fn list_ingredients(&self, Parameters(p): Parameters<PageParams>) -> Result<CallToolResult, McpError> {
        let result = ingredients::list_ingredients(&self.database, p.limit, p.offset)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Update an ingredient. Only the given fields change; recipes using it pick up the new values on their next calculation.")]
    fn update_ingredient(&self, Parameters(p): Parameters<UpdateIngredientParams>) -> Result<CallToolResult, McpError> {
        let data = IngredientUpdate {
            brand: p.brand,
            name: p.name,
            unit: p.unit,
            kcal_per100g: opt_decimal("kcal_per100g", p.kcal_per100g)?,
            carbs_per100g: opt_decimal("carbs_per100g", p.carbs_per100g)?,
            protein_per100g: opt_decimal("protein_per100g", p.protein_per100g)?,
            fat_per100g: opt_decimal("fat_per100g", p.fat_per100g)?,
            sugar_per100g: opt_decimal("sugar_per100g", p.sugar_per100g)?,
            sodium_per100g: opt_decimal("sodium_per100g", p.sodium_per100g)?,
            density_g_per_ml: opt_decimal("density_g_per_ml", p.density_g_per_ml)?,
            price_per_100g: opt_decimal("price_per_100g", p.price_per_100g)?,
            contains_milk: p.contains_milk,
            contains_egg: p.contains_egg,
            contains_gluten: p.contains_gluten,
            contains_nuts: p.contains_nuts,
            contains_soy: p.contains_soy,
            contains_shellfish: p.contains_shellfish,
        };
        let result = ingredients::update_ingredient(&self.database, p.id, data)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Delete an ingredient (only allowed if no recipe uses it)")]
    fn delete_ingredient(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        match ingredients::delete_ingredient(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))? {
            Ok(success) => json_result(&success),
            Err(blocked) => json_result(&blocked),
        }
    }

    // --- Recipes ---

    #[tool(description = "Create a recipe. The yield rate comes from measured pre/post-bake weights, then an explicit yield_rate, then the category preset, then 100.")]
    fn create_recipe(&self, Parameters(p): Parameters<CreateRecipeParams>) -> Result<CallToolResult, McpError> {
        let data = RecipeCreate {
            title: p.title,
            category: parse_category(p.category.as_deref())?,
            servings: p.servings,
            notes: p.notes,
            piece_weight_g: opt_decimal("piece_weight_g", p.piece_weight_g)?,
            yield_rate: opt_decimal("yield_rate", p.yield_rate)?,
            pre_bake_weight_g: opt_decimal("pre_bake_weight_g", p.pre_bake_weight_g)?,
            post_bake_weight_g: opt_decimal("post_bake_weight_g", p.post_bake_weight_g)?,
        };
        let result = recipes::create_recipe(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get a recipe with its items and allergens")]
    fn get_recipe(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        match recipes::get_recipe(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))? {
            Some(detail) => json_result(&detail),
            None => not_found("Recipe", p.id),
        }
    }

    #[tool(description = "Get a recipe by its public share id")]
    fn get_recipe_by_public_id(&self, Parameters(p): Parameters<GetRecipeByPublicIdParams>) -> Result<CallToolResult, McpError> {
        match recipes::get_recipe_by_public_id(&self.database, &p.public_id)
            .map_err(|e| McpError::internal_error(e, None))?
        {
            Some(detail) => json_result(&detail),
            None => not_found("Recipe", p.public_id.trim()),
        }
    }

    #[tool(description = "List recipes with optional title search, category filter and pagination")]
    fn list_recipes(&self, Parameters(p): Parameters<ListRecipesParams>) -> Result<CallToolResult, McpError> {
        let result = recipes::list_recipes(&self.database, p.query.as_deref(), p.category.as_deref(), p.limit, p.offset)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Update a recipe. Setting both pre/post-bake weights recomputes the yield rate.")]
    fn update_recipe(&self, Parameters(p): Parameters<UpdateRecipeParams>) -> Result<CallToolResult, McpError> {
        let data = RecipeUpdate {
            title: p.title,
            category: parse_category(p.category.as_deref())?,
            servings: p.servings,
            notes: p.notes,
            piece_weight_g: opt_decimal("piece_weight_g", p.piece_weight_g)?,
            yield_rate: opt_decimal("yield_rate", p.yield_rate)?,
            pre_bake_weight_g: opt_decimal("pre_bake_weight_g", p.pre_bake_weight_g)?,
            post_bake_weight_g: opt_decimal("post_bake_weight_g", p.post_bake_weight_g)?,
        };
        let result = recipes::update_recipe(&self.database, p.id, data).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Delete a recipe and all of its items")]
    fn delete_recipe(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = recipes::delete_recipe(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Add an ingredient to a recipe by grams (amount_g) or millilitres (amount_ml)")]
    fn add_recipe_item(&self, Parameters(p): Parameters<AddRecipeItemParams>) -> Result<CallToolResult, McpError> {
        let data = RecipeItemCreate {
            recipe_id: p.recipe_id,
            ingredient_id: p.ingredient_id,
            amount_g: opt_decimal("amount_g", p.amount_g)?,
            amount_ml: opt_decimal("amount_ml", p.amount_ml)?,
        };
        let result = recipes::add_recipe_item(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Change a recipe item's ingredient or amounts")]
    fn update_recipe_item(&self, Parameters(p): Parameters<UpdateRecipeItemParams>) -> Result<CallToolResult, McpError> {
        let data = RecipeItemUpdate {
            ingredient_id: p.ingredient_id,
            amount_g: opt_decimal("amount_g", p.amount_g)?,
            amount_ml: opt_decimal("amount_ml", p.amount_ml)?,
        };
        match recipes::update_recipe_item(&self.database, p.id, data).map_err(|e| McpError::internal_error(e, None))? {
            Some(item) => json_result(&item),
            None => not_found("Recipe item", p.id),
        }
    }

    #[tool(description = "Remove an item from a recipe")]
    fn remove_recipe_item(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let removed = recipes::remove_recipe_item(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&serde_json::json!({ "success": removed, "id": p.id }))
    }

    // --- Calculations ---

    #[tool(description = "Calculate total and per-serving nutrition for a recipe after the baking yield. Lists items that could not be weighed.")]
    fn calculate_nutrition(&self, Parameters(p): Parameters<RecipeIdParams>) -> Result<CallToolResult, McpError> {
        let result = calculations::calculate_nutrition(&self.database, p.recipe_id)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Calculate ingredient cost, cost per piece and suggested prices for a recipe")]
    fn calculate_cost(&self, Parameters(p): Parameters<CalculateCostParams>) -> Result<CallToolResult, McpError> {
        let margin = opt_decimal("margin_percent", p.margin_percent)?.unwrap_or(self.default_margin);
        let result = calculations::calculate_cost(&self.database, p.recipe_id, margin)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "List the default yield rate for every recipe category")]
    fn list_yield_presets(&self) -> Result<CallToolResult, McpError> {
        json_result(&calculations::list_yield_presets())
    }

    // --- Import / Export ---

    #[tool(description = "Import ingredients from a CSV or spreadsheet (.xlsx/.xls/.ods) file. CSV may be UTF-8, CP949 or Latin-1. Bad rows are reported and skipped.")]
    fn import_ingredients_csv(&self, Parameters(p): Parameters<ImportIngredientsParams>) -> Result<CallToolResult, McpError> {
        let result = imports::import_ingredients_csv(&self.database, &p.path, p.update_existing)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Render a printable nutrition label PDF for a recipe. Embeds a TrueType font (BAKECALC_LABEL_FONT or an installed system font) so Korean text prints.")]
    fn generate_label_pdf(&self, Parameters(p): Parameters<GenerateLabelParams>) -> Result<CallToolResult, McpError> {
        let result = labels::generate_label_pdf(&self.database, p.recipe_id, &p.output_path, self.label_font.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for BakecalcService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "bakecalc".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("BakeCalc".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "BakeCalc - recipe nutrition labels and costing for bakeries. \
                 Call bakecalc_status for usage notes. \
                 Ingredients: add/get/search/list/update/delete_ingredient, import_ingredients_csv. \
                 Recipes: create/get/list/update/delete_recipe, get_recipe_by_public_id, \
                 add/update/remove_recipe_item. \
                 Calculations: calculate_nutrition, calculate_cost, list_yield_presets. \
                 Labels: generate_label_pdf."
                    .into(),
            ),
        }
    }
}
