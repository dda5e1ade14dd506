//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 2;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
    }

    if current_version < 2 {
        migrate_v2(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (2)", [])?;
    }

    tracing::debug!("Schema at version {}", SCHEMA_VERSION);
    Ok(())
}

/// Get the currently applied schema version (0 if none)
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Migration v1: ingredients, recipes, recipe items
///
/// Decimal quantities are TEXT; see `db::decimal`.
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- INGREDIENTS
        -- Nutrition and price per 100 g
        -- ============================================
        CREATE TABLE ingredients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            brand TEXT NOT NULL DEFAULT '',
            name TEXT NOT NULL,
            unit TEXT NOT NULL DEFAULT 'g',

            kcal_per100g TEXT NOT NULL DEFAULT '0',
            carbs_per100g TEXT NOT NULL DEFAULT '0',
            protein_per100g TEXT NOT NULL DEFAULT '0',
            fat_per100g TEXT NOT NULL DEFAULT '0',
            sugar_per100g TEXT NOT NULL DEFAULT '0',
            sodium_per100g TEXT NOT NULL DEFAULT '0',
            density_g_per_ml TEXT,                 -- NULL when never measured by volume

            contains_milk INTEGER NOT NULL DEFAULT 0,
            contains_egg INTEGER NOT NULL DEFAULT 0,
            contains_gluten INTEGER NOT NULL DEFAULT 0,
            contains_nuts INTEGER NOT NULL DEFAULT 0,
            contains_soy INTEGER NOT NULL DEFAULT 0,
            contains_shellfish INTEGER NOT NULL DEFAULT 0,

            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),

            UNIQUE(brand, name)
        );

        CREATE INDEX idx_ingredients_name ON ingredients(name);
        CREATE INDEX idx_ingredients_brand ON ingredients(brand);

        -- ============================================
        -- RECIPES
        -- ============================================
        CREATE TABLE recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            category TEXT,
            servings INTEGER NOT NULL DEFAULT 1 CHECK(servings > 0),
            notes TEXT,
            piece_weight_g TEXT,
            yield_rate TEXT NOT NULL DEFAULT '100',
            pre_bake_weight_g TEXT,
            post_bake_weight_g TEXT,

            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_recipes_title ON recipes(title);
        CREATE INDEX idx_recipes_category ON recipes(category);

        -- ============================================
        -- RECIPE ITEMS
        -- Owned by the recipe, referencing an ingredient
        -- ============================================
        CREATE TABLE recipe_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            ingredient_id INTEGER NOT NULL REFERENCES ingredients(id) ON DELETE RESTRICT,
            amount_g TEXT,                         -- grams; NULL or 0 means measured by volume
            amount_ml TEXT,

            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_recipe_items_recipe ON recipe_items(recipe_id);
        CREATE INDEX idx_recipe_items_ingredient ON recipe_items(ingredient_id);
        "#,
    )?;

    Ok(())
}

/// Migration v2: ingredient pricing and public share ids
fn migrate_v2(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        ALTER TABLE ingredients ADD COLUMN price_per_100g TEXT NOT NULL DEFAULT '0';

        ALTER TABLE recipes ADD COLUMN public_id TEXT;
        CREATE UNIQUE INDEX idx_recipes_public_id ON recipes(public_id);
        "#,
    )?;

    Ok(())
}
