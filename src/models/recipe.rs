//! Recipe model
//!
//! The aggregate root of a calculation run. Owns its recipe items.

use std::str::FromStr;

use rusqlite::{params, Connection, Row};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::db::decimal::{get_decimal, get_opt_decimal, opt_to_db, to_db};
use crate::calc::saturating_div;
use crate::db::DbResult;
use crate::presets::yield_preset;

/// Bakery product category. Informational, and the key for yield presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Sponge,
    Chiffon,
    Pound,
    Brownie,
    Muffin,
    BakedCheese,
    NobakeCheese,
    Tart,
    TartShell,
    Cookie,
    Macaron,
    Choux,
    Croissant,
    Brioche,
    Shokupan,
    Baguette,
    Cream,
    Custard,
    Ganache,
}

impl Category {
    pub const ALL: [Category; 19] = [
        Category::Sponge,
        Category::Chiffon,
        Category::Pound,
        Category::Brownie,
        Category::Muffin,
        Category::BakedCheese,
        Category::NobakeCheese,
        Category::Tart,
        Category::TartShell,
        Category::Cookie,
        Category::Macaron,
        Category::Choux,
        Category::Croissant,
        Category::Brioche,
        Category::Shokupan,
        Category::Baguette,
        Category::Cream,
        Category::Custard,
        Category::Ganache,
    ];

    /// Database / wire code
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Sponge => "SPONGE",
            Category::Chiffon => "CHIFFON",
            Category::Pound => "POUND",
            Category::Brownie => "BROWNIE",
            Category::Muffin => "MUFFIN",
            Category::BakedCheese => "BAKED_CHEESE",
            Category::NobakeCheese => "NOBAKE_CHEESE",
            Category::Tart => "TART",
            Category::TartShell => "TART_SHELL",
            Category::Cookie => "COOKIE",
            Category::Macaron => "MACARON",
            Category::Choux => "CHOUX",
            Category::Croissant => "CROISSANT",
            Category::Brioche => "BRIOCHE",
            Category::Shokupan => "SHOKUPAN",
            Category::Baguette => "BAGUETTE",
            Category::Cream => "CREAM",
            Category::Custard => "CUSTARD",
            Category::Ganache => "GANACHE",
        }
    }

    /// Human readable name
    pub fn label(&self) -> &'static str {
        match self {
            Category::Sponge => "Sponge / Genoise",
            Category::Chiffon => "Chiffon cake",
            Category::Pound => "Butter / Pound cake",
            Category::Brownie => "Brownie",
            Category::Muffin => "Muffin",
            Category::BakedCheese => "Cheesecake (baked)",
            Category::NobakeCheese => "Cheesecake (no-bake)",
            Category::Tart => "Tart / Pie",
            Category::TartShell => "Tart shell",
            Category::Cookie => "Cookie",
            Category::Macaron => "Macaron",
            Category::Choux => "Choux",
            Category::Croissant => "Croissant / Danish",
            Category::Brioche => "Brioche",
            Category::Shokupan => "Shokupan",
            Category::Baguette => "Baguette / Hard bread",
            Category::Cream => "Whipped cream / Cream",
            Category::Custard => "Custard",
            Category::Ganache => "Ganache / Glaze",
        }
    }
}

/// A category code that names no known category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownCategory;

impl std::fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("unknown category code")
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    /// Parse a category code, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == code)
            .ok_or(UnknownCategory)
    }
}

/// A recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub title: String,
    pub category: Option<Category>,
    /// Declared serving count
    pub servings: u32,
    pub notes: Option<String>,
    /// Target weight of one serving, in grams
    pub piece_weight_g: Option<Decimal>,
    /// Percentage of mass remaining after baking (100 = no loss)
    pub yield_rate: Decimal,
    pub pre_bake_weight_g: Option<Decimal>,
    pub post_bake_weight_g: Option<Decimal>,
    pub public_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a new recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeCreate {
    pub title: String,
    pub category: Option<Category>,
    #[serde(default = "default_servings")]
    pub servings: u32,
    pub notes: Option<String>,
    pub piece_weight_g: Option<Decimal>,
    pub yield_rate: Option<Decimal>,
    pub pre_bake_weight_g: Option<Decimal>,
    pub post_bake_weight_g: Option<Decimal>,
}

fn default_servings() -> u32 {
    1
}

impl Default for RecipeCreate {
    fn default() -> Self {
        Self {
            title: String::new(),
            category: None,
            servings: default_servings(),
            notes: None,
            piece_weight_g: None,
            yield_rate: None,
            pre_bake_weight_g: None,
            post_bake_weight_g: None,
        }
    }
}

impl RecipeCreate {
    /// Yield rate to store: measured weights win, then the explicit value,
    /// then the category preset, then 100.
    pub fn resolve_yield_rate(&self) -> Decimal {
        derive_yield_rate(self.pre_bake_weight_g, self.post_bake_weight_g)
            .or(self.yield_rate)
            .or_else(|| self.category.and_then(yield_preset))
            .unwrap_or(Decimal::ONE_HUNDRED)
    }
}

/// Data for updating a recipe
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeUpdate {
    pub title: Option<String>,
    pub category: Option<Category>,
    pub servings: Option<u32>,
    pub notes: Option<String>,
    pub piece_weight_g: Option<Decimal>,
    pub yield_rate: Option<Decimal>,
    pub pre_bake_weight_g: Option<Decimal>,
    pub post_bake_weight_g: Option<Decimal>,
}

/// Yield rate implied by measured pre/post-bake weights.
///
/// Only defined when both weights are present and the pre-bake weight is
/// positive. Stored at two decimals.
pub fn derive_yield_rate(pre_bake_g: Option<Decimal>, post_bake_g: Option<Decimal>) -> Option<Decimal> {
    match (pre_bake_g, post_bake_g) {
        (Some(pre), Some(post)) if pre > Decimal::ZERO => Some(
            saturating_div(post, pre)
                .saturating_mul(Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        ),
        _ => None,
    }
}

impl Recipe {
    /// Create a Recipe from a database row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let category: Option<String> = row.get("category")?;
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            category: category.as_deref().and_then(|c| c.parse().ok()),
            servings: row.get("servings")?,
            notes: row.get("notes")?,
            piece_weight_g: get_opt_decimal(row, "piece_weight_g")?,
            yield_rate: get_decimal(row, "yield_rate")?,
            pre_bake_weight_g: get_opt_decimal(row, "pre_bake_weight_g")?,
            post_bake_weight_g: get_opt_decimal(row, "post_bake_weight_g")?,
            public_id: row.get("public_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Yield as a fraction. An unset (zero) rate means no loss.
    pub fn yield_fraction(&self) -> Decimal {
        if self.yield_rate.is_zero() {
            Decimal::ONE
        } else {
            self.yield_rate / Decimal::ONE_HUNDRED
        }
    }

    /// Insert a new recipe into the database
    pub fn create(conn: &Connection, data: &RecipeCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO recipes (
                title, category, servings, notes, piece_weight_g,
                yield_rate, pre_bake_weight_g, post_bake_weight_g
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                data.title.trim(),
                data.category.map(|c| c.as_str()),
                data.servings.max(1),
                data.notes,
                opt_to_db(data.piece_weight_g),
                to_db(data.resolve_yield_rate()),
                opt_to_db(data.pre_bake_weight_g),
                opt_to_db(data.post_bake_weight_g),
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or_else(|| {
            crate::db::DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows)
        })
    }

    /// Get a recipe by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM recipes WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(recipe) => Ok(Some(recipe)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get a recipe by its public share id
    pub fn get_by_public_id(conn: &Connection, public_id: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM recipes WHERE public_id = ?1")?;

        let result = stmt.query_row([public_id], Self::from_row);
        match result {
            Ok(recipe) => Ok(Some(recipe)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List recipes, newest first, with optional title search and category filter
    pub fn list(
        conn: &Connection,
        query: Option<&str>,
        category: Option<Category>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Self>> {
        let pattern = format!("%{}%", query.unwrap_or(""));
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM recipes
            WHERE title LIKE ?1 AND (?2 IS NULL OR category = ?2)
            ORDER BY id DESC
            LIMIT ?3 OFFSET ?4
            "#,
        )?;

        let recipes = stmt
            .query_map(
                params![pattern, category.map(|c| c.as_str()), limit, offset],
                Self::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(recipes)
    }

    /// Count recipes, optionally within one category
    pub fn count(conn: &Connection, category: Option<Category>) -> DbResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM recipes WHERE (?1 IS NULL OR category = ?1)",
            params![category.map(|c| c.as_str())],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Update a recipe, then re-derive the yield rate from measured weights
    pub fn update(conn: &Connection, id: i64, data: &RecipeUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        macro_rules! add_decimal_update {
            ($field:ident, $col:expr) => {
                if let Some(val) = data.$field {
                    updates.push(format!("{} = ?{}", $col, params_vec.len() + 1));
                    params_vec.push(Box::new(to_db(val)));
                }
            };
        }

        if let Some(ref title) = data.title {
            updates.push(format!("title = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(title.trim().to_string()));
        }
        if let Some(category) = data.category {
            updates.push(format!("category = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(category.as_str()));
        }
        if let Some(servings) = data.servings {
            updates.push(format!("servings = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(servings.max(1)));
        }
        if let Some(ref notes) = data.notes {
            updates.push(format!("notes = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(notes.clone()));
        }
        add_decimal_update!(piece_weight_g, "piece_weight_g");
        add_decimal_update!(yield_rate, "yield_rate");
        add_decimal_update!(pre_bake_weight_g, "pre_bake_weight_g");
        add_decimal_update!(post_bake_weight_g, "post_bake_weight_g");

        if !updates.is_empty() {
            updates.push("updated_at = datetime('now')".to_string());

            let sql = format!(
                "UPDATE recipes SET {} WHERE id = ?{}",
                updates.join(", "),
                params_vec.len() + 1
            );
            params_vec.push(Box::new(id));

            let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
            conn.execute(&sql, params_refs.as_slice())?;
        }

        Self::apply_measured_yield(conn, id)
    }

    /// Overwrite the stored yield rate when measured weights define one
    fn apply_measured_yield(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let Some(recipe) = Self::get_by_id(conn, id)? else {
            return Ok(None);
        };

        match derive_yield_rate(recipe.pre_bake_weight_g, recipe.post_bake_weight_g) {
            Some(derived) if derived != recipe.yield_rate => {
                conn.execute(
                    "UPDATE recipes SET yield_rate = ?1 WHERE id = ?2",
                    params![to_db(derived), id],
                )?;
                Self::get_by_id(conn, id)
            }
            _ => Ok(Some(recipe)),
        }
    }

    /// Assign a public share id if the recipe has none; returns the id
    pub fn ensure_public_id(conn: &Connection, id: i64) -> DbResult<Option<String>> {
        let Some(recipe) = Self::get_by_id(conn, id)? else {
            return Ok(None);
        };
        if let Some(existing) = recipe.public_id {
            return Ok(Some(existing));
        }

        let public_id = uuid::Uuid::new_v4().to_string();
        conn.execute(
            "UPDATE recipes SET public_id = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![public_id, id],
        )?;
        Ok(Some(public_id))
    }

    /// Delete a recipe; its items go with it
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM recipes WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_derive_yield_rate() {
        assert_eq!(
            derive_yield_rate(Some(Decimal::from(1000)), Some(Decimal::from(920))),
            Some(Decimal::from(92))
        );
        assert_eq!(
            derive_yield_rate(Some(Decimal::from(3)), Some(Decimal::from(2))),
            Some(Decimal::new(6667, 2))
        );
        assert_eq!(derive_yield_rate(Some(Decimal::ZERO), Some(Decimal::from(10))), None);
        assert_eq!(derive_yield_rate(None, Some(Decimal::from(10))), None);
    }

    #[test]
    fn test_derive_yield_rate_clamps_overflow() {
        let derived = derive_yield_rate(Some(Decimal::new(1, 20)), Some(Decimal::from(1_000_000_000)));
        assert_eq!(derived, Some(Decimal::MAX));
    }

    #[test]
    fn test_create_resolves_yield_rate() {
        let conn = setup();

        let measured = Recipe::create(
            &conn,
            &RecipeCreate {
                title: "Pound cake".to_string(),
                category: Some(Category::Pound),
                yield_rate: Some(Decimal::from(50)),
                pre_bake_weight_g: Some(Decimal::from(800)),
                post_bake_weight_g: Some(Decimal::from(720)),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(measured.yield_rate, Decimal::from(90));

        let preset = Recipe::create(
            &conn,
            &RecipeCreate {
                title: "Choux".to_string(),
                category: Some(Category::Choux),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(preset.yield_rate, Decimal::from(78));

        let plain = Recipe::create(
            &conn,
            &RecipeCreate {
                title: "Plain".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(plain.yield_rate, Decimal::ONE_HUNDRED);
        assert_eq!(plain.servings, 1);
    }

    #[test]
    fn test_update_rederives_yield_from_measured_weights() {
        let conn = setup();
        let recipe = Recipe::create(
            &conn,
            &RecipeCreate {
                title: "Brownie".to_string(),
                yield_rate: Some(Decimal::from(95)),
                ..Default::default()
            },
        )
        .unwrap();

        let update = RecipeUpdate {
            pre_bake_weight_g: Some(Decimal::from(500)),
            post_bake_weight_g: Some(Decimal::from(450)),
            ..Default::default()
        };
        let updated = Recipe::update(&conn, recipe.id, &update).unwrap().unwrap();
        assert_eq!(updated.yield_rate, Decimal::from(90));
    }

    #[test]
    fn test_public_id_is_stable() {
        let conn = setup();
        let recipe = Recipe::create(
            &conn,
            &RecipeCreate {
                title: "Macaron".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        let first = Recipe::ensure_public_id(&conn, recipe.id).unwrap().unwrap();
        let second = Recipe::ensure_public_id(&conn, recipe.id).unwrap().unwrap();
        assert_eq!(first, second);

        let found = Recipe::get_by_public_id(&conn, &first).unwrap().unwrap();
        assert_eq!(found.id, recipe.id);
    }

    #[test]
    fn test_yield_fraction_treats_zero_as_unset() {
        let conn = setup();
        let mut recipe = Recipe::create(
            &conn,
            &RecipeCreate {
                title: "Ganache".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        recipe.yield_rate = Decimal::ZERO;
        assert_eq!(recipe.yield_fraction(), Decimal::ONE);
        recipe.yield_rate = Decimal::from(80);
        assert_eq!(recipe.yield_fraction(), Decimal::new(8, 1));
    }

    #[test]
    fn test_category_codes() {
        assert_eq!("baked_cheese".parse::<Category>(), Ok(Category::BakedCheese));
        assert_eq!(" Sponge ".parse::<Category>(), Ok(Category::Sponge));
        assert_eq!("pizza".parse::<Category>(), Err(UnknownCategory));
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
    }
}
