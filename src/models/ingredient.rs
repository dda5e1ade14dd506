//! Ingredient model
//!
//! An ingredient profile: nutrition and price per 100 g, optional density for
//! volume measurements, and allergen flags.

use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::decimal::{get_decimal, get_opt_decimal, opt_to_db, to_db};
use crate::db::DbResult;
use super::Nutrients;

/// Allergens tracked per ingredient
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Allergen {
    Milk,
    Egg,
    Gluten,
    Nuts,
    Soy,
    Shellfish,
}

impl Allergen {
    /// Label text
    pub fn label(&self) -> &'static str {
        match self {
            Allergen::Milk => "Dairy",
            Allergen::Egg => "Egg",
            Allergen::Gluten => "Gluten",
            Allergen::Nuts => "Nuts",
            Allergen::Soy => "Soy",
            Allergen::Shellfish => "Shellfish",
        }
    }
}

/// Allergen flags as stored on the ingredient row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllergenFlags {
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

impl AllergenFlags {
    /// The allergens whose flag is set, in declaration order
    pub fn allergens(&self) -> Vec<Allergen> {
        [
            (self.contains_milk, Allergen::Milk),
            (self.contains_egg, Allergen::Egg),
            (self.contains_gluten, Allergen::Gluten),
            (self.contains_nuts, Allergen::Nuts),
            (self.contains_soy, Allergen::Soy),
            (self.contains_shellfish, Allergen::Shellfish),
        ]
        .into_iter()
        .filter_map(|(set, allergen)| set.then_some(allergen))
        .collect()
    }
}

/// An ingredient profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: i64,
    pub brand: String,
    pub name: String,
    pub unit: String,
    /// Nutrient densities per 100 g
    pub nutrients: Nutrients,
    /// Purchase price per 100 g
    pub price_per_100g: Decimal,
    /// Grams per millilitre, if the ingredient is ever measured by volume
    pub density_g_per_ml: Option<Decimal>,
    pub allergens: AllergenFlags,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a new ingredient
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngredientCreate {
    #[serde(default)]
    pub brand: String,
    pub name: String,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub kcal_per100g: Decimal,
    #[serde(default)]
    pub carbs_per100g: Decimal,
    #[serde(default)]
    pub protein_per100g: Decimal,
    #[serde(default)]
    pub fat_per100g: Decimal,
    #[serde(default)]
    pub sugar_per100g: Decimal,
    #[serde(default)]
    pub sodium_per100g: Decimal,
    pub density_g_per_ml: Option<Decimal>,
    #[serde(default)]
    pub price_per_100g: Decimal,
    #[serde(default)]
    pub allergens: AllergenFlags,
}

fn default_unit() -> String {
    "g".to_string()
}

impl IngredientCreate {
    /// Nutrient densities as a `Nutrients` record
    pub fn nutrients(&self) -> Nutrients {
        Nutrients {
            kcal: self.kcal_per100g,
            carbs: self.carbs_per100g,
            protein: self.protein_per100g,
            fat: self.fat_per100g,
            sugar: self.sugar_per100g,
            sodium: self.sodium_per100g,
        }
    }
}

/// Data for updating an ingredient. A zero density clears the density.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngredientUpdate {
    pub brand: Option<String>,
    pub name: Option<String>,
    pub unit: Option<String>,
    pub kcal_per100g: Option<Decimal>,
    pub carbs_per100g: Option<Decimal>,
    pub protein_per100g: Option<Decimal>,
    pub fat_per100g: Option<Decimal>,
    pub sugar_per100g: Option<Decimal>,
    pub sodium_per100g: Option<Decimal>,
    pub density_g_per_ml: Option<Decimal>,
    pub price_per_100g: Option<Decimal>,
    pub contains_milk: Option<bool>,
    pub contains_egg: Option<bool>,
    pub contains_gluten: Option<bool>,
    pub contains_nuts: Option<bool>,
    pub contains_soy: Option<bool>,
    pub contains_shellfish: Option<bool>,
}

impl IngredientUpdate {
    /// Build an update that overwrites every field with the given profile
    pub fn replace_with(data: &IngredientCreate) -> Self {
        Self {
            brand: Some(data.brand.clone()),
            name: Some(data.name.clone()),
            unit: Some(data.unit.clone()),
            kcal_per100g: Some(data.kcal_per100g),
            carbs_per100g: Some(data.carbs_per100g),
            protein_per100g: Some(data.protein_per100g),
            fat_per100g: Some(data.fat_per100g),
            sugar_per100g: Some(data.sugar_per100g),
            sodium_per100g: Some(data.sodium_per100g),
            density_g_per_ml: Some(data.density_g_per_ml.unwrap_or(Decimal::ZERO)),
            price_per_100g: Some(data.price_per_100g),
            contains_milk: Some(data.allergens.contains_milk),
            contains_egg: Some(data.allergens.contains_egg),
            contains_gluten: Some(data.allergens.contains_gluten),
            contains_nuts: Some(data.allergens.contains_nuts),
            contains_soy: Some(data.allergens.contains_soy),
            contains_shellfish: Some(data.allergens.contains_shellfish),
        }
    }
}

/// Brand and name joined for display, e.g. "Acme Cake Flour"
pub fn display_name(brand: &str, name: &str) -> String {
    format!("{} {}", brand.trim(), name.trim()).trim().to_string()
}

impl Ingredient {
    /// Create an Ingredient from a database row
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            brand: row.get("brand")?,
            name: row.get("name")?,
            unit: row.get("unit")?,
            nutrients: Nutrients {
                kcal: get_decimal(row, "kcal_per100g")?,
                carbs: get_decimal(row, "carbs_per100g")?,
                protein: get_decimal(row, "protein_per100g")?,
                fat: get_decimal(row, "fat_per100g")?,
                sugar: get_decimal(row, "sugar_per100g")?,
                sodium: get_decimal(row, "sodium_per100g")?,
            },
            price_per_100g: get_decimal(row, "price_per_100g")?,
            density_g_per_ml: get_opt_decimal(row, "density_g_per_ml")?,
            allergens: AllergenFlags {
                contains_milk: row.get::<_, i32>("contains_milk")? != 0,
                contains_egg: row.get::<_, i32>("contains_egg")? != 0,
                contains_gluten: row.get::<_, i32>("contains_gluten")? != 0,
                contains_nuts: row.get::<_, i32>("contains_nuts")? != 0,
                contains_soy: row.get::<_, i32>("contains_soy")? != 0,
                contains_shellfish: row.get::<_, i32>("contains_shellfish")? != 0,
            },
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// "brand name" for labels and cost breakdowns
    pub fn display_name(&self) -> String {
        display_name(&self.brand, &self.name)
    }

    /// Insert a new ingredient into the database
    pub fn create(conn: &Connection, data: &IngredientCreate) -> DbResult<Self> {
        let density = data.density_g_per_ml.filter(|d| !d.is_zero());
        conn.execute(
            r#"
            INSERT INTO ingredients (
                brand, name, unit,
                kcal_per100g, carbs_per100g, protein_per100g, fat_per100g, sugar_per100g, sodium_per100g,
                density_g_per_ml, price_per_100g,
                contains_milk, contains_egg, contains_gluten, contains_nuts, contains_soy, contains_shellfish
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
            params![
                data.brand.trim(),
                data.name.trim(),
                data.unit,
                to_db(data.kcal_per100g),
                to_db(data.carbs_per100g),
                to_db(data.protein_per100g),
                to_db(data.fat_per100g),
                to_db(data.sugar_per100g),
                to_db(data.sodium_per100g),
                opt_to_db(density),
                to_db(data.price_per_100g),
                data.allergens.contains_milk as i32,
                data.allergens.contains_egg as i32,
                data.allergens.contains_gluten as i32,
                data.allergens.contains_nuts as i32,
                data.allergens.contains_soy as i32,
                data.allergens.contains_shellfish as i32,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or_else(|| {
            crate::db::DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows)
        })
    }

    /// Get an ingredient by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM ingredients WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Find an ingredient by its (brand, name) identity
    pub fn find_by_identity(conn: &Connection, brand: &str, name: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM ingredients WHERE brand = ?1 AND name = ?2")?;

        let result = stmt.query_row(params![brand.trim(), name.trim()], Self::from_row);
        match result {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Search ingredients by name or brand
    pub fn search(conn: &Connection, query: &str, limit: i64) -> DbResult<Vec<Self>> {
        let search_pattern = format!("%{}%", query);
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM ingredients
            WHERE name LIKE ?1 OR brand LIKE ?1
            ORDER BY brand ASC, name ASC
            LIMIT ?2
            "#,
        )?;

        let items = stmt
            .query_map(params![search_pattern, limit], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// List ingredients ordered by brand then name
    pub fn list(conn: &Connection, limit: i64, offset: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM ingredients ORDER BY brand ASC, name ASC LIMIT ?1 OFFSET ?2",
        )?;

        let items = stmt
            .query_map(params![limit, offset], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// Count all ingredients
    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM ingredients", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Update an ingredient
    pub fn update(conn: &Connection, id: i64, data: &IngredientUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        macro_rules! add_update {
            ($field:ident, $col:expr) => {
                if let Some(ref val) = data.$field {
                    updates.push(format!("{} = ?{}", $col, params_vec.len() + 1));
                    params_vec.push(Box::new(val.trim().to_string()));
                }
            };
        }

        macro_rules! add_decimal_update {
            ($field:ident, $col:expr) => {
                if let Some(val) = data.$field {
                    updates.push(format!("{} = ?{}", $col, params_vec.len() + 1));
                    params_vec.push(Box::new(to_db(val)));
                }
            };
        }

        macro_rules! add_flag_update {
            ($field:ident, $col:expr) => {
                if let Some(val) = data.$field {
                    updates.push(format!("{} = ?{}", $col, params_vec.len() + 1));
                    params_vec.push(Box::new(val as i32));
                }
            };
        }

        add_update!(brand, "brand");
        add_update!(name, "name");
        add_update!(unit, "unit");
        add_decimal_update!(kcal_per100g, "kcal_per100g");
        add_decimal_update!(carbs_per100g, "carbs_per100g");
        add_decimal_update!(protein_per100g, "protein_per100g");
        add_decimal_update!(fat_per100g, "fat_per100g");
        add_decimal_update!(sugar_per100g, "sugar_per100g");
        add_decimal_update!(sodium_per100g, "sodium_per100g");
        add_decimal_update!(price_per_100g, "price_per_100g");
        add_flag_update!(contains_milk, "contains_milk");
        add_flag_update!(contains_egg, "contains_egg");
        add_flag_update!(contains_gluten, "contains_gluten");
        add_flag_update!(contains_nuts, "contains_nuts");
        add_flag_update!(contains_soy, "contains_soy");
        add_flag_update!(contains_shellfish, "contains_shellfish");

        if let Some(density) = data.density_g_per_ml {
            updates.push(format!("density_g_per_ml = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(opt_to_db(Some(density).filter(|d| !d.is_zero()))));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE ingredients SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );

        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Number of recipe items referencing this ingredient
    pub fn get_usage_count(conn: &Connection, id: i64) -> DbResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM recipe_items WHERE ingredient_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Titles of recipes that use this ingredient
    pub fn get_used_in_recipes(conn: &Connection, id: i64) -> DbResult<Vec<String>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT r.title FROM recipes r
            INNER JOIN recipe_items ri ON r.id = ri.recipe_id
            WHERE ri.ingredient_id = ?1
            ORDER BY r.title
            "#,
        )?;

        let titles = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(titles)
    }

    /// Delete an ingredient.
    /// Returns Ok(false) if not found; fails with a constraint error while referenced.
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        if Self::get_by_id(conn, id)?.is_none() {
            return Ok(false);
        }

        let rows = conn.execute("DELETE FROM ingredients WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
