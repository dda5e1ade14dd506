//! Recipe item model
//!
//! One ingredient entry within a recipe, measured by mass and/or volume.

use std::collections::BTreeSet;

use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::decimal::{get_opt_decimal, opt_to_db};
use crate::db::DbResult;
use super::{Allergen, Ingredient};

/// A recipe item linking an ingredient to a recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeItem {
    pub id: i64,
    pub recipe_id: i64,
    pub ingredient_id: i64,
    /// Mass in grams
    pub amount_g: Option<Decimal>,
    /// Volume in millilitres
    pub amount_ml: Option<Decimal>,
    pub created_at: String,
    pub updated_at: String,
}

/// Recipe item with ingredient display details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeItemDetail {
    pub id: i64,
    pub ingredient_id: i64,
    pub ingredient: String,
    pub amount_g: Option<Decimal>,
    pub amount_ml: Option<Decimal>,
}

/// A recipe item together with the ingredient profile it references.
///
/// This is the snapshot the calculators consume.
#[derive(Debug, Clone)]
pub struct RecipeLine {
    pub item: RecipeItem,
    pub ingredient: Ingredient,
}

/// Data for adding an item to a recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeItemCreate {
    pub recipe_id: i64,
    pub ingredient_id: i64,
    pub amount_g: Option<Decimal>,
    pub amount_ml: Option<Decimal>,
}

/// Data for updating a recipe item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeItemUpdate {
    pub ingredient_id: Option<i64>,
    pub amount_g: Option<Decimal>,
    pub amount_ml: Option<Decimal>,
}

impl RecipeItem {
    /// Create from a database row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            recipe_id: row.get("recipe_id")?,
            ingredient_id: row.get("ingredient_id")?,
            amount_g: get_opt_decimal(row, "amount_g")?,
            amount_ml: get_opt_decimal(row, "amount_ml")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Add an item to a recipe
    pub fn create(conn: &Connection, data: &RecipeItemCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO recipe_items (recipe_id, ingredient_id, amount_g, amount_ml)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                data.recipe_id,
                data.ingredient_id,
                opt_to_db(data.amount_g),
                opt_to_db(data.amount_ml),
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or_else(|| {
            crate::db::DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows)
        })
    }

    /// Get an item by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM recipe_items WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get all items for a recipe
    pub fn get_for_recipe(conn: &Connection, recipe_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM recipe_items WHERE recipe_id = ?1 ORDER BY id")?;

        let items = stmt
            .query_map([recipe_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// Get items with ingredient names for a recipe
    pub fn get_details_for_recipe(conn: &Connection, recipe_id: i64) -> DbResult<Vec<RecipeItemDetail>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT ri.id, ri.ingredient_id, i.brand, i.name, ri.amount_g, ri.amount_ml
            FROM recipe_items ri
            INNER JOIN ingredients i ON ri.ingredient_id = i.id
            WHERE ri.recipe_id = ?1
            ORDER BY ri.id
            "#,
        )?;

        let details = stmt
            .query_map([recipe_id], |row| {
                let brand: String = row.get("brand")?;
                let name: String = row.get("name")?;
                Ok(RecipeItemDetail {
                    id: row.get("id")?,
                    ingredient_id: row.get("ingredient_id")?,
                    ingredient: super::ingredient::display_name(&brand, &name),
                    amount_g: get_opt_decimal(row, "amount_g")?,
                    amount_ml: get_opt_decimal(row, "amount_ml")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(details)
    }

    /// Load every item of a recipe with its ingredient profile
    pub fn get_lines_for_recipe(conn: &Connection, recipe_id: i64) -> DbResult<Vec<RecipeLine>> {
        let items = Self::get_for_recipe(conn, recipe_id)?;

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let ingredient = Ingredient::get_by_id(conn, item.ingredient_id)?
                .ok_or_else(|| crate::db::DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))?;
            lines.push(RecipeLine { item, ingredient });
        }

        Ok(lines)
    }

    /// Update an item
    pub fn update(conn: &Connection, id: i64, data: &RecipeItemUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ingredient_id) = data.ingredient_id {
            updates.push(format!("ingredient_id = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(ingredient_id));
        }
        if let Some(amount_g) = data.amount_g {
            updates.push(format!("amount_g = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(opt_to_db(Some(amount_g))));
        }
        if let Some(amount_ml) = data.amount_ml {
            updates.push(format!("amount_ml = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(opt_to_db(Some(amount_ml))));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE recipe_items SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );

        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Delete an item
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM recipe_items WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

/// Every allergen present in any of the lines, sorted and de-duplicated
pub fn recipe_allergens(lines: &[RecipeLine]) -> Vec<Allergen> {
    lines
        .iter()
        .flat_map(|line| line.ingredient.allergens.allergens())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::{AllergenFlags, IngredientCreate, Recipe, RecipeCreate};

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn ingredient(conn: &Connection, name: &str, allergens: AllergenFlags) -> Ingredient {
        Ingredient::create(
            conn,
            &IngredientCreate {
                name: name.to_string(),
                unit: "g".to_string(),
                allergens,
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn recipe(conn: &Connection) -> Recipe {
        Recipe::create(
            conn,
            &RecipeCreate {
                title: "Madeleine".to_string(),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_lines_carry_ingredient_profiles() {
        let conn = setup();
        let flour = ingredient(&conn, "Flour", AllergenFlags { contains_gluten: true, ..Default::default() });
        let milk = ingredient(&conn, "Milk", AllergenFlags { contains_milk: true, ..Default::default() });
        let recipe = recipe(&conn);

        for (ingredient_id, amount_g, amount_ml) in [
            (flour.id, Some(Decimal::from(200)), None),
            (milk.id, None, Some(Decimal::from(100))),
        ] {
            RecipeItem::create(
                &conn,
                &RecipeItemCreate { recipe_id: recipe.id, ingredient_id, amount_g, amount_ml },
            )
            .unwrap();
        }

        let lines = RecipeItem::get_lines_for_recipe(&conn, recipe.id).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].ingredient.name, "Flour");
        assert_eq!(lines[1].item.amount_ml, Some(Decimal::from(100)));
        assert_eq!(lines[1].item.amount_g, None);

        assert_eq!(recipe_allergens(&lines), vec![Allergen::Milk, Allergen::Gluten]);
    }

    #[test]
    fn test_recipe_delete_cascades_and_ingredient_delete_is_restricted() {
        let conn = setup();
        let flour = ingredient(&conn, "Flour", AllergenFlags::default());
        let recipe = recipe(&conn);
        let item = RecipeItem::create(
            &conn,
            &RecipeItemCreate {
                recipe_id: recipe.id,
                ingredient_id: flour.id,
                amount_g: Some(Decimal::from(100)),
                amount_ml: None,
            },
        )
        .unwrap();

        assert!(Ingredient::delete(&conn, flour.id).is_err());
        assert_eq!(Ingredient::get_usage_count(&conn, flour.id).unwrap(), 1);

        assert!(Recipe::delete(&conn, recipe.id).unwrap());
        assert!(RecipeItem::get_by_id(&conn, item.id).unwrap().is_none());
        assert!(Ingredient::delete(&conn, flour.id).unwrap());
    }
}
