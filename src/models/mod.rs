//! Data models
//!
//! Rust structs representing database entities.

mod ingredient;
mod nutrients;
mod recipe;
mod recipe_item;

pub use ingredient::{
    display_name, Allergen, AllergenFlags, Ingredient, IngredientCreate, IngredientUpdate,
};
pub use nutrients::Nutrients;
pub use recipe::{derive_yield_rate, Category, Recipe, RecipeCreate, RecipeUpdate, UnknownCategory};
pub use recipe_item::{
    recipe_allergens, RecipeItem, RecipeItemCreate, RecipeItemDetail, RecipeItemUpdate,
    RecipeLine,
};
