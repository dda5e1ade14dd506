//! Yield presets by recipe category
//!
//! Typical post-bake yield for each category, used to pre-fill a recipe's
//! yield rate when nothing better is known.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::Category;

/// A category and its default yield rate
#[derive(Debug, Clone, Serialize)]
pub struct YieldPreset {
    pub category: Category,
    pub label: &'static str,
    pub yield_rate: Decimal,
}

/// Default yield rate (percent) for a category
pub fn yield_preset(category: Category) -> Option<Decimal> {
    let percent: i64 = match category {
        Category::Sponge => 94,
        Category::Chiffon => 95,
        Category::Pound => 92,
        Category::Brownie => 90,
        Category::Muffin => 93,
        Category::BakedCheese => 93,
        Category::NobakeCheese => 99,
        Category::Tart => 90,
        Category::TartShell => 88,
        Category::Cookie => 85,
        Category::Macaron => 90,
        Category::Choux => 78,
        Category::Croissant => 91,
        Category::Brioche => 93,
        Category::Shokupan => 92,
        Category::Baguette => 89,
        Category::Cream => 99,
        Category::Custard => 98,
        Category::Ganache => 99,
    };
    Some(Decimal::from(percent))
}

/// Every category with its preset
pub fn all_presets() -> Vec<YieldPreset> {
    Category::ALL
        .iter()
        .filter_map(|&category| {
            yield_preset(category).map(|yield_rate| YieldPreset {
                category,
                label: category.label(),
                yield_rate,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_has_a_preset() {
        let presets = all_presets();
        assert_eq!(presets.len(), Category::ALL.len());
        assert!(presets
            .iter()
            .all(|p| p.yield_rate > Decimal::ZERO && p.yield_rate <= Decimal::ONE_HUNDRED));
    }

    #[test]
    fn test_known_presets() {
        assert_eq!(yield_preset(Category::Cookie), Some(Decimal::from(85)));
        assert_eq!(yield_preset(Category::Choux), Some(Decimal::from(78)));
    }
}
