//! Quantity resolution
//!
//! Turns a line item's mass and/or volume amount into grams.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::RecipeLine;

/// Where a resolved mass came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantitySource {
    /// Mass amount given directly
    Mass,
    /// Volume converted through the ingredient's density
    Volume,
    /// Volume given but the ingredient has no density; resolved to zero
    Unresolved,
    /// Neither amount given
    Empty,
}

/// Effective mass of a line item in grams, full precision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedMass {
    pub grams: Decimal,
    pub source: QuantitySource,
}

impl ResolvedMass {
    pub fn is_unresolved(&self) -> bool {
        self.source == QuantitySource::Unresolved
    }
}

/// Resolve an amount to grams.
///
/// A non-zero mass wins. Otherwise a volume is converted through the
/// density when one is known. Anything else resolves to zero grams; this
/// never fails.
pub fn resolve_mass(
    amount_g: Option<Decimal>,
    amount_ml: Option<Decimal>,
    density_g_per_ml: Option<Decimal>,
) -> ResolvedMass {
    if let Some(grams) = amount_g.filter(|g| !g.is_zero()) {
        return ResolvedMass { grams, source: QuantitySource::Mass };
    }

    match (amount_ml.filter(|ml| !ml.is_zero()), density_g_per_ml) {
        (Some(ml), Some(density)) => ResolvedMass {
            grams: ml.saturating_mul(density),
            source: QuantitySource::Volume,
        },
        (Some(_), None) => ResolvedMass {
            grams: Decimal::ZERO,
            source: QuantitySource::Unresolved,
        },
        (None, _) => ResolvedMass {
            grams: Decimal::ZERO,
            source: QuantitySource::Empty,
        },
    }
}

/// Resolve a recipe line against its ingredient
pub fn resolve_line(line: &RecipeLine) -> ResolvedMass {
    let resolved = resolve_mass(
        line.item.amount_g,
        line.item.amount_ml,
        line.ingredient.density_g_per_ml,
    );

    if resolved.is_unresolved() {
        tracing::warn!(
            "No density for '{}': {} ml counted as 0 g",
            line.ingredient.display_name(),
            line.item.amount_ml.unwrap_or_default()
        );
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(v: &str) -> Decimal {
        v.parse().unwrap()
    }

    #[test]
    fn test_mass_wins_over_volume() {
        let r = resolve_mass(Some(d("150")), Some(d("100")), Some(d("1.2")));
        assert_eq!(r.grams, d("150"));
        assert_eq!(r.source, QuantitySource::Mass);

        let r = resolve_mass(Some(d("150")), Some(d("100")), None);
        assert_eq!(r.grams, d("150"));
    }

    #[test]
    fn test_volume_through_density() {
        let r = resolve_mass(None, Some(d("100")), Some(d("1.2")));
        assert_eq!(r.grams, d("120"));
        assert_eq!(r.source, QuantitySource::Volume);

        // zero mass counts as absent
        let r = resolve_mass(Some(Decimal::ZERO), Some(d("100")), Some(d("1.03")));
        assert_eq!(r.grams, d("103"));
    }

    #[test]
    fn test_volume_without_density_is_zero() {
        let r = resolve_mass(None, Some(d("100")), None);
        assert_eq!(r.grams, Decimal::ZERO);
        assert!(r.is_unresolved());
    }

    #[test]
    fn test_nothing_given() {
        let r = resolve_mass(None, None, Some(d("1.2")));
        assert_eq!(r.grams, Decimal::ZERO);
        assert_eq!(r.source, QuantitySource::Empty);

        let r = resolve_mass(Some(Decimal::ZERO), Some(Decimal::ZERO), None);
        assert_eq!(r.source, QuantitySource::Empty);
    }

    #[test]
    fn test_no_rounding() {
        let r = resolve_mass(None, Some(d("33.333")), Some(d("1.111")));
        assert_eq!(r.grams, d("37.032963"));
    }
}
