//! Nutrition label PDF
//!
//! Renders one recipe's nutrition summary onto a single A6 page.
//!
//! Recipe titles and ingredient names are often Korean, which the PDF base-14
//! fonts cannot show. A TrueType font is embedded when one is configured or
//! found on the system; otherwise the label falls back to Helvetica and
//! characters outside its range print as `?`.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use printpdf::*;
use serde::Serialize;

use crate::calc::{compute_nutrition, NutrientFacts, NutritionSummary};
use crate::db::Database;
use crate::models::{recipe_allergens, Allergen, Recipe};
use crate::tools::calculations::load_snapshot;

// ============================================================================
// Layout
// ============================================================================

const PAGE_WIDTH: f32 = 105.0;
const PAGE_HEIGHT: f32 = 148.0;
const MARGIN: f32 = 8.0;

const COLOR_BLACK: (u8, u8, u8) = (0, 0, 0);
const COLOR_GRAY: (u8, u8, u8) = (110, 110, 110);
const COLOR_RULE: (u8, u8, u8) = (160, 160, 160);
const COLOR_WARNING: (u8, u8, u8) = (192, 0, 0);

/// Probed in order when no font is configured. Hangul-capable faces first.
pub const FONT_CANDIDATES: [&str; 8] = [
    "/usr/share/fonts/truetype/nanum/NanumGothic.ttf",
    "/usr/share/fonts/truetype/unfonts-core/UnDotum.ttf",
    "/usr/share/fonts/truetype/baekmuk/gulim.ttf",
    "C:/Windows/Fonts/malgun.ttf",
    "/System/Library/Fonts/Supplemental/AppleGothic.ttf",
    "/Library/Fonts/AppleGothic.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
];

const BUILTIN_FONT_NAME: &str = "Helvetica";

#[derive(Debug, Serialize)]
pub struct GenerateLabelResponse {
    pub success: bool,
    pub file_path: String,
    pub recipe_id: i64,
    pub title: String,
    pub servings: u32,
    /// Embedded font file, or "Helvetica" for the built-in fallback
    pub font: String,
    pub message: String,
}

/// First usable font: the configured path if it exists, then the candidates
pub fn select_font_path(configured: Option<&Path>, candidates: &[&Path]) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        tracing::warn!("Label font {} not found, searching system fonts", path.display());
    }

    candidates.iter().find(|p| p.is_file()).map(|p| p.to_path_buf())
}

/// Font for labels given the configured override, searching [`FONT_CANDIDATES`]
pub fn resolve_label_font(configured: Option<&Path>) -> Option<PathBuf> {
    let candidates: Vec<&Path> = FONT_CANDIDATES.iter().map(Path::new).collect();
    let font = select_font_path(configured, &candidates);
    match &font {
        Some(path) => tracing::info!("Label font: {}", path.display()),
        None => tracing::info!("No TrueType label font found, labels use {}", BUILTIN_FONT_NAME),
    }
    font
}

/// Regular and bold faces plus whether they cover Unicode
struct LabelFonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    unicode: bool,
    name: String,
}

impl LabelFonts {
    fn load(doc: &PdfDocumentReference, font_path: Option<&Path>) -> Result<Self, String> {
        if let Some(path) = font_path {
            let loaded = File::open(path)
                .map_err(|e| e.to_string())
                .and_then(|f| doc.add_external_font(BufReader::new(f)).map_err(|e| e.to_string()));
            match loaded {
                Ok(font) => {
                    return Ok(Self {
                        regular: font.clone(),
                        bold: font,
                        unicode: true,
                        name: path.display().to_string(),
                    })
                }
                Err(e) => tracing::warn!("Could not embed {}: {}", path.display(), e),
            }
        }

        Ok(Self {
            regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(|e| e.to_string())?,
            bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(|e| e.to_string())?,
            unicode: false,
            name: BUILTIN_FONT_NAME.to_string(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn draw(&self, layer: &PdfLayerReference, text: &str, bold: bool, x: f32, y: f32, size: f32, color: (u8, u8, u8)) {
        let font = if bold { &self.bold } else { &self.regular };
        layer.set_fill_color(rgb(color));
        layer.use_text(printable(text, self.unicode), size, Mm(x), Mm(y), font);
    }
}

/// Text as the font can show it. Built-in fonts only cover Latin-1.
fn printable(text: &str, unicode: bool) -> Cow<'_, str> {
    if unicode || text.chars().all(|c| (c as u32) <= 0xFF) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(
            text.chars()
                .map(|c| if (c as u32) <= 0xFF { c } else { '?' })
                .collect(),
        )
    }
}

fn rgb(color: (u8, u8, u8)) -> Color {
    Color::Rgb(Rgb::new(
        color.0 as f32 / 255.0,
        color.1 as f32 / 255.0,
        color.2 as f32 / 255.0,
        None,
    ))
}

fn add_rule(layer: &PdfLayerReference, y: f32, width: f32) {
    layer.set_outline_color(rgb(COLOR_RULE));
    layer.set_outline_thickness(width);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(MARGIN), Mm(y)), false),
            (Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(y)), false),
        ],
        is_closed: false,
    });
}

/// Nutrient rows as (label, unit, value)
fn nutrient_rows(facts: &NutrientFacts) -> [(&'static str, &'static str, f64); 6] {
    [
        ("Calories", "kcal", facts.kcal),
        ("Carbohydrate", "g", facts.carbs),
        ("Protein", "g", facts.protein),
        ("Fat", "g", facts.fat),
        ("Sugars", "g", facts.sugar),
        ("Sodium", "mg", facts.sodium),
    ]
}

fn allergen_line(allergens: &[Allergen]) -> String {
    if allergens.is_empty() {
        "Allergens: none declared".to_string()
    } else {
        let labels: Vec<&str> = allergens.iter().map(|a| a.label()).collect();
        format!("Contains: {}", labels.join(", "))
    }
}

/// Draw the label and write it to `output_path`; returns the font used
pub fn render_label(
    recipe: &Recipe,
    nutrition: &NutritionSummary,
    allergens: &[Allergen],
    output_path: &Path,
    font_path: Option<&Path>,
) -> Result<String, String> {
    let (doc, page, layer) = PdfDocument::new(
        format!("{} - Nutrition Facts", recipe.title),
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Layer 1",
    );

    let fonts = LabelFonts::load(&doc, font_path)?;
    let layer = doc.get_page(page).get_layer(layer);

    let mut y = PAGE_HEIGHT - 14.0;
    fonts.draw(&layer, &recipe.title, true, MARGIN, y, 15.0, COLOR_BLACK);
    y -= 6.0;
    if let Some(category) = recipe.category {
        fonts.draw(&layer, category.label(), false, MARGIN, y, 9.0, COLOR_GRAY);
        y -= 5.0;
    }
    fonts.draw(&layer, "Nutrition Facts", true, MARGIN, y, 11.0, COLOR_BLACK);
    y -= 3.0;
    add_rule(&layer, y, 1.2);
    y -= 6.0;

    fonts.draw(
        &layer,
        &format!("{} servings of {:.1} g", nutrition.servings, nutrition.piece_weight_g),
        false,
        MARGIN,
        y,
        9.0,
        COLOR_BLACK,
    );
    y -= 5.0;
    fonts.draw(
        &layer,
        &format!("Batch {:.1} g after {:.0}% yield", nutrition.total_weight_g, nutrition.yield_rate),
        false,
        MARGIN,
        y,
        9.0,
        COLOR_GRAY,
    );
    y -= 4.0;
    add_rule(&layer, y, 0.5);
    y -= 6.0;

    let col_serving = 52.0;
    let col_total = 74.0;
    fonts.draw(&layer, "Per serving", true, col_serving, y, 8.0, COLOR_BLACK);
    fonts.draw(&layer, "Total", true, col_total, y, 8.0, COLOR_BLACK);
    y -= 6.0;

    let per_serving = nutrient_rows(&nutrition.per_serving);
    let totals = nutrient_rows(&nutrition.totals);
    for ((label, unit, serving), (_, _, total)) in per_serving.iter().zip(totals.iter()) {
        fonts.draw(&layer, label, false, MARGIN, y, 9.0, COLOR_BLACK);
        fonts.draw(&layer, &format!("{:.1} {}", serving, unit), false, col_serving, y, 9.0, COLOR_BLACK);
        fonts.draw(&layer, &format!("{:.1} {}", total, unit), false, col_total, y, 9.0, COLOR_BLACK);
        y -= 5.5;
    }

    add_rule(&layer, y + 2.0, 0.5);
    y -= 4.0;
    fonts.draw(&layer, &allergen_line(allergens), true, MARGIN, y, 9.0, COLOR_BLACK);

    if !nutrition.unresolved_items.is_empty() {
        y -= 6.0;
        fonts.draw(&layer, "Not counted (no density for volume):", false, MARGIN, y, 7.5, COLOR_WARNING);
        for name in &nutrition.unresolved_items {
            y -= 4.0;
            fonts.draw(&layer, &format!("- {}", name), false, MARGIN + 2.0, y, 7.5, COLOR_WARNING);
        }
    }

    let generated = chrono::Local::now().format("%Y-%m-%d").to_string();
    fonts.draw(&layer, &format!("Generated {}", generated), false, MARGIN, 6.0, 6.5, COLOR_GRAY);

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    let file = File::create(output_path).map_err(|e| e.to_string())?;
    let mut writer = BufWriter::new(file);
    doc.save(&mut writer).map_err(|e| e.to_string())?;

    Ok(fonts.name)
}

/// Generate a nutrition label PDF for a recipe
pub fn generate_label_pdf(
    db: &Database,
    recipe_id: i64,
    output_path: &str,
    font_path: Option<&Path>,
) -> Result<GenerateLabelResponse, String> {
    let (recipe, lines) = load_snapshot(db, recipe_id)?;

    let nutrition = compute_nutrition(&recipe, &lines);
    let allergens = recipe_allergens(&lines);

    let font = render_label(&recipe, &nutrition, &allergens, Path::new(output_path), font_path)?;

    tracing::info!("Label for recipe {} written to {} ({})", recipe_id, output_path, font);

    Ok(GenerateLabelResponse {
        success: true,
        file_path: output_path.to_string(),
        recipe_id,
        title: recipe.title.clone(),
        servings: nutrition.servings,
        font,
        message: format!("Label generated for '{}' ({} servings)", recipe.title, nutrition.servings),
    })
}
