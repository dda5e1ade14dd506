//! Ingredient CSV/workbook parsing and bulk creation

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use calamine::{open_workbook_auto, Reader};
use csv::{ReaderBuilder, StringRecord, Writer};
use encoding_rs::{EUC_KR, WINDOWS_1252};
use rusqlite::Connection;
use rust_decimal::Decimal;

use super::{ImportError, ImportReport};
use crate::db::{Database, DbResult};
use crate::models::{AllergenFlags, Ingredient, IngredientCreate, IngredientUpdate};

/// Columns every file must carry
pub const REQUIRED_HEADERS: [&str; 8] = [
    "brand",
    "name",
    "kcal_per100g",
    "carbs_per100g",
    "protein_per100g",
    "fat_per100g",
    "sugar_per100g",
    "sodium_per100g",
];

/// Columns read when present
pub const OPTIONAL_HEADERS: [&str; 9] = [
    "unit",
    "density_g_per_ml",
    "price_per_100g",
    "contains_milk",
    "contains_egg",
    "contains_gluten",
    "contains_nuts",
    "contains_soy",
    "contains_shellfish",
];

const TRUE_VALUES: [&str; 7] = ["true", "1", "yes", "y", "o", "x", "예"];

/// Rows that parsed cleanly plus per-row error messages
#[derive(Debug, Default)]
pub struct ParsedRows {
    pub rows: Vec<IngredientCreate>,
    pub errors: Vec<String>,
}

/// Header name -> column index
struct Columns(HashMap<String, usize>);

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, ImportError> {
        let map: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim_start_matches('\u{feff}').trim().to_lowercase(), i))
            .collect();

        let missing: Vec<String> = REQUIRED_HEADERS
            .iter()
            .filter(|h| !map.contains_key(**h))
            .map(|h| h.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ImportError::MissingHeaders(missing));
        }

        Ok(Self(map))
    }

    fn get<'r>(&self, record: &'r StringRecord, header: &str) -> &'r str {
        self.0
            .get(header)
            .and_then(|&i| record.get(i))
            .unwrap_or("")
    }
}

/// Parse a numeric cell. Blank is zero; thousands separators and spaces are
/// ignored; negatives are rejected.
fn clean_decimal(value: &str, field: &str) -> Result<Decimal, String> {
    let cleaned: String = value
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return Ok(Decimal::ZERO);
    }

    let parsed = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| format!("invalid value for {}: {}", field, value.trim()))?;

    if parsed.is_sign_negative() && !parsed.is_zero() {
        return Err(format!("{} cannot be negative", field));
    }
    Ok(parsed)
}

fn clean_bool(value: &str) -> bool {
    let lowered = value.trim().to_lowercase();
    TRUE_VALUES.contains(&lowered.as_str())
}

fn parse_row(columns: &Columns, record: &StringRecord) -> Result<IngredientCreate, String> {
    let name = columns.get(record, "name").trim();
    if name.is_empty() {
        return Err("name is required".to_string());
    }

    let unit = columns.get(record, "unit").trim();
    let density = clean_decimal(columns.get(record, "density_g_per_ml"), "density_g_per_ml")?;
    let flag = |header: &str| clean_bool(columns.get(record, header));

    Ok(IngredientCreate {
        brand: columns.get(record, "brand").trim().to_string(),
        name: name.to_string(),
        unit: if unit.is_empty() { "g".to_string() } else { unit.to_string() },
        kcal_per100g: clean_decimal(columns.get(record, "kcal_per100g"), "kcal_per100g")?,
        carbs_per100g: clean_decimal(columns.get(record, "carbs_per100g"), "carbs_per100g")?,
        protein_per100g: clean_decimal(columns.get(record, "protein_per100g"), "protein_per100g")?,
        fat_per100g: clean_decimal(columns.get(record, "fat_per100g"), "fat_per100g")?,
        sugar_per100g: clean_decimal(columns.get(record, "sugar_per100g"), "sugar_per100g")?,
        sodium_per100g: clean_decimal(columns.get(record, "sodium_per100g"), "sodium_per100g")?,
        density_g_per_ml: Some(density).filter(|d| !d.is_zero()),
        price_per_100g: clean_decimal(columns.get(record, "price_per_100g"), "price_per_100g")?,
        allergens: AllergenFlags {
            contains_milk: flag("contains_milk"),
            contains_egg: flag("contains_egg"),
            contains_gluten: flag("contains_gluten"),
            contains_nuts: flag("contains_nuts"),
            contains_soy: flag("contains_soy"),
            contains_shellfish: flag("contains_shellfish"),
        },
    })
}

/// Spreadsheet extensions read through calamine rather than the CSV reader
const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Decode file bytes: UTF-8, then CP949 (Korean Excel exports), then Latin-1
fn decode(bytes: Vec<u8>) -> String {
    let bytes = match String::from_utf8(bytes) {
        Ok(text) => return text,
        Err(e) => e.into_bytes(),
    };

    // EUC_KR in encoding_rs is the CP949 superset
    let (text, _, malformed) = EUC_KR.decode(&bytes);
    if !malformed {
        tracing::debug!("CSV is not UTF-8, decoded as CP949");
        return text.into_owned();
    }

    tracing::debug!("CSV is neither UTF-8 nor CP949, decoding as Latin-1");
    WINDOWS_1252.decode_without_bom_handling(&bytes).0.into_owned()
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| WORKBOOK_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// First sheet of a workbook, re-encoded as CSV so both formats share one
/// row parser and one line numbering
fn workbook_to_csv(path: &Path) -> Result<Vec<u8>, ImportError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Err(ImportError::Empty),
    };

    let mut writer = Writer::from_writer(Vec::new());
    for row in range.rows() {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    writer.into_inner().map_err(|e| ImportError::Io(e.into_error()))
}

/// Parse ingredient rows from CSV.
///
/// Missing required headers or an empty file abort the parse; bad rows are
/// reported by file line number and skipped.
pub fn parse_ingredients<R: Read>(mut reader: R) -> Result<ParsedRows, ImportError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let text = decode(bytes);

    let mut csv_reader = ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = csv_reader.headers()?.clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ImportError::Empty);
    }
    let columns = Columns::from_headers(&headers)?;

    let mut parsed = ParsedRows::default();
    let mut data_rows = 0;
    for result in csv_reader.records() {
        let record = result?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        data_rows += 1;

        let line = record.position().map(|p| p.line()).unwrap_or(0);
        match parse_row(&columns, &record) {
            Ok(row) => parsed.rows.push(row),
            Err(msg) => parsed.errors.push(format!("row {}: {}", line, msg)),
        }
    }

    if data_rows == 0 {
        return Err(ImportError::Empty);
    }

    Ok(parsed)
}

fn upsert(conn: &Connection, data: &IngredientCreate, update_existing: bool, report: &mut ImportReport) -> DbResult<()> {
    match Ingredient::find_by_identity(conn, &data.brand, &data.name)? {
        Some(existing) if update_existing => {
            Ingredient::update(conn, existing.id, &IngredientUpdate::replace_with(data))?;
            report.updated += 1;
        }
        Some(_) => report.skipped += 1,
        None => {
            Ingredient::create(conn, data)?;
            report.created += 1;
        }
    }
    Ok(())
}

/// Create (or update) parsed ingredients in a single transaction.
///
/// Rows matching an existing brand + name are updated when `update_existing`
/// is set and skipped otherwise.
pub fn bulk_create_ingredients(
    db: &Database,
    rows: &[IngredientCreate],
    update_existing: bool,
) -> Result<ImportReport, ImportError> {
    let report = db.with_conn_mut(|conn| {
        let tx = conn.transaction()?;
        let mut report = ImportReport::default();

        for data in rows {
            if let Err(e) = upsert(&tx, data, update_existing, &mut report) {
                report
                    .errors
                    .push(format!("{}: {}", crate::models::display_name(&data.brand, &data.name), e));
            }
        }

        tx.commit()?;
        Ok(report)
    })?;

    tracing::info!(
        "Imported ingredients: {} created, {} updated, {} skipped, {} errors",
        report.created,
        report.updated,
        report.skipped,
        report.errors.len()
    );

    Ok(report)
}

/// Parse and import in one step; row parse errors come first in the report
pub fn import_csv<R: Read>(db: &Database, reader: R, update_existing: bool) -> Result<ImportReport, ImportError> {
    let parsed = parse_ingredients(reader)?;
    let mut report = bulk_create_ingredients(db, &parsed.rows, update_existing)?;

    let mut errors = parsed.errors;
    errors.append(&mut report.errors);
    report.errors = errors;

    Ok(report)
}

/// Import from a CSV or spreadsheet file on disk, chosen by extension
pub fn import_file<P: AsRef<Path>>(db: &Database, path: P, update_existing: bool) -> Result<ImportReport, ImportError> {
    let path = path.as_ref();
    tracing::info!("Importing ingredients from {}", path.display());

    if is_workbook(path) {
        let csv = workbook_to_csv(path)?;
        import_csv(db, csv.as_slice(), update_existing)
    } else {
        import_csv(db, std::fs::File::open(path)?, update_existing)
    }
}
