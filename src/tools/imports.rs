//! Import MCP Tools

use crate::db::Database;
use crate::import::{import_file, ImportReport};

/// Import ingredients from a CSV or spreadsheet file on the server's filesystem
pub fn import_ingredients_csv(db: &Database, path: &str, update_existing: bool) -> Result<ImportReport, String> {
    let path = path.trim();
    if path.is_empty() {
        return Err("path cannot be empty".to_string());
    }

    import_file(db, path, update_existing).map_err(|e| format!("Import failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use std::io::Write;

    #[test]
    fn test_import_reports_row_errors() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| run_migrations(conn)).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "brand,name,kcal_per100g,carbs_per100g,protein_per100g,fat_per100g,sugar_per100g,sodium_per100g").unwrap();
        writeln!(file, "Acme,Flour,364,76,10,1,0.3,2").unwrap();
        writeln!(file, "Acme,Oil,n/a,0,0,100,0,0").unwrap();
        file.flush().unwrap();

        let report = import_ingredients_csv(&db, file.path().to_str().unwrap(), false).unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("row 3:"));
    }

    #[test]
    fn test_missing_file() {
        let db = Database::in_memory().unwrap();
        assert!(import_ingredients_csv(&db, "/nonexistent/ingredients.csv", false).is_err());
        assert!(import_ingredients_csv(&db, " ", false).is_err());
    }
}
