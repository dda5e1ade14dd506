//! Bulk ingredient import
//!
//! Reads ingredient profiles from CSV or spreadsheet exports and writes them
//! in one transaction.

mod ingredients;

use serde::Serialize;
use thiserror::Error;

use crate::db::DbError;

pub use ingredients::{
    bulk_create_ingredients, import_csv, import_file, parse_ingredients, ParsedRows,
    OPTIONAL_HEADERS, REQUIRED_HEADERS,
};

/// Errors that abort a whole import
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingHeaders(Vec<String>),

    #[error("File has no data rows")]
    Empty,

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

/// Outcome of an import
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    /// Row-level problems; the rest of the file is still imported
    pub errors: Vec<String>,
}
