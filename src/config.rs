//! Runtime configuration
//!
//! Everything comes from the environment; there is no config file.

use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::calc::DEFAULT_MARGIN_PERCENT;

/// Environment variable overriding the SQLite file location
pub const DATABASE_PATH_VAR: &str = "BAKECALC_DATABASE_PATH";

/// Environment variable overriding the default pricing margin
pub const DEFAULT_MARGIN_VAR: &str = "BAKECALC_DEFAULT_MARGIN";

/// Environment variable naming a TrueType font for PDF labels
pub const LABEL_FONT_VAR: &str = "BAKECALC_LABEL_FONT";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    /// Margin percent applied when a cost request names none
    pub default_margin: Decimal,
    /// Font embedded in labels; system fonts are searched when unset
    pub label_font: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_path: std::env::var(DATABASE_PATH_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_database_path()),
            default_margin: parse_margin(std::env::var(DEFAULT_MARGIN_VAR).ok().as_deref()),
            label_font: parse_path(std::env::var(LABEL_FONT_VAR).ok().as_deref()),
        }
    }
}

/// `data/bakecalc.db` next to the project root when run from `target/`
fn default_database_path() -> PathBuf {
    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    // Binaries live in target/{debug,release}; the project root is two up
    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(grandparent) = path.parent().and_then(|p| p.parent()) {
            path = grandparent.to_path_buf();
        }
    }

    path.push("data");
    path.push("bakecalc.db");
    path
}

fn parse_margin(raw: Option<&str>) -> Decimal {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => DEFAULT_MARGIN_PERCENT,
        Some(s) => Decimal::from_str(s).unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}", DEFAULT_MARGIN_VAR, s);
            DEFAULT_MARGIN_PERCENT
        }),
    }
}

fn parse_path(raw: Option<&str>) -> Option<PathBuf> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_margin() {
        assert_eq!(parse_margin(None), DEFAULT_MARGIN_PERCENT);
        assert_eq!(parse_margin(Some("  ")), DEFAULT_MARGIN_PERCENT);
        assert_eq!(parse_margin(Some("200")), Decimal::from(200));
        assert_eq!(parse_margin(Some("abc")), DEFAULT_MARGIN_PERCENT);
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(parse_path(None), None);
        assert_eq!(parse_path(Some(" ")), None);
        assert_eq!(
            parse_path(Some(" /fonts/NanumGothic.ttf ")),
            Some(PathBuf::from("/fonts/NanumGothic.ttf"))
        );
    }

    #[test]
    fn test_default_database_path_file_name() {
        let path = default_database_path();
        assert!(path.ends_with("data/bakecalc.db"));
    }
}
