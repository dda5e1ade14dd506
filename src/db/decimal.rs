//! Decimal column helpers
//!
//! Quantities, nutrient densities and prices are stored as TEXT so the exact
//! decimal value survives the round trip through SQLite.

use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::Row;
use rust_decimal::Decimal;

fn parse_column(row: &Row, column: &str, raw: &str) -> rusqlite::Result<Decimal> {
    Decimal::from_str(raw.trim()).map_err(|e| {
        let idx = row.as_ref().column_index(column).unwrap_or(0);
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
    })
}

/// Read a required decimal column
pub fn get_decimal(row: &Row, column: &str) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(column)?;
    parse_column(row, column, &raw)
}

/// Read a nullable decimal column
pub fn get_opt_decimal(row: &Row, column: &str) -> rusqlite::Result<Option<Decimal>> {
    let raw: Option<String> = row.get(column)?;
    match raw {
        Some(raw) => parse_column(row, column, &raw).map(Some),
        None => Ok(None),
    }
}

/// Text form written to decimal columns
pub fn to_db(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Text form for nullable decimal columns
pub fn opt_to_db(value: Option<Decimal>) -> Option<String> {
    value.map(to_db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_decimal_round_trip_through_text_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (a TEXT NOT NULL, b TEXT)").unwrap();
        conn.execute(
            "INSERT INTO t (a, b) VALUES (?1, ?2)",
            rusqlite::params![to_db(Decimal::new(1250, 2)), opt_to_db(None)],
        )
        .unwrap();

        let (a, b) = conn
            .query_row("SELECT a, b FROM t", [], |row| {
                Ok((get_decimal(row, "a")?, get_opt_decimal(row, "b")?))
            })
            .unwrap();

        assert_eq!(a, Decimal::new(125, 1));
        assert_eq!(b, None);
    }

    #[test]
    fn test_malformed_decimal_is_conversion_error() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (a TEXT NOT NULL); INSERT INTO t VALUES ('abc');")
            .unwrap();

        let result = conn.query_row("SELECT a FROM t", [], |row| get_decimal(row, "a"));
        assert!(matches!(
            result,
            Err(rusqlite::Error::FromSqlConversionFailure(_, Type::Text, _))
        ));
    }
}
