//! Database module
//!
//! Handles SQLite connection, migrations and decimal column mapping.

pub mod connection;
pub mod decimal;
pub mod migrations;

pub use connection::{Database, DbError, DbResult};
