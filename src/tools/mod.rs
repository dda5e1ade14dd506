//! BakeCalc Tools module
//!
//! MCP tool implementations. Each tool takes the database handle and returns
//! a serializable response or a human-readable error.

pub mod calculations;
pub mod imports;
pub mod ingredients;
pub mod labels;
pub mod recipes;
pub mod status;
