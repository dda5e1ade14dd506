//! BakeCalc Library
//!
//! Recipe-to-label nutrition and cost calculation for small bakeries.

pub mod build_info;
pub mod calc;
pub mod config;
pub mod db;
pub mod import;
pub mod mcp;
pub mod models;
pub mod presets;
pub mod tools;
