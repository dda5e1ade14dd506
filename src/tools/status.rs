//! BakeCalc Status Tool
//!
//! Provides runtime status information about the service.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;

/// Usage notes returned alongside the status
pub const USAGE_INSTRUCTIONS: &str = r#"
# BakeCalc Usage

1. Add ingredients with nutrition and price per 100 g (or import a CSV).
   Give a density (g/mL) for anything you measure by volume.
2. Create a recipe. Pick a category to pre-fill its yield rate, or record
   pre/post-bake weights and the yield rate is derived from them.
3. Add recipe items by grams (amount_g) or millilitres (amount_ml).
4. Run calculate_nutrition / calculate_cost. Items listed in
   unresolved_items were measured by volume without a density and count
   as 0 g.
5. Set piece_weight_g on the recipe to size servings by weight instead of
   the declared count.
"#;

/// Runtime status of the service
#[derive(Debug, Clone, Serialize)]
pub struct BakecalcStatus {
    /// Build information
    pub name: &'static str,
    pub version: &'static str,
    pub build_timestamp: &'static str,

    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub schema_version: Option<i32>,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,

    pub instructions: &'static str,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
}

impl StatusTracker {
    /// Create a new status tracker
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
        }
    }

    /// Get the current status
    pub fn get_status(&self, schema_version: Option<i32>) -> BakecalcStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        BakecalcStatus {
            name: build_info.name,
            version: build_info.version,
            build_timestamp: build_info.build_timestamp,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            schema_version,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
            instructions: USAGE_INSTRUCTIONS,
        }
    }
}
