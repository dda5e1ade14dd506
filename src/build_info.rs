//! Package metadata baked in at compile time
//!
//! `build.rs` sets `BAKECALC_BUILD_TIMESTAMP`; builds without it report
//! "unknown".

use serde::Serialize;

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// UTC, `%Y-%m-%dT%H:%M:%SZ`
pub const BUILD_TIMESTAMP: &str = match option_env!("BAKECALC_BUILD_TIMESTAMP") {
    Some(s) => s,
    None => "unknown",
};

/// What the status tool reports about this binary
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub build_timestamp: &'static str,
    pub description: &'static str,
}

impl BuildInfo {
    pub const fn current() -> Self {
        Self {
            name: NAME,
            version: VERSION,
            build_timestamp: BUILD_TIMESTAMP,
            description: DESCRIPTION,
        }
    }

    /// Lines of the stderr banner shown when the server starts
    pub fn banner(&self) -> Vec<String> {
        let rule = "=".repeat(47);
        vec![
            rule.clone(),
            format!("  {} {}", self.name, self.version),
            format!("  {}", self.description),
            format!("  Built {}", self.build_timestamp),
            rule,
        ]
    }
}

/// Write the startup banner to stderr; stdout belongs to the MCP transport
pub fn print_startup_banner() {
    for line in BuildInfo::current().banner() {
        eprintln!("{}", line);
    }
}
