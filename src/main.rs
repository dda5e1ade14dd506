//! BakeCalc
//!
//! An MCP server that turns bakery recipes into nutrition labels and cost sheets.

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing_subscriber::EnvFilter;

use bakecalc::build_info;
use bakecalc::config::Config;
use bakecalc::db::{migrations, Database};
use bakecalc::mcp::BakecalcService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the MCP stream, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("bakecalc=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    build_info::print_startup_banner();
    eprintln!("Starting MCP server on stdio...");

    let config = Config::from_env();
    eprintln!("Database path: {}", config.database_path.display());
    eprintln!("Default margin: {}%", config.default_margin);

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let database = Database::new(&config.database_path)?;

    database.with_conn(|conn| {
        migrations::run_migrations(conn)?;
        let version = migrations::get_schema_version(conn)?;
        tracing::info!("Database schema version: {}", version);
        Ok(())
    })?;

    let service = BakecalcService::new(config, database);

    let server = service.serve((stdin(), stdout())).await?;
    server.waiting().await?;

    Ok(())
}
