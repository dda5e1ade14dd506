//! Bulk-load ingredients from a CSV or spreadsheet file
//!
//! Usage: import_ingredients <file.csv|file.xlsx> [--update]

use bakecalc::config::Config;
use bakecalc::db::{migrations, Database};
use bakecalc::import::import_file;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("bakecalc=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let mut input_path = None;
    let mut update_existing = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--update" => update_existing = true,
            _ if input_path.is_none() => input_path = Some(arg),
            _ => return Err(format!("unexpected argument: {}", arg).into()),
        }
    }
    let Some(input_path) = input_path else {
        eprintln!("Usage: import_ingredients <file.csv|file.xlsx> [--update]");
        std::process::exit(2);
    };

    let config = Config::from_env();
    println!("Database path: {}", config.database_path.display());
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let database = Database::new(&config.database_path)?;
    database.with_conn(|conn| migrations::run_migrations(conn))?;

    let report = import_file(&database, &input_path, update_existing)?;

    println!(
        "Created {}, updated {}, skipped {}",
        report.created, report.updated, report.skipped
    );
    for error in &report.errors {
        println!("  {}", error);
    }

    Ok(())
}
