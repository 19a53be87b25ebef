//! Waits for the database and applies pending migration files, then exits.
//!
//! Used as a container entrypoint step before starting the server, or on its
//! own to inspect which migrations are still pending.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dbgate_common::Config;
use dbgate_migrate::{migration_status, run_migrations};

#[derive(Parser)]
#[command(name = "run-migrations", about = "Apply pending SQL migrations")]
struct Cli {
    /// Directory of *.sql migration files (overrides MIGRATIONS_DIR)
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Print applied and pending versions instead of applying
    #[arg(long)]
    status: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env().context("Invalid configuration")?;
    if let Some(dir) = cli.dir {
        config.migrate.dir = dir;
    }

    if cli.status {
        let status = migration_status(&config).await?;
        for applied in &status.applied {
            println!("applied  {}  {}", applied.applied_at.to_rfc3339(), applied.version);
        }
        for version in &status.pending {
            println!("pending  {version}");
        }
        return Ok(());
    }

    let report = run_migrations(&config).await?;
    println!(
        "Migrations complete: {} applied, {} already up to date.",
        report.applied.len(),
        report.already_applied
    );

    Ok(())
}
