//! Seeder - Loads the tourism CSV exports into SQLite
//!
//! Responsibilities:
//! - Create the schema if it does not exist
//! - Read, normalize and bulk insert the 17 source datasets
//! - Store the analyst-authored strategic insights
//! - Add the country-level grand total row on demand
//! - Record every invocation in `seed_runs`
//!
//! Usage:
//!   # Full ingestion:
//!   cargo run --bin seeder -- seed --data-dir ./data
//!
//!   # Validate source files without writing:
//!   cargo run --bin seeder -- seed --dry-run
//!
//!   # Corrective insert of the 총계 row:
//!   cargo run --bin seeder -- add-total-row

mod dataset;
mod error;
mod insights;
mod pipeline;
mod source;
mod store;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::level_filters::LevelFilter;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::dataset::{Dataset, DATASETS};
use crate::insights::INSIGHTS;
use crate::pipeline::SeedReport;
use crate::store::TotalRowOutcome;

#[derive(Parser, Debug)]
#[command(name = "seeder", about = "Seeds the tourism database from CSV exports")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest every dataset and the strategic insights
    Seed {
        /// Directory holding the CSV exports (overrides DATA_DIR)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Only ingest these tables (repeatable); defaults to every dataset
        #[arg(long = "table")]
        tables: Vec<String>,

        /// Dry run - read and normalize only, don't touch the database
        #[arg(long, default_value = "false")]
        dry_run: bool,
    },
    /// Insert the country grand total row if it is missing
    AddTotalRow,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Seed { .. } => "seed",
            Command::AddTotalRow => "add-total-row",
        }
    }
}

#[derive(Debug)]
struct Config {
    /// Only needed by the commands that open the database.
    db_url: Option<String>,
    data_dir: PathBuf,
}

impl Config {
    fn from_env() -> Self {
        Self {
            db_url: std::env::var("DB_URL").ok(),
            data_dir: PathBuf::from(
                std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            ),
        }
    }

    fn db_url(&self) -> Result<&str> {
        self.db_url.as_deref().context("DB_URL env var missing")
    }
}

/// Resolve `--table` arguments against the descriptor list, keeping
/// ingestion order.
fn select_datasets(tables: &[String]) -> Result<Vec<Dataset>> {
    if tables.is_empty() {
        return Ok(DATASETS.to_vec());
    }
    for table in tables {
        if dataset::by_table(table).is_none() {
            anyhow::bail!("Unknown table: {}", table);
        }
    }
    Ok(DATASETS
        .iter()
        .filter(|d| tables.iter().any(|t| t == d.table))
        .copied()
        .collect())
}

async fn run_seed(
    pool: &SqlitePool,
    data_dir: PathBuf,
    datasets: &[Dataset],
) -> (serde_json::Value, Result<()>) {
    let mut report = SeedReport::default();
    let result = pipeline::seed(pool, &data_dir, datasets, INSIGHTS, &mut report)
        .await
        .with_context(|| format!("Seeding from {} failed", data_dir.display()));

    if result.is_ok() {
        info!(
            datasets = report.datasets.len(),
            rows = report.total_inserted(),
            "seed complete"
        );
    }
    (json!(report), result)
}

async fn run_add_total_row(pool: &SqlitePool) -> (serde_json::Value, Result<()>) {
    match store::ensure_total_row(pool).await {
        Ok(outcome) => {
            let outcome = match outcome {
                TotalRowOutcome::Inserted => "inserted",
                TotalRowOutcome::AlreadyPresent => "already_present",
            };
            (json!({ "outcome": outcome }), Ok(()))
        }
        Err(e) => (
            json!({}),
            Err(anyhow::Error::new(e).context("Failed to add total row")),
        ),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env();

    if let Command::Seed {
        data_dir,
        tables,
        dry_run: true,
    } = &args.command
    {
        let datasets = select_datasets(tables)?;
        let data_dir = data_dir.clone().unwrap_or(config.data_dir);
        info!(data_dir = %data_dir.display(), "dry run - nothing will be written");
        let reports = pipeline::dry_run(&data_dir, &datasets)
            .await
            .context("Dry run failed")?;
        let rows: usize = reports.iter().map(|r| r.source_rows).sum();
        info!(datasets = reports.len(), rows, "all source files readable");
        return Ok(());
    }

    let pool = store::connect(config.db_url()?)
        .await
        .context("Failed to connect to database")?;

    run_and_close(pool, args.command, config.data_dir).await
}

/// Runs `command` against the database and closes the pool on every path,
/// including schema and ledger failures.
async fn run_and_close(pool: SqlitePool, command: Command, data_dir: PathBuf) -> Result<()> {
    let result = run_recorded(&pool, command, data_dir).await;
    pool.close().await;
    result
}

async fn run_recorded(pool: &SqlitePool, command: Command, default_data_dir: PathBuf) -> Result<()> {
    store::migrate(pool)
        .await
        .context("Failed to apply schema")?;

    let run_id = store::start_run(pool, command.name())
        .await
        .context("Failed to record run start")?;
    info!(%run_id, command = command.name(), "run started");

    let (detail, result) = match command {
        Command::Seed {
            data_dir, tables, ..
        } => match select_datasets(&tables) {
            Ok(datasets) => {
                run_seed(pool, data_dir.unwrap_or(default_data_dir), &datasets).await
            }
            Err(e) => (json!({}), Err(e)),
        },
        Command::AddTotalRow => run_add_total_row(pool).await,
    };

    match &result {
        Ok(()) => store::finish_run(pool, run_id, "ok", None, detail)
            .await
            .context("Failed to record run outcome")?,
        Err(e) => {
            error!(%run_id, "run failed: {:#}", e);
            let message = format!("{:#}", e);
            store::finish_run(pool, run_id, "failed", Some(&message), detail)
                .await
                .context("Failed to record run outcome")?
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory_pool;

    async fn block(pool: &SqlitePool, event: &str) {
        let ddl = format!(
            "CREATE TRIGGER block_{0} BEFORE {0} ON seed_runs \
             BEGIN SELECT RAISE(ABORT, 'ledger locked'); END;",
            event
        );
        sqlx::raw_sql(&ddl).execute(pool).await.unwrap();
    }

    // ---- CONFIG ----

    #[test]
    fn test_db_url_only_required_when_used() {
        let config = Config {
            db_url: None,
            data_dir: PathBuf::from("./data"),
        };
        let err = config.db_url().unwrap_err();
        assert!(err.to_string().contains("DB_URL"));

        let config = Config {
            db_url: Some("sqlite::memory:".to_string()),
            ..config
        };
        assert_eq!(config.db_url().unwrap(), "sqlite::memory:");
    }

    #[test]
    fn test_select_datasets() {
        assert_eq!(select_datasets(&[]).unwrap().len(), DATASETS.len());

        let picked = select_datasets(&[
            "tourist_by_country".to_string(),
            "tourist_by_continent".to_string(),
        ])
        .unwrap();
        let tables: Vec<_> = picked.iter().map(|d| d.table).collect();
        assert_eq!(tables, vec!["tourist_by_continent", "tourist_by_country"]);

        assert!(select_datasets(&["nope".to_string()]).is_err());
    }

    // ---- POOL LIFECYCLE ----

    #[tokio::test]
    async fn test_pool_closed_after_success() {
        let pool = memory_pool().await;
        run_and_close(pool.clone(), Command::AddTotalRow, PathBuf::from("./data"))
            .await
            .unwrap();
        assert!(pool.is_closed());
    }

    #[tokio::test]
    async fn test_pool_closed_when_run_start_fails() {
        let pool = memory_pool().await;
        block(&pool, "INSERT").await;

        let err = run_and_close(pool.clone(), Command::AddTotalRow, PathBuf::from("./data"))
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to record run start"));
        assert!(pool.is_closed());
    }

    #[tokio::test]
    async fn test_pool_closed_when_run_finish_fails() {
        let pool = memory_pool().await;
        block(&pool, "UPDATE").await;

        let err = run_and_close(pool.clone(), Command::AddTotalRow, PathBuf::from("./data"))
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to record run outcome"));
        assert!(pool.is_closed());
    }
}
