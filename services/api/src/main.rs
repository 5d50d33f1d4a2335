//! API Service - Read-only dashboard API over the seeded tourism database
//!
//! Endpoints:
//! - GET /health - Health check
//! - GET /dashboard - Every derived dashboard value in one document
//! - GET /insights - Strategic insights, most important first
//!
//! Run only after the seeder has exited; the database is opened read-only.

mod metrics;
mod queries;
mod routes;

use std::sync::Arc;

use anyhow::Context;
use sqlx::SqlitePool;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::routes::AppState;

#[derive(Debug)]
struct Config {
    db_url: String,
    bind: String,
}

impl Config {
    fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            db_url: std::env::var("DB_URL").context("DB_URL env var missing")?,
            bind: std::env::var("API_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
        })
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::from_env()?;

    let pool = queries::connect(&config.db_url)
        .await
        .context("Failed to connect to database")?;
    info!("database connected (read-only)");

    run(pool, &config.bind).await
}

/// Serves until shutdown, then closes the pool whether serving failed or not.
async fn run(pool: SqlitePool, bind: &str) -> anyhow::Result<()> {
    let result = serve(pool.clone(), bind).await;
    pool.close().await;
    result
}

async fn serve(pool: SqlitePool, bind: &str) -> anyhow::Result<()> {
    let state = Arc::new(AppState { pool });
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!(bind = %bind, "API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
