//! SQLite schema and every write the seeder performs.

use std::str::FromStr;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::dataset::{Dataset, Row, Value};
use crate::error::Result;
use crate::insights::Insight;

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Natural keys are UNIQUE everywhere except the three detail tables
/// (age, gender, purpose), where repeated period/country/category
/// combinations are expected.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tourist_spending (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    year_month          TEXT NOT NULL,
    spending_per_person REAL NOT NULL      -- USD
);

CREATE TABLE IF NOT EXISTS tourist_revenue (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    year_month          TEXT NOT NULL,
    revenue_million_usd REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS tourist_behavior (
    id                       INTEGER PRIMARY KEY AUTOINCREMENT,
    year                     INTEGER NOT NULL UNIQUE,
    revisit_rate             REAL,
    stay_duration            REAL NOT NULL,   -- days
    avg_spending             REAL NOT NULL,   -- USD per person
    daily_spending           REAL,
    satisfaction             REAL,            -- % positive answers
    revisit_intention        REAL,
    recommendation_intention REAL
);

CREATE TABLE IF NOT EXISTS tourist_by_continent (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    continent     TEXT NOT NULL UNIQUE,
    tourist_count REAL NOT NULL,
    percentage    REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS tourist_by_country (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    country             TEXT NOT NULL UNIQUE,
    tourist_count       REAL NOT NULL,
    previous_year_count REAL,
    growth_rate         REAL,
    percentage          REAL,
    rank                INTEGER
);

CREATE TABLE IF NOT EXISTS tourist_by_nationality (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    nationality   TEXT NOT NULL UNIQUE,
    tourist_count REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS tourist_trend (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    year_month    TEXT NOT NULL UNIQUE,
    tourist_count REAL NOT NULL,
    exchange_rate REAL,                    -- KRW per USD
    oil_price     REAL                     -- USD per barrel
);

CREATE TABLE IF NOT EXISTS tourist_by_age (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    year_month          TEXT NOT NULL,
    continent           TEXT,
    country             TEXT,
    age_group           TEXT NOT NULL,
    count               REAL NOT NULL,
    previous_year_count REAL,
    growth_rate         REAL
);

CREATE TABLE IF NOT EXISTS tourist_by_gender (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    year_month          TEXT NOT NULL,
    continent           TEXT,
    country             TEXT,
    gender              TEXT NOT NULL,     -- 남성, 여성, 승무원
    count               REAL NOT NULL,
    previous_year_count REAL,
    growth_rate         REAL
);

CREATE TABLE IF NOT EXISTS tourist_by_gender_age (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    age_group         TEXT NOT NULL UNIQUE,
    male_count        REAL NOT NULL,
    female_count      REAL NOT NULL,
    male_percentage   REAL,
    female_percentage REAL
);

CREATE TABLE IF NOT EXISTS tourist_by_purpose (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    year_month          TEXT NOT NULL,
    continent           TEXT,
    country             TEXT,
    purpose             TEXT NOT NULL,
    count               REAL NOT NULL,
    previous_year_count REAL,
    growth_rate         REAL
);

CREATE TABLE IF NOT EXISTS tourist_by_purpose_summary (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    purpose       TEXT NOT NULL UNIQUE,
    tourist_count REAL NOT NULL,
    percentage    REAL
);

CREATE TABLE IF NOT EXISTS tourist_by_transport (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    year_month      TEXT NOT NULL,
    incheon_airport REAL,
    gimhae_airport  REAL,
    gimpo_airport   REAL,
    jeju_airport    REAL,
    other_airports  REAL,
    busan_port      REAL,
    incheon_port    REAL,
    jeju_port       REAL,
    other_ports     REAL,
    exchange_rate   REAL,
    oil_price       REAL
);

CREATE TABLE IF NOT EXISTS tourist_by_transport_summary (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    transport     TEXT NOT NULL UNIQUE,
    tourist_count REAL NOT NULL,
    percentage    REAL
);

CREATE TABLE IF NOT EXISTS korea_image (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    year     INTEGER NOT NULL,
    category TEXT NOT NULL,
    value    REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS korea_visit_intention (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    year     INTEGER NOT NULL,
    category TEXT NOT NULL,
    value    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS korea_interest_trend (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    year_month          TEXT NOT NULL UNIQUE,
    interest_percentage REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS strategic_insights (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    category    TEXT NOT NULL,
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    data_source TEXT,
    priority    INTEGER DEFAULT 1,
    created_at  INTEGER DEFAULT (CAST(strftime('%s', 'now') AS INTEGER))
);

-- One row per seeder invocation. Outcome only; ingestion is not
-- rolled back across datasets.
CREATE TABLE IF NOT EXISTS seed_runs (
    run_id      TEXT PRIMARY KEY,
    command     TEXT NOT NULL,
    status      TEXT NOT NULL,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    error       TEXT,
    detail      TEXT NOT NULL DEFAULT '{}'
);
"#;

/// SQLite's default bound-parameter limit (3.32+).
const MAX_BIND_PARAMS: usize = 32_766;

/// Sentinel natural key of the country-level grand total.
pub const TOTAL_SENTINEL: &str = "총계";

/// The grand-total country row missing from the raw export.
/// Source line: `총계,1.8938339E7,1.6371455E7,15.7,0.0,0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TotalRow {
    pub tourist_count: f64,
    pub previous_year_count: f64,
    pub growth_rate: f64,
    pub percentage: f64,
    pub rank: i64,
}

pub const TOTAL_ROW: TotalRow = TotalRow {
    tourist_count: 18_938_339.0,
    previous_year_count: 16_371_455.0,
    growth_rate: 15.7,
    percentage: 0.0,
    rank: 0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalRowOutcome {
    Inserted,
    AlreadyPresent,
}

/// Open (creating if needed) the database at `db_url`.
pub async fn connect(db_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}

/// Bulk insert one dataset's rows. The dataset lands in a single
/// transaction; nothing spans datasets.
pub async fn insert_rows(pool: &SqlitePool, dataset: &Dataset, rows: &[Row]) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }

    let header = format!(
        "INSERT INTO {} ({}) ",
        dataset.table,
        dataset.target_columns().join(", ")
    );
    let rows_per_chunk = (MAX_BIND_PARAMS / dataset.columns.len().max(1)).max(1);

    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for chunk in rows.chunks(rows_per_chunk) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(header.as_str());
        builder.push_values(chunk, |mut b, row| {
            for value in row {
                match value {
                    Value::Text(s) => b.push_bind(s.clone()),
                    Value::Real(v) => b.push_bind(*v),
                    Value::Integer(v) => b.push_bind(*v),
                    Value::Null => b.push_bind(None::<f64>),
                };
            }
        });
        inserted += builder.build().execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Whether any strategic insight has been stored yet.
pub async fn insights_present(pool: &SqlitePool) -> Result<bool> {
    let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM strategic_insights")
        .fetch_one(pool)
        .await?;
    Ok(n > 0)
}

pub async fn insert_insights(pool: &SqlitePool, insights: &[Insight]) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for insight in insights {
        inserted += sqlx::query(
            r#"
            INSERT INTO strategic_insights (category, title, description, data_source, priority)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(insight.category)
        .bind(insight.title)
        .bind(insight.description)
        .bind(insight.data_source)
        .bind(insight.priority)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Add the country grand-total row unless it is already there.
pub async fn ensure_total_row(pool: &SqlitePool) -> Result<TotalRowOutcome> {
    let existing: Option<(i64, f64)> =
        sqlx::query_as("SELECT id, tourist_count FROM tourist_by_country WHERE country = ?")
            .bind(TOTAL_SENTINEL)
            .fetch_optional(pool)
            .await?;

    if let Some((id, tourist_count)) = existing {
        warn!(id, tourist_count, "{} row already exists", TOTAL_SENTINEL);
        return Ok(TotalRowOutcome::AlreadyPresent);
    }

    sqlx::query(
        r#"
        INSERT INTO tourist_by_country
            (country, tourist_count, previous_year_count, growth_rate, percentage, rank)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(TOTAL_SENTINEL)
    .bind(TOTAL_ROW.tourist_count)
    .bind(TOTAL_ROW.previous_year_count)
    .bind(TOTAL_ROW.growth_rate)
    .bind(TOTAL_ROW.percentage)
    .bind(TOTAL_ROW.rank)
    .execute(pool)
    .await?;

    info!(
        tourist_count = TOTAL_ROW.tourist_count,
        previous_year_count = TOTAL_ROW.previous_year_count,
        growth_rate = TOTAL_ROW.growth_rate,
        "{} row added",
        TOTAL_SENTINEL
    );
    Ok(TotalRowOutcome::Inserted)
}

/// Record the start of a seeder invocation.
pub async fn start_run(pool: &SqlitePool, command: &str) -> Result<Uuid> {
    let run_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO seed_runs (run_id, command, status, started_at) VALUES (?, ?, 'running', ?)",
    )
    .bind(run_id.to_string())
    .bind(command)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(run_id)
}

/// Close a run record with its outcome.
pub async fn finish_run(
    pool: &SqlitePool,
    run_id: Uuid,
    status: &str,
    error: Option<&str>,
    detail: serde_json::Value,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE seed_runs
        SET finished_at = ?, status = ?, error = ?, detail = ?
        WHERE run_id = ?
        "#,
    )
    .bind(Utc::now())
    .bind(status)
    .bind(error)
    .bind(detail.to_string())
    .bind(run_id.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    migrate(&pool).await.expect("schema");
    pool
}
