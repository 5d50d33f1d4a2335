//! Read-only access to the seeded tables.

use std::str::FromStr;

use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BehaviorRow {
    pub year: i64,
    pub stay_duration: f64,
    pub avg_spending: f64,
    pub satisfaction: Option<f64>,
    pub revisit_intention: Option<f64>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContinentRow {
    pub continent: String,
    pub tourist_count: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CountryRow {
    pub country: String,
    pub tourist_count: f64,
    pub previous_year_count: Option<f64>,
    pub growth_rate: Option<f64>,
    pub percentage: Option<f64>,
    pub rank: Option<i64>,
}

/// Age bracket count for the all-continents, all-countries slice.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AgeRow {
    pub age_group: String,
    pub count: f64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GenderAgeRow {
    pub age_group: String,
    pub male_count: f64,
    pub female_count: f64,
    pub male_percentage: Option<f64>,
    pub female_percentage: Option<f64>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InterestRow {
    pub year_month: String,
    pub interest_percentage: f64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrendRow {
    pub tourist_count: f64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransportSummaryRow {
    pub transport: String,
    pub tourist_count: f64,
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InsightRow {
    pub id: i64,
    pub category: String,
    pub title: String,
    pub description: String,
    pub data_source: Option<String>,
    pub priority: Option<i64>,
    pub created_at: Option<i64>,
}

/// Everything the dashboard derives from, loaded in one go.
#[derive(Debug, Clone, Default)]
pub struct DashboardData {
    pub behavior: Vec<BehaviorRow>,
    pub continents: Vec<ContinentRow>,
    pub countries: Vec<CountryRow>,
    pub ages: Vec<AgeRow>,
    pub gender_ages: Vec<GenderAgeRow>,
    pub interest: Vec<InterestRow>,
    pub trend: Vec<TrendRow>,
    pub transport: Vec<TransportSummaryRow>,
}

// ============================================================================
// Connection
// ============================================================================

/// Open the seeded database read-only. The api never writes.
pub async fn connect(db_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(db_url)?.read_only(true);
    SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await
}

// ============================================================================
// Loaders
// ============================================================================

// Every loader orders by id so derived values that depend on input order
// (first maximum wins, positional month labels) follow ingestion order.

pub async fn behavior(pool: &SqlitePool) -> Result<Vec<BehaviorRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT year, stay_duration, avg_spending, satisfaction, revisit_intention
        FROM tourist_behavior
        ORDER BY year, id
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn continents(pool: &SqlitePool) -> Result<Vec<ContinentRow>, sqlx::Error> {
    sqlx::query_as("SELECT continent, tourist_count, percentage FROM tourist_by_continent ORDER BY id")
        .fetch_all(pool)
        .await
}

pub async fn countries(pool: &SqlitePool) -> Result<Vec<CountryRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT country, tourist_count, previous_year_count, growth_rate, percentage, rank
        FROM tourist_by_country
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn ages(pool: &SqlitePool) -> Result<Vec<AgeRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT age_group, count
        FROM tourist_by_age
        WHERE country IS NULL AND continent IS NULL
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn gender_ages(pool: &SqlitePool) -> Result<Vec<GenderAgeRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT age_group, male_count, female_count, male_percentage, female_percentage
        FROM tourist_by_gender_age
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn interest(pool: &SqlitePool) -> Result<Vec<InterestRow>, sqlx::Error> {
    sqlx::query_as("SELECT year_month, interest_percentage FROM korea_interest_trend ORDER BY id")
        .fetch_all(pool)
        .await
}

pub async fn trend(pool: &SqlitePool) -> Result<Vec<TrendRow>, sqlx::Error> {
    sqlx::query_as("SELECT tourist_count FROM tourist_trend ORDER BY id")
        .fetch_all(pool)
        .await
}

pub async fn transport_summary(
    pool: &SqlitePool,
) -> Result<Vec<TransportSummaryRow>, sqlx::Error> {
    sqlx::query_as(
        "SELECT transport, tourist_count, percentage FROM tourist_by_transport_summary ORDER BY id",
    )
    .fetch_all(pool)
    .await
}

pub async fn insights(pool: &SqlitePool) -> Result<Vec<InsightRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT id, category, title, description, data_source, priority, created_at
        FROM strategic_insights
        ORDER BY priority, id
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Run every dashboard read concurrently; the first failure fails the load.
pub async fn load_dashboard(pool: &SqlitePool) -> Result<DashboardData, sqlx::Error> {
    let (behavior, continents, countries, ages, gender_ages, interest, trend, transport) =
        tokio::try_join!(
            behavior(pool),
            continents(pool),
            countries(pool),
            ages(pool),
            gender_ages(pool),
            interest(pool),
            trend(pool),
            transport_summary(pool),
        )?;

    Ok(DashboardData {
        behavior,
        continents,
        countries,
        ages,
        gender_ages,
        interest,
        trend,
        transport,
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::{empty_pool, seeded_pool};
    use super::*;

    #[tokio::test]
    async fn test_load_dashboard_reads_every_table() {
        let pool = seeded_pool().await;
        let data = load_dashboard(&pool).await.unwrap();

        assert_eq!(data.behavior.len(), 2);
        assert_eq!(data.continents.len(), 2);
        assert_eq!(data.countries.len(), 3);
        assert_eq!(data.gender_ages.len(), 2);
        assert_eq!(data.interest.len(), 2);
        assert_eq!(data.trend.len(), 2);
        assert_eq!(data.transport.len(), 4);
    }

    #[tokio::test]
    async fn test_behavior_ordered_by_year() {
        let pool = seeded_pool().await;
        let rows = behavior(&pool).await.unwrap();
        let years: Vec<_> = rows.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2015, 2024]);
    }

    #[tokio::test]
    async fn test_ages_only_unbroken_slice() {
        let pool = seeded_pool().await;
        let rows = ages(&pool).await.unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.count != 999.0));
    }

    #[tokio::test]
    async fn test_age_breakdown_within_total() {
        let pool = seeded_pool().await;
        let rows = ages(&pool).await.unwrap();

        let total = rows
            .iter()
            .find(|r| r.age_group == "전체")
            .map(|r| r.count)
            .unwrap();
        let brackets = rows
            .iter()
            .filter(|r| r.age_group != "전체" && r.age_group != "승무원")
            .fold(0.0, |acc, r| acc + r.count);
        assert_eq!(brackets, 500.0);
        assert!(brackets <= total);
    }

    #[tokio::test]
    async fn test_countries_keep_ingestion_order() {
        let pool = seeded_pool().await;
        let rows = countries(&pool).await.unwrap();
        assert_eq!(rows[0].country, "중국");
        assert_eq!(rows[2].country, "총계");
        assert_eq!(rows[2].previous_year_count, Some(16371455.0));
    }

    #[tokio::test]
    async fn test_insights_ordered_by_priority() {
        let pool = seeded_pool().await;
        let rows = insights(&pool).await.unwrap();
        let titles: Vec<_> = rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
        assert!(rows[0].created_at.is_some());
    }

    #[tokio::test]
    async fn test_load_dashboard_on_empty_tables() {
        let pool = empty_pool().await;
        let data = load_dashboard(&pool).await.unwrap();
        assert!(data.countries.is_empty());
        assert!(data.behavior.is_empty());
    }

    #[tokio::test]
    async fn test_load_dashboard_fails_without_schema() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        assert!(load_dashboard(&pool).await.is_err());
    }
}
