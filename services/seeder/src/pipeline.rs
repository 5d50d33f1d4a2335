//! Sequential read -> normalize -> insert over every dataset.
//!
//! The first failure aborts the run. Datasets that already landed stay
//! committed; re-running from scratch needs an empty database.

use std::path::Path;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::dataset::{Dataset, Row};
use crate::error::Result;
use crate::insights::Insight;
use crate::source::read_table;
use crate::store;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DatasetReport {
    pub table: &'static str,
    pub source_rows: usize,
    pub inserted: u64,
}

#[derive(Debug, Default, Clone, Serialize, PartialEq)]
pub struct SeedReport {
    pub datasets: Vec<DatasetReport>,
    pub insights: u64,
}

impl SeedReport {
    pub fn total_inserted(&self) -> u64 {
        self.datasets.iter().map(|d| d.inserted).sum::<u64>() + self.insights
    }
}

async fn load(data_dir: &Path, dataset: &Dataset) -> Result<(usize, Vec<Row>)> {
    let path = data_dir.join(dataset.file);
    debug!(path = %path.display(), "reading");
    let table = read_table(&path).await?;
    let rows = dataset.normalize(&table)?;
    Ok((table.records.len(), rows))
}

/// Ingest every dataset, then the static insights unless an earlier run
/// already stored them. Progress is written into `report` as each step
/// commits so a failed run still reports what landed.
pub async fn seed(
    pool: &SqlitePool,
    data_dir: &Path,
    datasets: &[Dataset],
    insights: &[Insight],
    report: &mut SeedReport,
) -> Result<()> {
    for dataset in datasets {
        info!(dataset = dataset.name, table = dataset.table, "seeding");
        let (source_rows, rows) = load(data_dir, dataset).await?;
        let inserted = store::insert_rows(pool, dataset, &rows).await?;

        if dataset.filter.is_some() {
            info!(
                table = dataset.table,
                source_rows,
                kept = rows.len(),
                "filtered to reference period"
            );
        }
        info!(table = dataset.table, inserted, "seeded");

        report.datasets.push(DatasetReport {
            table: dataset.table,
            source_rows,
            inserted,
        });
    }

    if store::insights_present(pool).await? {
        info!("strategic insights already stored, skipping");
        return Ok(());
    }
    report.insights = store::insert_insights(pool, insights).await?;
    info!(inserted = report.insights, "seeded strategic insights");
    Ok(())
}

/// Read and normalize every dataset without touching a database.
pub async fn dry_run(data_dir: &Path, datasets: &[Dataset]) -> Result<Vec<DatasetReport>> {
    let mut reports = Vec::with_capacity(datasets.len());
    for dataset in datasets {
        let (source_rows, rows) = load(data_dir, dataset).await?;
        info!(
            table = dataset.table,
            source_rows,
            normalized = rows.len(),
            "dry run"
        );
        reports.push(DatasetReport {
            table: dataset.table,
            source_rows,
            inserted: 0,
        });
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{by_table, DATASETS};
    use crate::error::IngestError;
    use crate::insights::INSIGHTS;
    use crate::store::memory_pool;

    const COUNTRY_CSV: &str = "\u{feff}국가,방한 외래관광객,전년동기 관광객,전년대비 증감률,구성비,순위\n\
                               중국,5490000,5000000,9.8,28.3,1\n\
                               일본,3650000,3200000,14.1,19.3,2\n";

    const CONTINENT_CSV: &str = "대륙,방한관광객,방한관광객 비율\n\
                                 아시아,15245000,80.5\n\
                                 기타,12000,0.1\n";

    fn write(dir: &Path, dataset: &Dataset, content: &str) {
        std::fs::write(dir.join(dataset.file), content).unwrap();
    }

    fn pick(tables: &[&str]) -> Vec<Dataset> {
        tables.iter().map(|t| *by_table(t).unwrap()).collect()
    }

    #[tokio::test]
    async fn test_country_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let datasets = pick(&["tourist_by_country"]);
        write(dir.path(), &datasets[0], COUNTRY_CSV);

        let pool = memory_pool().await;
        let mut report = SeedReport::default();
        seed(&pool, dir.path(), &datasets, &[], &mut report)
            .await
            .unwrap();

        let (country, count, growth, rank): (String, f64, Option<f64>, Option<i64>) =
            sqlx::query_as(
                "SELECT country, tourist_count, growth_rate, rank FROM tourist_by_country ORDER BY id LIMIT 1",
            )
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(country, "중국");
        assert!(!country.contains('\u{feff}'));
        assert_eq!(count, 5490000.0);
        assert_eq!(growth, Some(9.8));
        assert_eq!(rank, Some(1));
        assert_eq!(report.datasets[0].inserted, 2);
    }

    #[tokio::test]
    async fn test_seed_runs_datasets_in_order_then_insights() {
        let dir = tempfile::tempdir().unwrap();
        let datasets = pick(&["tourist_by_continent", "tourist_by_country"]);
        write(dir.path(), &datasets[0], CONTINENT_CSV);
        write(dir.path(), &datasets[1], COUNTRY_CSV);

        let pool = memory_pool().await;
        let mut report = SeedReport::default();
        seed(&pool, dir.path(), &datasets, INSIGHTS, &mut report)
            .await
            .unwrap();

        let tables: Vec<_> = report.datasets.iter().map(|d| d.table).collect();
        assert_eq!(tables, vec!["tourist_by_continent", "tourist_by_country"]);
        assert_eq!(report.insights, INSIGHTS.len() as u64);
        assert_eq!(report.total_inserted(), 2 + 2 + 8);
    }

    #[tokio::test]
    async fn test_failure_aborts_without_rolling_back_earlier_datasets() {
        let dir = tempfile::tempdir().unwrap();
        let datasets = pick(&["tourist_by_continent", "tourist_by_country"]);
        write(dir.path(), &datasets[0], CONTINENT_CSV);
        // country file is missing

        let pool = memory_pool().await;
        let mut report = SeedReport::default();
        let result = seed(&pool, dir.path(), &datasets, INSIGHTS, &mut report).await;

        assert!(matches!(result, Err(IngestError::Io { .. })));
        assert_eq!(report.datasets.len(), 1);
        assert_eq!(report.insights, 0);

        let (continents,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tourist_by_continent")
            .fetch_one(&pool)
            .await
            .unwrap();
        let (insights,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM strategic_insights")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(continents, 2);
        assert_eq!(insights, 0);
    }

    #[tokio::test]
    async fn test_rerun_fails_on_unique_tables() {
        let dir = tempfile::tempdir().unwrap();
        let datasets = pick(&["tourist_by_country"]);
        write(dir.path(), &datasets[0], COUNTRY_CSV);

        let pool = memory_pool().await;
        let mut first = SeedReport::default();
        seed(&pool, dir.path(), &datasets, &[], &mut first)
            .await
            .unwrap();

        let mut second = SeedReport::default();
        let result = seed(&pool, dir.path(), &datasets, &[], &mut second).await;
        assert!(matches!(result, Err(IngestError::Database(_))));
    }

    /// (table, natural key, CSV with one row per key)
    const KEYED: &[(&str, &str, &str)] = &[
        ("tourist_by_continent", "continent", CONTINENT_CSV),
        ("tourist_by_country", "country", COUNTRY_CSV),
        (
            "tourist_by_nationality",
            "nationality",
            "국적,방한관광객\n중국,4600000\n일본,3220000\n미국,1320000\n",
        ),
        (
            "tourist_by_gender_age",
            "age_group",
            "연령대,남성,여성,남성(비율),여성(비율)\n\
             전체,100,200,33.3,66.7\n\
             21~30세,40,90,30.8,69.2\n\
             31~40세,30,50,37.5,62.5\n",
        ),
        (
            "tourist_by_purpose_summary",
            "purpose",
            "목적,방한 외래관광객,방한 외래관광객(비율)\n\
             관광,1200000,80.0\n\
             상용,300000,20.0\n",
        ),
        (
            "tourist_by_transport_summary",
            "transport",
            "교통수단,방한 외래관광객(명),비중(%)\n\
             인천공항,1000000,70.0\n\
             김해공항,200000,14.0\n\
             부산항구,50000,3.5\n",
        ),
    ];

    #[tokio::test]
    async fn test_uniqueness_after_ingestion() {
        let dir = tempfile::tempdir().unwrap();
        let tables: Vec<&str> = KEYED.iter().map(|(t, _, _)| *t).collect();
        let datasets = pick(&tables);
        for (dataset, (_, _, csv)) in datasets.iter().zip(KEYED) {
            write(dir.path(), dataset, csv);
        }

        let pool = memory_pool().await;
        let mut report = SeedReport::default();
        seed(&pool, dir.path(), &datasets, &[], &mut report)
            .await
            .unwrap();

        for (table, key, _) in KEYED {
            let sql = format!(
                "SELECT COUNT(*) FROM (SELECT {key} FROM {table} GROUP BY {key} HAVING COUNT(*) > 1)"
            );
            let (dupes,): (i64,) = sqlx::query_as(&sql).fetch_one(&pool).await.unwrap();
            assert_eq!(dupes, 0, "{table}");

            let (rows,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(&pool)
                .await
                .unwrap();
            assert!(rows > 0, "{table}");
        }
    }

    #[tokio::test]
    async fn test_duplicate_natural_key_in_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let datasets = pick(&["tourist_by_transport_summary"]);
        write(
            dir.path(),
            &datasets[0],
            "교통수단,방한 외래관광객(명),비중(%)\n\
             인천공항,1000000,70.0\n\
             인천공항,1000000,70.0\n",
        );

        let pool = memory_pool().await;
        let mut report = SeedReport::default();
        let result = seed(&pool, dir.path(), &datasets, &[], &mut report).await;
        assert!(matches!(result, Err(IngestError::Database(_))));

        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tourist_by_transport_summary")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn test_subset_runs_store_insights_once() {
        let dir = tempfile::tempdir().unwrap();
        let continent = pick(&["tourist_by_continent"]);
        let country = pick(&["tourist_by_country"]);
        write(dir.path(), &continent[0], CONTINENT_CSV);
        write(dir.path(), &country[0], COUNTRY_CSV);

        let pool = memory_pool().await;
        let mut first = SeedReport::default();
        seed(&pool, dir.path(), &continent, INSIGHTS, &mut first)
            .await
            .unwrap();
        let mut second = SeedReport::default();
        seed(&pool, dir.path(), &country, INSIGHTS, &mut second)
            .await
            .unwrap();

        assert_eq!(first.insights, INSIGHTS.len() as u64);
        assert_eq!(second.insights, 0);

        let (insights,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM strategic_insights")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(insights, INSIGHTS.len() as i64);
    }

    #[tokio::test]
    async fn test_dry_run_reads_without_database() {
        let dir = tempfile::tempdir().unwrap();
        let datasets = pick(&["tourist_by_age"]);
        write(
            dir.path(),
            &datasets[0],
            "기준일자,주요국가대륙명,국가명,연령,인원,전년동기,증감률\n\
             202412,대륙전체,연도,전체,1000,900,11.1\n\
             202501,대륙전체,연도,전체,1200,1000,20.0\n",
        );

        let reports = dry_run(dir.path(), &datasets).await.unwrap();
        assert_eq!(reports[0].source_rows, 2);
        assert_eq!(reports[0].inserted, 0);
    }

    #[tokio::test]
    async fn test_dry_run_over_all_datasets_fails_on_first_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = dry_run(dir.path(), DATASETS).await;
        match result {
            Err(IngestError::Io { path, .. }) => assert!(path.ends_with(DATASETS[0].file)),
            other => panic!("expected Io error, got {:?}", other),
        }
    }
}
