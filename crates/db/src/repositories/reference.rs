use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};

use zam_core::domain::reference::{
    BenchmarkMetrics, CompanyMetrics, ComparableCompany, ConstantList, IndustryBenchmark,
};

use super::{ReferenceRepository, RepositoryError};
use crate::DbPool;

/// Read side of the seeded reference tables.
pub struct SqlReferenceRepository {
    pool: DbPool,
}

impl SqlReferenceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReferenceRepository for SqlReferenceRepository {
    async fn list_industries(&self) -> Result<Vec<IndustryBenchmark>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT key, name, description, avg_acv, churn_rate, growth_rate, naics_codes_json
            FROM industry
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_industry).collect()
    }

    async fn list_comparables(
        &self,
        industry: Option<&str>,
    ) -> Result<Vec<ComparableCompany>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT name, ticker, industry_key, description, revenue, growth, customers, acv, model
            FROM comparable_company
            WHERE ?1 IS NULL OR industry_key = ?1
            ORDER BY rowid
            "#,
        )
        .bind(industry)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_comparable).collect()
    }

    async fn list_constants(&self) -> Result<Vec<ConstantList>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT key, items_json FROM system_constant ORDER BY position, key",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let key: String = row.try_get("key")?;
                let items_json: String = row.try_get("items_json")?;
                let items = serde_json::from_str(&items_json).map_err(|e| {
                    RepositoryError::Decode(format!("invalid items_json for `{key}`: {e}"))
                })?;
                Ok(ConstantList { key, items })
            })
            .collect()
    }
}

fn row_to_industry(row: SqliteRow) -> Result<IndustryBenchmark, RepositoryError> {
    let key: String = row.try_get("key")?;
    let naics_json: String = row.try_get("naics_codes_json")?;
    let naics_codes = serde_json::from_str(&naics_json)
        .map_err(|e| RepositoryError::Decode(format!("invalid naics_codes_json for `{key}`: {e}")))?;

    Ok(IndustryBenchmark {
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        metrics: BenchmarkMetrics {
            avg_acv: row.try_get("avg_acv")?,
            churn_rate: row.try_get("churn_rate")?,
            growth_rate: row.try_get("growth_rate")?,
        },
        naics_codes,
        key,
    })
}

fn row_to_comparable(row: SqliteRow) -> Result<ComparableCompany, RepositoryError> {
    let customers: i64 = row.try_get("customers")?;
    let customers = u64::try_from(customers)
        .map_err(|_| RepositoryError::Decode(format!("negative customer count: {customers}")))?;

    Ok(ComparableCompany {
        name: row.try_get("name")?,
        ticker: row.try_get("ticker")?,
        industry: row.try_get("industry_key")?,
        description: row.try_get("description")?,
        metrics: CompanyMetrics {
            revenue: row.try_get("revenue")?,
            growth: row.try_get("growth")?,
            customers,
            acv: row.try_get("acv")?,
        },
        model: row.try_get("model")?,
    })
}

#[cfg(test)]
mod tests {
    use zam_core::reference::{ReferenceSnapshot, ReferenceSource, GEOGRAPHIES};

    use super::SqlReferenceRepository;
    use crate::fixtures::ReferenceSeed;
    use crate::repositories::ReferenceRepository;
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn unseeded_store_yields_empty_snapshot() {
        let pool = setup_pool().await;
        let repo = SqlReferenceRepository::new(pool.clone());

        let snapshot = repo.snapshot().await.expect("snapshot");

        assert!(snapshot.is_empty());
        assert_eq!(snapshot.source, ReferenceSource::Store);
        pool.close().await;
    }

    #[tokio::test]
    async fn seeded_store_matches_builtin_reference_data() {
        let pool = setup_pool().await;
        ReferenceSeed::load(&pool).await.expect("seed");
        let repo = SqlReferenceRepository::new(pool.clone());

        let stored = repo.snapshot().await.expect("snapshot");
        let builtin = ReferenceSnapshot::builtin();

        assert_eq!(stored.industries, builtin.industries);
        assert_eq!(stored.comparables, builtin.comparables);
        assert_eq!(stored.constants, builtin.constants);
        assert_eq!(stored.enum_options(GEOGRAPHIES).len(), 6);
        pool.close().await;
    }

    #[tokio::test]
    async fn comparables_can_be_filtered_by_industry() {
        let pool = setup_pool().await;
        ReferenceSeed::load(&pool).await.expect("seed");
        let repo = SqlReferenceRepository::new(pool.clone());

        let fintech = repo.list_comparables(Some("fintech")).await.expect("filtered");
        let unknown = repo.list_comparables(Some("space_mining")).await.expect("filtered");

        assert_eq!(fintech.len(), 1);
        assert_eq!(fintech[0].name, "Stripe");
        assert!(unknown.is_empty());
        pool.close().await;
    }
}
