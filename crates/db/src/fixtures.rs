use chrono::Utc;

use zam_core::reference::{seed_comparables, seed_constants, seed_industries};

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_TABLES: &[&str] = &["industry", "comparable_company", "system_constant"];

/// Built-in reference data: five industry benchmarks, five public
/// comparables and the four wizard option lists.
///
/// Loading is idempotent; rows that already exist keep their stored values.
pub struct ReferenceSeed;

impl ReferenceSeed {
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let industries = seed_industries();
        let comparables = seed_comparables();
        let constants = seed_constants();
        let now = Utc::now().to_rfc3339();

        let mut tx = pool.begin().await?;
        let mut inserted = 0_u64;

        for industry in &industries {
            inserted += sqlx::query(
                r#"
                INSERT OR IGNORE INTO industry (
                    key, name, description, avg_acv, churn_rate, growth_rate,
                    naics_codes_json, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&industry.key)
            .bind(&industry.name)
            .bind(&industry.description)
            .bind(industry.metrics.avg_acv)
            .bind(industry.metrics.churn_rate)
            .bind(industry.metrics.growth_rate)
            .bind(serde_json::to_string(&industry.naics_codes)?)
            .bind(&now)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        for company in &comparables {
            let customers = i64::try_from(company.metrics.customers).map_err(|_| {
                RepositoryError::Decode(format!("customer count out of range for {}", company.name))
            })?;
            inserted += sqlx::query(
                r#"
                INSERT OR IGNORE INTO comparable_company (
                    name, ticker, industry_key, description, revenue, growth, customers,
                    acv, model, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&company.name)
            .bind(&company.ticker)
            .bind(&company.industry)
            .bind(&company.description)
            .bind(company.metrics.revenue)
            .bind(company.metrics.growth)
            .bind(customers)
            .bind(company.metrics.acv)
            .bind(&company.model)
            .bind(&now)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        for (position, constant) in constants.iter().enumerate() {
            inserted += sqlx::query(
                r#"
                INSERT OR IGNORE INTO system_constant (key, items_json, position, created_at)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(&constant.key)
            .bind(serde_json::to_string(&constant.items)?)
            .bind(position as i64)
            .bind(&now)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;

        tracing::info!(
            event_name = "db.seed.reference_loaded",
            rows_inserted = inserted,
            "reference seed applied"
        );

        Ok(SeedResult {
            industries: industries.len(),
            comparables: comparables.len(),
            constants: constants.len(),
            rows_inserted: inserted,
        })
    }

    /// Checks that every seeded key is present in the store.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let industry_keys: Vec<String> = seed_industries().into_iter().map(|i| i.key).collect();
        let company_names: Vec<String> = seed_comparables().into_iter().map(|c| c.name).collect();
        let constant_keys: Vec<String> = seed_constants().into_iter().map(|c| c.key).collect();

        for (table, column, expected) in [
            (SEED_TABLES[0], "key", &industry_keys),
            (SEED_TABLES[1], "name", &company_names),
            (SEED_TABLES[2], "key", &constant_keys),
        ] {
            let mut present = 0_usize;
            for value in expected {
                let sql = format!("SELECT COUNT(*) FROM {table} WHERE {column} = ?");
                let count: i64 = sqlx::query_scalar(&sql).bind(value).fetch_one(pool).await?;
                if count == 1 {
                    present += 1;
                }
            }
            checks.push((table, present == expected.len()));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub industries: usize,
    pub comparables: usize,
    pub constants: usize,
    /// Zero when the seed had already been applied.
    pub rows_inserted: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
