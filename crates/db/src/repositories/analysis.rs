use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use zam_core::domain::analysis::{Analysis, AnalysisId, DeviceId};

use super::{AnalysisRepository, DeleteOutcome, RepositoryError};
use crate::DbPool;

pub struct SqlAnalysisRepository {
    pool: DbPool,
}

impl SqlAnalysisRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnalysisRepository for SqlAnalysisRepository {
    async fn list_for_device(&self, device_id: &DeviceId) -> Result<Vec<Analysis>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, device_id, product_name, created_at, inputs_json, metrics_json,
                   assumptions_json, ai_analysis_json, logic_steps_json
            FROM analysis
            WHERE device_id = ?
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(device_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_analysis).collect()
    }

    async fn insert(&self, analysis: Analysis) -> Result<Analysis, RepositoryError> {
        let assumptions_json = analysis.assumptions.as_ref().map(serde_json::to_string).transpose()?;
        let ai_analysis_json =
            analysis.ai_analysis.as_ref().map(serde_json::to_string).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO analysis (
                id, device_id, product_name, created_at, inputs_json, metrics_json,
                assumptions_json, ai_analysis_json, logic_steps_json
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&analysis.id.0)
        .bind(analysis.device_id.as_str())
        .bind(&analysis.product_name)
        .bind(format_timestamp(&analysis.created_at))
        .bind(serde_json::to_string(&analysis.inputs)?)
        .bind(serde_json::to_string(&analysis.metrics)?)
        .bind(assumptions_json)
        .bind(ai_analysis_json)
        .bind(serde_json::to_string(&analysis.logic_steps)?)
        .execute(&self.pool)
        .await?;

        Ok(analysis)
    }

    async fn delete_owned(
        &self,
        id: &AnalysisId,
        device_id: &DeviceId,
    ) -> Result<DeleteOutcome, RepositoryError> {
        let result = sqlx::query("DELETE FROM analysis WHERE id = ? AND device_id = ?")
            .bind(&id.0)
            .bind(device_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(if result.rows_affected() == 0 { DeleteOutcome::NotFound } else { DeleteOutcome::Deleted })
    }
}

/// Fixed-width UTC timestamps so `ORDER BY created_at` sorts chronologically.
fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid timestamp in `{column}`: {e}")))
}

fn decode_json<T: serde::de::DeserializeOwned>(
    column: &str,
    value: &str,
) -> Result<T, RepositoryError> {
    serde_json::from_str(value)
        .map_err(|e| RepositoryError::Decode(format!("invalid json in `{column}`: {e}")))
}

fn row_to_analysis(row: SqliteRow) -> Result<Analysis, RepositoryError> {
    let device_id: String = row.try_get("device_id")?;
    let assumptions_json: Option<String> = row.try_get("assumptions_json")?;
    let ai_analysis_json: Option<String> = row.try_get("ai_analysis_json")?;

    Ok(Analysis {
        id: AnalysisId(row.try_get("id")?),
        product_name: row.try_get("product_name")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        device_id: DeviceId::parse(&device_id)
            .map_err(|e| RepositoryError::Decode(format!("invalid device_id: {e}")))?,
        inputs: decode_json("inputs_json", &row.try_get::<String, _>("inputs_json")?)?,
        metrics: decode_json("metrics_json", &row.try_get::<String, _>("metrics_json")?)?,
        assumptions: assumptions_json
            .as_deref()
            .map(|json| decode_json("assumptions_json", json))
            .transpose()?,
        ai_analysis: ai_analysis_json
            .as_deref()
            .map(|json| decode_json("ai_analysis_json", json))
            .transpose()?,
        logic_steps: decode_json(
            "logic_steps_json",
            &row.try_get::<String, _>("logic_steps_json")?,
        )?,
    })
}
