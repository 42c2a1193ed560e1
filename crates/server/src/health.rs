use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use zam_db::{connection::ping, DbPool};

use crate::reference_cache::ReferenceCache;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    reference: Arc<ReferenceCache>,
    ai_configured: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: HealthCheck,
    pub reference_data: HealthCheck,
    pub ai_service: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool, reference: Arc<ReferenceCache>, ai_configured: bool) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(HealthState { db_pool, reference, ai_configured })
}

/// Only the database decides readiness; reference data and the model key
/// are reported for operators.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match ping(&state.db_pool).await {
        Ok(()) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    };
    let ready = database.status == "ready";

    let reference_data = if state.reference.is_frozen() {
        HealthCheck { status: "ready", detail: "served from store".to_string() }
    } else {
        HealthCheck { status: "fallback", detail: "built-in seed until the store answers".to_string() }
    };
    let ai_service = if state.ai_configured {
        HealthCheck { status: "ready", detail: "model API key configured".to_string() }
    } else {
        HealthCheck { status: "disabled", detail: "no model API key configured".to_string() }
    };

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        database,
        reference_data,
        ai_service,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}
