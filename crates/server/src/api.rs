//! JSON API consumed by the sizing wizard.
//!
//! Reference data:
//! - `GET  /api/industries`               benchmarks, with `value`/`label` for selects
//! - `GET  /api/comparables?industry=`    public comparables
//! - `GET  /api/constants`                `{KEY: [items]}` option lists
//!
//! Saved analyses (scoped by the `x-device-id` header):
//! - `GET    /api/analyses`               newest first
//! - `POST   /api/analyses`               store a result
//! - `DELETE /api/analyses/{id}`          owner-only delete
//!
//! Refinement (rate limited, see `analyze`):
//! - `POST /api/ai/analyze`
//! - `POST /api/estimate`

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use zam_agent::NarrativeRefiner;
use zam_core::domain::analysis::{Analysis, AnalysisId, DeviceId, NewAnalysis};
use zam_core::domain::reference::{ComparableCompany, EnumOption, IndustryBenchmark};
use zam_core::errors::{ApplicationError, DomainError, InterfaceError};
use zam_core::sizing::SizingConstants;
use zam_db::{AnalysisRepository, DeleteOutcome, RepositoryError};

use crate::analyze;
use crate::rate_limit::{self, RateLimiter};
use crate::reference_cache::ReferenceCache;

pub const DEVICE_HEADER: &str = "x-device-id";

#[derive(Clone)]
pub struct ApiState {
    pub analyses: Arc<dyn AnalysisRepository>,
    pub reference: Arc<ReferenceCache>,
    /// `None` when no model API key is configured.
    pub refiner: Option<Arc<NarrativeRefiner>>,
    pub sizing: Arc<SizingConstants>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_mock: Option<bool>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), error: None, is_mock: None }
    }
}

pub type ApiFailure = (StatusCode, Json<ApiError>);

#[derive(Debug, Serialize)]
pub struct IndustryOption {
    pub value: String,
    pub label: String,
    #[serde(flatten)]
    pub industry: IndustryBenchmark,
}

#[derive(Debug, Default, Deserialize)]
pub struct ComparablesQuery {
    pub industry: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteConfirmation {
    pub message: &'static str,
}

pub fn router(state: ApiState, limiter: Option<Arc<RateLimiter>>, cors_allow_any: bool) -> Router {
    let mut refinement = Router::new()
        .route("/api/ai/analyze", post(analyze::analyze))
        .route("/api/estimate", post(analyze::estimate_cycle));
    if let Some(limiter) = limiter {
        refinement = refinement.layer(from_fn_with_state(limiter, rate_limit::enforce));
    }

    let router = Router::new()
        .route("/api/industries", get(list_industries))
        .route("/api/comparables", get(list_comparables))
        .route("/api/constants", get(list_constants))
        .route("/api/analyses", get(list_analyses).post(create_analysis))
        .route("/api/analyses/{id}", delete(delete_analysis))
        .merge(refinement)
        .with_state(state);

    if cors_allow_any {
        router.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
    } else {
        router
    }
}

pub async fn list_industries(State(state): State<ApiState>) -> Json<Vec<IndustryOption>> {
    let snapshot = state.reference.snapshot().await;
    let industries = snapshot
        .industries
        .iter()
        .cloned()
        .map(|industry| IndustryOption {
            value: industry.key.clone(),
            label: industry.name.clone(),
            industry,
        })
        .collect();
    Json(industries)
}

pub async fn list_comparables(
    State(state): State<ApiState>,
    Query(query): Query<ComparablesQuery>,
) -> Json<Vec<ComparableCompany>> {
    let snapshot = state.reference.snapshot().await;
    let industry = query.industry.as_deref().map(str::trim).filter(|key| !key.is_empty());
    Json(snapshot.comparables_for(industry))
}

pub async fn list_constants(State(state): State<ApiState>) -> Json<BTreeMap<String, Vec<EnumOption>>> {
    Json(state.reference.snapshot().await.constant_map())
}

pub async fn list_analyses(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Analysis>>, ApiFailure> {
    let device_id = device_id(&headers)?;
    let analyses = state.analyses.list_for_device(&device_id).await.map_err(repository_error)?;
    Ok(Json(analyses))
}

pub async fn create_analysis(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(payload): Json<NewAnalysis>,
) -> Result<(StatusCode, Json<Analysis>), ApiFailure> {
    let device_id = device_id(&headers)?;
    let payload = payload.normalized().map_err(|error| {
        let interface = ApplicationError::from(error).into_interface(correlation_id());
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                message: "Invalid Data".to_string(),
                error: Some(interface.message().to_string()),
                is_mock: None,
            }),
        )
    })?;

    let stored = state
        .analyses
        .insert(payload.into_analysis(device_id, Utc::now()))
        .await
        .map_err(repository_error)?;

    info!(
        event_name = "api.analysis.saved",
        analysis_id = %stored.id.0,
        device_id = %stored.device_id.as_str(),
        "analysis saved"
    );
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn delete_analysis(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<DeleteConfirmation>, ApiFailure> {
    let device_id = device_id(&headers)?;
    let id = AnalysisId(id);

    match state.analyses.delete_owned(&id, &device_id).await.map_err(repository_error)? {
        DeleteOutcome::Deleted => {
            info!(
                event_name = "api.analysis.deleted",
                analysis_id = %id.0,
                device_id = %device_id.as_str(),
                "analysis deleted"
            );
            Ok(Json(DeleteConfirmation { message: "Analysis deleted" }))
        }
        DeleteOutcome::NotFound => {
            warn!(
                event_name = "api.analysis.delete_rejected",
                analysis_id = %id.0,
                device_id = %device_id.as_str(),
                "analysis missing or owned by another device"
            );
            let interface = ApplicationError::NotFound(
                "Analysis not found or permission denied".to_string(),
            )
            .into_interface(correlation_id());
            Err(interface_failure(&interface))
        }
    }
}

fn device_id(headers: &HeaderMap) -> Result<DeviceId, ApiFailure> {
    let raw = headers.get(DEVICE_HEADER).and_then(|value| value.to_str().ok()).unwrap_or_default();
    DeviceId::parse(raw).map_err(|error: DomainError| {
        let message = if raw.trim().is_empty() {
            "Missing Device ID".to_string()
        } else {
            error.reason().to_string()
        };
        (StatusCode::BAD_REQUEST, Json(ApiError::new(message)))
    })
}

pub(crate) fn correlation_id() -> String {
    format!("req-{}", Uuid::new_v4().simple())
}

pub(crate) fn interface_failure(interface: &InterfaceError) -> ApiFailure {
    let status = match interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiError::new(interface.message())))
}

fn repository_error(error: RepositoryError) -> ApiFailure {
    let correlation_id = correlation_id();
    error!(
        event_name = "api.repository.failed",
        correlation_id = %correlation_id,
        error = %error,
        "analysis store error"
    );
    let interface = ApplicationError::Persistence(error.to_string()).into_interface(correlation_id);
    // Store details stay in the log.
    (interface_failure(&interface).0, Json(ApiError::new("Server Error")))
}
