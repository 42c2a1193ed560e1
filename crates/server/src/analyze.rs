use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use zam_core::domain::estimation::{EstimationResult, MarketMetrics, ReconciledEstimate};
use zam_core::domain::narrative::NarrativeResult;
use zam_core::domain::reference::ComparableCompany;
use zam_core::domain::wizard::WizardInput;
use zam_core::errors::{ApplicationError, DomainError};
use zam_core::sizing::reconcile;

use crate::api::{correlation_id, interface_failure, ApiError, ApiFailure, ApiState};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub form_data: Option<WizardInput>,
    /// Baseline already computed by the caller; recomputed when absent.
    #[serde(default)]
    pub metrics: Option<MarketMetrics>,
    #[serde(default)]
    pub logic_steps: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateRequest {
    #[serde(default)]
    pub form_data: Option<WizardInput>,
}

/// Full estimation cycle output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResponse {
    pub baseline: EstimationResult,
    /// `None` when no model is configured; the result is then the baseline.
    pub analysis: Option<NarrativeResult>,
    pub result: ReconciledEstimate,
    pub comparables: Vec<ComparableCompany>,
    pub ai_configured: bool,
}

/// Model critique of a baseline estimate.
///
/// 200 with the model's analysis, 503 with the flagged placeholder when every
/// model failed, 500 when no API key is configured.
pub async fn analyze(
    State(state): State<ApiState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<(StatusCode, Json<NarrativeResult>), ApiFailure> {
    let correlation_id = correlation_id();
    let form_data = request.form_data.ok_or_else(|| missing_data(&correlation_id))?;

    let Some(refiner) = state.refiner.clone() else {
        error!(
            event_name = "api.analyze.not_configured",
            correlation_id = %correlation_id,
            "model API key is not configured"
        );
        return Err(not_configured(&correlation_id));
    };

    let (metrics, logic_steps) = match request.metrics {
        Some(metrics) => (metrics, request.logic_steps.unwrap_or_default()),
        None => {
            let baseline = baseline(&state, &form_data).await;
            (baseline.metrics, request.logic_steps.unwrap_or(baseline.logic_steps))
        }
    };

    let refinement = refiner.refine(&form_data, &metrics, &logic_steps).await;
    let status =
        if refinement.is_fallback() { StatusCode::SERVICE_UNAVAILABLE } else { StatusCode::OK };

    info!(
        event_name = "api.analyze.completed",
        correlation_id = %correlation_id,
        served_by = refinement.served_by.as_deref().unwrap_or("placeholder"),
        attempts = refinement.attempts,
        status = status.as_u16(),
        "analysis request completed"
    );
    Ok((status, Json(refinement.narrative)))
}

/// Estimate, refine and reconcile in one request.
pub async fn estimate_cycle(
    State(state): State<ApiState>,
    Json(request): Json<EstimateRequest>,
) -> Result<Json<EstimateResponse>, ApiFailure> {
    let correlation_id = correlation_id();
    let form_data = request.form_data.ok_or_else(|| missing_data(&correlation_id))?;

    let snapshot = state.reference.snapshot().await;
    let baseline = snapshot.estimate(&form_data, &state.sizing);
    let comparables = snapshot.comparables_for(form_data.industry.as_deref());

    let analysis = match &state.refiner {
        Some(refiner) => {
            let refinement =
                refiner.refine(&form_data, &baseline.metrics, &baseline.logic_steps).await;
            if refinement.is_fallback() {
                warn!(
                    event_name = "api.estimate.placeholder_used",
                    correlation_id = %correlation_id,
                    attempts = refinement.attempts,
                    "model refinement unavailable, placeholder applied"
                );
            }
            Some(refinement.narrative)
        }
        None => None,
    };

    let result = match &analysis {
        Some(narrative) => reconcile(&baseline, narrative),
        None => reconcile(&baseline, &NarrativeResult::default()),
    };

    info!(
        event_name = "api.estimate.completed",
        correlation_id = %correlation_id,
        ai_applied = result.ai_applied,
        tam = result.metrics.tam,
        "estimation cycle completed"
    );

    Ok(Json(EstimateResponse {
        baseline,
        ai_configured: state.refiner.is_some(),
        analysis,
        result,
        comparables,
    }))
}

async fn baseline(state: &ApiState, form_data: &WizardInput) -> EstimationResult {
    state.reference.snapshot().await.estimate(form_data, &state.sizing)
}

fn missing_data(correlation_id: &str) -> ApiFailure {
    let interface = ApplicationError::from(DomainError::MissingData(
        "Missing required data".to_string(),
    ))
    .into_interface(correlation_id);
    interface_failure(&interface)
}

fn not_configured(correlation_id: &str) -> ApiFailure {
    let interface = ApplicationError::Configuration("AI service not configured".to_string())
        .into_interface(correlation_id);
    let (status, Json(body)) = interface_failure(&interface);
    (status, Json(ApiError { is_mock: Some(true), ..body }))
}
