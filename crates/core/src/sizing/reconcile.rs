use crate::domain::estimation::{Assumptions, EstimationResult, MarketMetrics, ReconciledEstimate};
use crate::domain::narrative::NarrativeResult;

pub const AI_REFINED_STEP: &str = "AI Refined: Adjusting based on deep market analysis...";

/// Overlays model-suggested assumptions on the estimator's and recomputes the
/// metrics from the merged set.
///
/// A suggestion only wins when it is a usable number: present, finite and
/// strictly positive. Zero therefore never overrides, even when the model
/// meant it.
pub fn reconcile(estimation: &EstimationResult, narrative: &NarrativeResult) -> ReconciledEstimate {
    let base = estimation.assumptions;
    let suggested = narrative.suggested_assumptions;

    let avg_price = usable(suggested.avg_price);
    let users = usable(suggested.total_addressable_users);
    let reach = usable(suggested.market_reach);
    let share = usable(suggested.market_share);
    let ai_applied = avg_price.is_some() || users.is_some() || reach.is_some() || share.is_some();

    let assumptions = Assumptions {
        avg_price: avg_price.unwrap_or(base.avg_price),
        total_addressable_users: users
            .map(|count| count.floor().min(u64::MAX as f64) as u64)
            .unwrap_or(base.total_addressable_users),
        market_reach: reach.map(|pct| pct.min(100.0)).unwrap_or(base.market_reach),
        market_share: share.map(|pct| pct.min(100.0)).unwrap_or(base.market_share),
    };
    let metrics = MarketMetrics::from_assumptions(&assumptions);

    let logic_steps = if ai_applied {
        std::iter::once(AI_REFINED_STEP.to_string())
            .chain(estimation.logic_steps.iter().cloned())
            .collect()
    } else {
        estimation.logic_steps.clone()
    };

    ReconciledEstimate { assumptions, metrics, logic_steps, ai_applied }
}

// Stricter than plain truthiness on purpose: negatives are dropped too, and
// reach/share are capped at 100 by the caller, so a bad suggestion can never
// produce negative or out-of-range figures.
fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}
