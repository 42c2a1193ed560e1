use serde::{Deserialize, Serialize};

/// Nested market-size figures in annual currency units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketMetrics {
    pub tam: f64,
    pub sam: f64,
    pub som: f64,
}

impl MarketMetrics {
    /// Top-down recomputation from a full assumption set. Percentages are
    /// taken as 0..=100 values. Products that overflow saturate at
    /// `f64::MAX` so the figures always serialize as numbers.
    pub fn from_assumptions(assumptions: &Assumptions) -> Self {
        let tam = bounded(assumptions.avg_price * assumptions.total_addressable_users as f64);
        let sam = percent_of(tam, assumptions.market_reach);
        let som = percent_of(sam, assumptions.market_share);
        Self { tam, sam, som }
    }
}

fn bounded(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, f64::MAX)
    }
}

fn percent_of(total: f64, pct: f64) -> f64 {
    let scaled = total * pct / 100.0;
    if scaled.is_finite() {
        bounded(scaled)
    } else {
        bounded(total * (pct / 100.0))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assumptions {
    pub avg_price: f64,
    pub total_addressable_users: u64,
    pub market_reach: f64,
    pub market_share: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimationResult {
    pub metrics: MarketMetrics,
    pub assumptions: Assumptions,
    pub logic_steps: Vec<String>,
}

/// Output of the reconciliation step: final assumptions after AI overrides,
/// recomputed metrics, and the logic trail shown to the user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledEstimate {
    pub assumptions: Assumptions,
    pub metrics: MarketMetrics,
    pub logic_steps: Vec<String>,
    pub ai_applied: bool,
}
