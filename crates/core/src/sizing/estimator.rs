use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::estimation::{Assumptions, EstimationResult, MarketMetrics};
use crate::domain::reference::IndustryBenchmark;
use crate::domain::wizard::{CustomerType, Geography, WizardInput};
use crate::sizing::format::group_thousands;

/// Share of each region in the global addressable base. Advisory: the
/// factors sum to 1.0 but nothing enforces it.
pub const GEO_FACTORS: [(Geography, f64); 6] = [
    (Geography::Global, 1.0),
    (Geography::Na, 0.35),
    (Geography::Eu, 0.25),
    (Geography::Apac, 0.30),
    (Geography::Latam, 0.05),
    (Geography::Mea, 0.05),
];

/// Heuristic constants of the top-down model. None of these come from
/// census data; they are tunable defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SizingConstants {
    pub consumer_base: f64,
    pub business_base: f64,
    pub small_business_max_employees: u32,
    pub enterprise_min_employees: u32,
    pub small_business_share: f64,
    pub mid_market_share: f64,
    pub enterprise_share: f64,
    pub default_avg_price: f64,
    pub default_market_reach_pct: f64,
    pub default_market_share_pct: f64,
    /// Keyed by geography id (`na`, `eu`, ...).
    pub geo_factors: BTreeMap<String, f64>,
}

impl Default for SizingConstants {
    fn default() -> Self {
        Self {
            consumer_base: 2_000_000_000.0,
            business_base: 200_000_000.0,
            small_business_max_employees: 50,
            enterprise_min_employees: 1000,
            small_business_share: 0.6,
            mid_market_share: 0.35,
            enterprise_share: 0.05,
            default_avg_price: 1000.0,
            default_market_reach_pct: 25.0,
            default_market_share_pct: 2.0,
            geo_factors: GEO_FACTORS
                .iter()
                .map(|(geo, factor)| (geo.as_str().to_string(), *factor))
                .collect(),
        }
    }
}

impl SizingConstants {
    /// Replaces the region table; an empty table keeps the current one.
    pub fn with_geo_factors(mut self, geo_factors: BTreeMap<String, f64>) -> Self {
        if !geo_factors.is_empty() {
            self.geo_factors = geo_factors;
        }
        self
    }

    /// Reach multiplier for a region; anything outside the table counts as
    /// the whole market.
    pub fn geo_factor(&self, geography: Option<&Geography>) -> f64 {
        geography
            .and_then(|geo| self.geo_factors.get(&geo.as_str().trim().to_ascii_lowercase()))
            .map(|factor| positive(Some(*factor)))
            .unwrap_or(1.0)
    }
}

#[derive(Clone, Debug, Default)]
pub struct TopDownEstimator {
    constants: SizingConstants,
}

impl TopDownEstimator {
    pub fn new(constants: SizingConstants) -> Self {
        Self { constants }
    }

    fn company_size_share(&self, max_employees: u32) -> f64 {
        let constants = &self.constants;
        if max_employees < constants.small_business_max_employees {
            constants.small_business_share
        } else if max_employees > constants.enterprise_min_employees {
            constants.enterprise_share
        } else {
            constants.mid_market_share
        }
    }

    pub fn estimate(
        &self,
        input: &WizardInput,
        benchmark: Option<&IndustryBenchmark>,
    ) -> EstimationResult {
        let constants = &self.constants;

        let user_price = [input.price, input.acv].into_iter().map(positive).find(|v| *v > 0.0);
        let benchmark_price = benchmark
            .map(|industry| positive(Some(industry.metrics.avg_acv)))
            .filter(|v| *v > 0.0)
            .unwrap_or(positive(Some(constants.default_avg_price)));
        let avg_price = user_price.unwrap_or(benchmark_price);

        let customer_type = input.customer_type.as_ref();
        let mut base = if customer_type.is_some_and(CustomerType::is_consumer) {
            constants.consumer_base
        } else {
            constants.business_base
        };
        if let (true, Some(max_employees)) =
            (customer_type.is_some_and(CustomerType::sells_to_business), input.max_employees)
        {
            base *= self.company_size_share(max_employees);
        }

        let geography = input.geography.as_ref();
        let users = positive(Some((base * constants.geo_factor(geography)).floor()));
        let total_addressable_users = users as u64;

        let assumptions = Assumptions {
            avg_price,
            total_addressable_users,
            market_reach: positive(Some(constants.default_market_reach_pct)).min(100.0),
            market_share: positive(Some(constants.default_market_share_pct)).min(100.0),
        };
        let metrics = MarketMetrics::from_assumptions(&assumptions);

        let source = if user_price.is_some() { "User Input" } else { "Industry Benchmark" };
        let region = geography.map(|geo| geo.as_str().to_uppercase()).filter(|g| !g.is_empty());
        let segment =
            customer_type.map(|ct| ct.as_str().to_uppercase()).filter(|s| !s.is_empty());

        let logic_steps = vec![
            format!(
                "Used base annual value of ${} (Source: {source})",
                group_thousands(avg_price)
            ),
            format!(
                "Estimated {} potential customers in {}.",
                group_thousands(total_addressable_users as f64),
                region.as_deref().unwrap_or("GLOBAL")
            ),
            format!("Targeting {} segment.", segment.as_deref().unwrap_or("B2B")),
            format!(
                "SAM assumed at {}% of total market based on typical segmentation.",
                group_thousands(assumptions.market_reach)
            ),
            format!("SOM target set at {}% market share.", group_thousands(assumptions.market_share)),
        ];

        EstimationResult { metrics, assumptions, logic_steps }
    }
}

/// Convenience entry point with the stock constants.
pub fn estimate(input: &WizardInput, benchmark: Option<&IndustryBenchmark>) -> EstimationResult {
    TopDownEstimator::default().estimate(input, benchmark)
}

/// Negative, NaN and infinite inputs count as zero.
fn positive(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}
