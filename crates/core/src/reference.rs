//! Reference data: industry benchmarks, public comparables, and the option
//! lists that drive the wizard.
//!
//! The built-in seed doubles as the fallback whenever the store cannot be
//! read, so the wizard never blocks on it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::estimation::EstimationResult;
use crate::domain::reference::{
    BenchmarkMetrics, CompanyMetrics, ComparableCompany, ConstantList, EnumOption,
    IndustryBenchmark,
};
use crate::domain::wizard::{Geography, WizardInput};
use crate::sizing::estimator::{SizingConstants, TopDownEstimator, GEO_FACTORS};

pub const PRICING_MODELS: &str = "PRICING_MODELS";
pub const CUSTOMER_TYPES: &str = "CUSTOMER_TYPES";
pub const GEOGRAPHIES: &str = "GEOGRAPHIES";
pub const MARKET_MATURITY: &str = "MARKET_MATURITY";

/// Where a snapshot came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSource {
    Store,
    BuiltinSeed,
}

/// Frozen view of all reference data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSnapshot {
    pub source: ReferenceSource,
    pub industries: Vec<IndustryBenchmark>,
    pub comparables: Vec<ComparableCompany>,
    pub constants: Vec<ConstantList>,
}

impl ReferenceSnapshot {
    pub fn builtin() -> Self {
        Self {
            source: ReferenceSource::BuiltinSeed,
            industries: seed_industries(),
            comparables: seed_comparables(),
            constants: seed_constants(),
        }
    }

    pub fn from_store(
        industries: Vec<IndustryBenchmark>,
        comparables: Vec<ComparableCompany>,
        constants: Vec<ConstantList>,
    ) -> Self {
        Self { source: ReferenceSource::Store, industries, comparables, constants }
    }

    /// A store that was never seeded yields an empty snapshot.
    pub fn is_empty(&self) -> bool {
        self.industries.is_empty() && self.constants.is_empty()
    }

    pub fn industry_benchmark(&self, key: &str) -> Option<&IndustryBenchmark> {
        let key = key.trim();
        self.industries.iter().find(|industry| industry.key == key)
    }

    pub fn comparables_for(&self, industry: Option<&str>) -> Vec<ComparableCompany> {
        self.comparables
            .iter()
            .filter(|company| industry.map_or(true, |key| company.industry == key))
            .cloned()
            .collect()
    }

    pub fn enum_options(&self, list: &str) -> &[EnumOption] {
        self.constants
            .iter()
            .find(|constant| constant.key == list)
            .map(|constant| constant.items.as_slice())
            .unwrap_or(&[])
    }

    /// `{KEY: [items]}` as served to the wizard.
    pub fn constant_map(&self) -> BTreeMap<String, Vec<EnumOption>> {
        self.constants
            .iter()
            .map(|constant| (constant.key.clone(), constant.items.clone()))
            .collect()
    }

    /// Geography reach factors; falls back to the fixed table when the
    /// `GEOGRAPHIES` list carries none.
    pub fn geo_factors(&self) -> BTreeMap<String, f64> {
        let from_list: BTreeMap<String, f64> = self
            .enum_options(GEOGRAPHIES)
            .iter()
            .filter_map(|option| option.factor.map(|factor| (option.value.clone(), factor)))
            .collect();
        if !from_list.is_empty() {
            return from_list;
        }
        GEO_FACTORS.iter().map(|(geo, factor)| (geo.as_str().to_string(), *factor)).collect()
    }

    /// Baseline estimate using this snapshot's industry benchmark and region
    /// factors on top of `constants`.
    pub fn estimate(&self, input: &WizardInput, constants: &SizingConstants) -> EstimationResult {
        let benchmark = input.industry.as_deref().and_then(|key| self.industry_benchmark(key));
        let constants = constants.clone().with_geo_factors(self.geo_factors());
        TopDownEstimator::new(constants).estimate(input, benchmark)
    }
}

fn industry(
    key: &str,
    name: &str,
    description: &str,
    metrics: (f64, f64, f64),
    naics: &str,
) -> IndustryBenchmark {
    let (avg_acv, churn_rate, growth_rate) = metrics;
    IndustryBenchmark {
        key: key.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        metrics: BenchmarkMetrics { avg_acv, churn_rate, growth_rate },
        naics_codes: vec![naics.to_string()],
    }
}

pub fn seed_industries() -> Vec<IndustryBenchmark> {
    vec![
        industry(
            "saas_horizontal",
            "SaaS (Horizontal)",
            "General purpose software (CRM, HR, Productivity)",
            (25_000.0, 0.10, 0.15),
            "511210",
        ),
        industry(
            "saas_vertical",
            "SaaS (Vertical)",
            "Industry-specific software (Construction, Healthcare, Legal)",
            (45_000.0, 0.08, 0.12),
            "511210",
        ),
        industry(
            "fintech",
            "Fintech & Payments",
            "Financial technology, payment processing",
            (15_000.0, 0.15, 0.22),
            "522320",
        ),
        industry(
            "ecommerce",
            "E-commerce & Retail",
            "Online retail and marketplaces",
            (120.0, 0.40, 0.10),
            "454110",
        ),
        industry(
            "digital_health",
            "Digital Health",
            "Health tech, telemedicine, patient engagement",
            (8_500.0, 0.12, 0.18),
            "621999",
        ),
    ]
}

fn company(
    name: &str,
    ticker: &str,
    industry: &str,
    description: &str,
    metrics: CompanyMetrics,
    model: &str,
) -> ComparableCompany {
    ComparableCompany {
        name: name.to_string(),
        ticker: Some(ticker.to_string()),
        industry: industry.to_string(),
        description: Some(description.to_string()),
        metrics,
        model: Some(model.to_string()),
    }
}

pub fn seed_comparables() -> Vec<ComparableCompany> {
    vec![
        company(
            "Salesforce",
            "CRM",
            "saas_horizontal",
            "Cloud-based CRM including Sales Cloud, Service Cloud, Marketing Cloud.",
            CompanyMetrics {
                revenue: 34_800_000_000.0,
                growth: 0.11,
                customers: 150_000,
                acv: 232_000.0,
            },
            "subscription",
        ),
        company(
            "HubSpot",
            "HUBS",
            "saas_horizontal",
            "Inbound marketing, sales, and service software for small and medium businesses.",
            CompanyMetrics {
                revenue: 2_170_000_000.0,
                growth: 0.25,
                customers: 205_000,
                acv: 11_500.0,
            },
            "subscription",
        ),
        company(
            "Shopify",
            "SHOP",
            "ecommerce",
            "Commerce platform allowing merchants to set up online stores.",
            CompanyMetrics {
                revenue: 7_100_000_000.0,
                growth: 0.26,
                customers: 2_000_000,
                acv: 3_550.0,
            },
            "subscription + usage",
        ),
        company(
            "Stripe",
            "PRIVATE",
            "fintech",
            "Financial infrastructure platform for the internet.",
            CompanyMetrics {
                revenue: 14_000_000_000.0,
                growth: 0.18,
                customers: 3_000_000,
                acv: 4_600.0,
            },
            "usage",
        ),
        company(
            "Veeva Systems",
            "VEEV",
            "saas_vertical",
            "Cloud-based software for the global life sciences industry.",
            CompanyMetrics {
                revenue: 2_400_000_000.0,
                growth: 0.16,
                customers: 1_400,
                acv: 1_700_000.0,
            },
            "subscription",
        ),
    ]
}

fn geography_label(geography: &Geography) -> &'static str {
    match geography {
        Geography::Global => "Global",
        Geography::Na => "North America",
        Geography::Eu => "Europe",
        Geography::Apac => "Asia Pacific",
        Geography::Latam => "Latin America",
        Geography::Mea => "Middle East & Africa",
        Geography::Other(_) => "Other",
    }
}

pub fn seed_constants() -> Vec<ConstantList> {
    vec![
        ConstantList {
            key: PRICING_MODELS.to_string(),
            items: vec![
                EnumOption::new("subscription", "Subscription / SaaS"),
                EnumOption::new("usage", "Usage-Based / Transactional"),
                EnumOption::new("one_time", "One-Time License / Purchase"),
                EnumOption::new("marketplace", "Marketplace Commission"),
            ],
        },
        ConstantList {
            key: CUSTOMER_TYPES.to_string(),
            items: vec![
                EnumOption::new("b2b", "B2B (Business to Business)"),
                EnumOption::new("b2c", "B2C (Business to Consumer)"),
                EnumOption::new("b2b2c", "B2B2C"),
                EnumOption::new("marketplace", "Marketplace (Two-sided)"),
            ],
        },
        ConstantList {
            key: GEOGRAPHIES.to_string(),
            items: GEO_FACTORS
                .iter()
                .map(|(geo, factor)| EnumOption::weighted(geo.as_str(), geography_label(geo), *factor))
                .collect(),
        },
        ConstantList {
            key: MARKET_MATURITY.to_string(),
            items: vec![
                EnumOption::new("emerging", "Emerging (High Growth, High Risk)"),
                EnumOption::new("growth", "Growth (Proven, Competitive)"),
                EnumOption::new("mature", "Mature (Stable, Saturation)"),
                EnumOption::new("declining", "Declining (Consolidation)"),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::{ReferenceSnapshot, ReferenceSource, CUSTOMER_TYPES, GEOGRAPHIES};
    use crate::domain::reference::{ConstantList, EnumOption};
    use crate::domain::wizard::{CustomerType, Geography, WizardInput};
    use crate::sizing::estimator::SizingConstants;

    #[test]
    fn builtin_snapshot_resolves_benchmarks_by_key() {
        let snapshot = ReferenceSnapshot::builtin();

        assert_eq!(snapshot.source, ReferenceSource::BuiltinSeed);
        let fintech = snapshot.industry_benchmark("fintech").expect("fintech seeded");
        assert_eq!(fintech.metrics.avg_acv, 15_000.0);
        assert!(snapshot.industry_benchmark("quantum_widgets").is_none());
    }

    #[test]
    fn geo_factors_come_from_geography_list() {
        let factors = ReferenceSnapshot::builtin().geo_factors();

        assert_eq!(factors.len(), 6);
        assert_eq!(factors["na"], 0.35);
        assert_eq!(factors["global"], 1.0);
        let regional: f64 =
            factors.iter().filter(|(geo, _)| geo.as_str() != "global").map(|(_, f)| f).sum();
        assert!((regional - 1.0).abs() < 1e-9, "regions should sum to ~1.0, got {regional}");
    }

    #[test]
    fn comparables_filter_by_industry() {
        let snapshot = ReferenceSnapshot::builtin();

        assert_eq!(snapshot.comparables_for(None).len(), 5);
        let horizontal = snapshot.comparables_for(Some("saas_horizontal"));
        assert_eq!(horizontal.len(), 2);
        assert!(horizontal.iter().all(|company| company.industry == "saas_horizontal"));
    }

    #[test]
    fn option_lists_keep_declared_order() {
        let snapshot = ReferenceSnapshot::builtin();
        let values: Vec<&str> =
            snapshot.enum_options(CUSTOMER_TYPES).iter().map(|o| o.value.as_str()).collect();

        assert_eq!(values, vec!["b2b", "b2c", "b2b2c", "marketplace"]);
        assert_eq!(snapshot.enum_options(GEOGRAPHIES)[1].label, "North America");
        assert!(snapshot.enum_options("UNKNOWN").is_empty());
    }

    fn na_small_business() -> WizardInput {
        WizardInput {
            price: Some(100.0),
            customer_type: Some(CustomerType::B2b),
            geography: Some(Geography::Na),
            max_employees: Some(20),
            ..WizardInput::default()
        }
    }

    #[test]
    fn stored_geography_factors_drive_the_estimate() {
        let snapshot = ReferenceSnapshot::from_store(
            Vec::new(),
            Vec::new(),
            vec![ConstantList {
                key: GEOGRAPHIES.to_string(),
                items: vec![
                    EnumOption::weighted("global", "Global", 1.0),
                    EnumOption::weighted("na", "North America", 0.5),
                ],
            }],
        );

        let stored = snapshot.estimate(&na_small_business(), &SizingConstants::default());
        let builtin =
            ReferenceSnapshot::builtin().estimate(&na_small_business(), &SizingConstants::default());

        assert_eq!(stored.assumptions.total_addressable_users, 60_000_000);
        assert_eq!(builtin.assumptions.total_addressable_users, 42_000_000);
    }

    #[test]
    fn snapshot_estimate_uses_industry_benchmark() {
        let input =
            WizardInput { price: None, industry: Some("fintech".to_string()), ..na_small_business() };
        let result = ReferenceSnapshot::builtin().estimate(&input, &SizingConstants::default());

        assert_eq!(result.assumptions.avg_price, 15_000.0);
        assert_eq!(result.logic_steps[0], "Used base annual value of $15,000 (Source: Industry Benchmark)");
    }
}
