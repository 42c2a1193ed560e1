use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkMetrics {
    pub avg_acv: f64,
    pub churn_rate: f64,
    pub growth_rate: f64,
}

/// Industry reference record. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndustryBenchmark {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub metrics: BenchmarkMetrics,
    #[serde(default)]
    pub naics_codes: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyMetrics {
    pub revenue: f64,
    pub growth: f64,
    pub customers: u64,
    pub acv: f64,
}

/// Public comparable shown alongside an estimate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparableCompany {
    pub name: String,
    pub ticker: Option<String>,
    pub industry: String,
    pub description: Option<String>,
    pub metrics: CompanyMetrics,
    pub model: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnumOption {
    pub value: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factor: Option<f64>,
}

impl EnumOption {
    pub fn new(value: &str, label: &str) -> Self {
        Self { value: value.to_string(), label: label.to_string(), factor: None }
    }

    pub fn weighted(value: &str, label: &str, factor: f64) -> Self {
        Self { value: value.to_string(), label: label.to_string(), factor: Some(factor) }
    }
}

/// Named option list, e.g. `GEOGRAPHIES`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstantList {
    pub key: String,
    pub items: Vec<EnumOption>,
}
