use serde::{Deserialize, Serialize};

use crate::domain::estimation::MarketMetrics;

/// Partial assumption overlay proposed by the analyst model. Any field may be
/// missing or null.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedAssumptions {
    #[serde(default)]
    pub avg_price: Option<f64>,
    #[serde(default)]
    pub total_addressable_users: Option<f64>,
    #[serde(default)]
    pub market_reach: Option<f64>,
    #[serde(default)]
    pub market_share: Option<f64>,
}

impl SuggestedAssumptions {
    pub fn is_empty(&self) -> bool {
        self.avg_price.is_none()
            && self.total_addressable_users.is_none()
            && self.market_reach.is_none()
            && self.market_share.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SanityCheck {
    Conservative,
    Realistic,
    Optimistic,
    Demo,
    Unrated(String),
}

impl SanityCheck {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Conservative => "Conservative",
            Self::Realistic => "Realistic",
            Self::Optimistic => "Optimistic",
            Self::Demo => "Demo",
            Self::Unrated(raw) => raw.as_str(),
        }
    }
}

impl From<String> for SanityCheck {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "conservative" => Self::Conservative,
            "realistic" => Self::Realistic,
            "optimistic" => Self::Optimistic,
            "demo" => Self::Demo,
            _ => Self::Unrated(value),
        }
    }
}

impl From<SanityCheck> for String {
    fn from(value: SanityCheck) -> Self {
        value.as_str().to_string()
    }
}

impl Default for SanityCheck {
    fn default() -> Self {
        Self::Unrated(String::new())
    }
}

/// Qualitative analysis returned by the analyst model, or the synthesized
/// placeholder when no model could be reached (`is_mock`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeResult {
    #[serde(default)]
    pub suggested_assumptions: SuggestedAssumptions,
    #[serde(default)]
    pub executive_summary: String,
    #[serde(default)]
    pub market_drivers: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub sanity_check: SanityCheck,
    #[serde(default)]
    pub sanity_check_reason: String,
    #[serde(default)]
    pub is_mock: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
}

pub const PLACEHOLDER_SUMMARY: &str = "AI analysis is temporarily unavailable. Showing demo data.";
pub const PLACEHOLDER_REASON: &str =
    "This is a placeholder analysis because the AI service is temporarily unavailable.";
pub const QUOTA_USER_MESSAGE: &str =
    "The AI analyst has hit its usage limit. Please try again later.";
pub const PLACEHOLDER_DRIVERS: [&str; 3] =
    ["Cloud Adoption Trends", "AI Integration Growth", "Remote Work Expansion"];
pub const PLACEHOLDER_RISKS: [&str; 2] = ["Market Competition", "Regulatory Changes"];

impl NarrativeResult {
    /// Deterministic demo result derived from already computed metrics. The
    /// suggested figures are placeholders; `is_mock` flags them as such.
    pub fn placeholder(metrics: &MarketMetrics, user_message: Option<String>) -> Self {
        Self {
            suggested_assumptions: SuggestedAssumptions {
                avg_price: Some(metrics.tam / 100_000.0),
                total_addressable_users: Some(metrics.tam / 500.0),
                market_reach: Some(20.0),
                market_share: Some(2.0),
            },
            executive_summary: PLACEHOLDER_SUMMARY.to_string(),
            market_drivers: PLACEHOLDER_DRIVERS.iter().map(ToString::to_string).collect(),
            risks: PLACEHOLDER_RISKS.iter().map(ToString::to_string).collect(),
            sanity_check: SanityCheck::Demo,
            sanity_check_reason: PLACEHOLDER_REASON.to_string(),
            is_mock: true,
            user_message,
        }
    }

    /// Mock results carrying a user message are a hard stop for the caller
    /// rather than demo data to blend into the results view.
    pub fn requires_interstitial(&self) -> bool {
        self.is_mock && self.user_message.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::{NarrativeResult, SanityCheck};
    use crate::domain::estimation::MarketMetrics;

    #[test]
    fn placeholder_derives_assumptions_from_tam() {
        let metrics = MarketMetrics { tam: 4_200_000_000.0, sam: 0.0, som: 0.0 };
        let narrative = NarrativeResult::placeholder(&metrics, None);

        assert!(narrative.is_mock);
        assert_eq!(narrative.suggested_assumptions.avg_price, Some(42_000.0));
        assert_eq!(narrative.suggested_assumptions.total_addressable_users, Some(8_400_000.0));
        assert_eq!(narrative.suggested_assumptions.market_reach, Some(20.0));
        assert_eq!(narrative.suggested_assumptions.market_share, Some(2.0));
        assert_eq!(narrative.sanity_check, SanityCheck::Demo);
        assert_eq!(narrative.market_drivers.len(), 3);
        assert_eq!(narrative.risks.len(), 2);
        assert!(!narrative.requires_interstitial());
    }

    #[test]
    fn model_payload_parses_with_nulls_and_unknown_rating() {
        let narrative: NarrativeResult = serde_json::from_str(
            r#"{
                "suggestedAssumptions": {"avgPrice": 1200, "totalAddressableUsers": null},
                "executiveSummary": "Solid niche.",
                "marketDrivers": ["a", "b", "c"],
                "risks": ["x", "y"],
                "sanityCheck": "Aggressive",
                "sanityCheckReason": "Benchmarks are thin."
            }"#,
        )
        .expect("narrative should parse");

        assert_eq!(narrative.suggested_assumptions.avg_price, Some(1200.0));
        assert_eq!(narrative.suggested_assumptions.total_addressable_users, None);
        assert_eq!(narrative.sanity_check, SanityCheck::Unrated("Aggressive".to_string()));
        assert!(!narrative.is_mock);
    }

    #[test]
    fn user_message_is_omitted_when_absent() {
        let narrative = NarrativeResult::placeholder(&MarketMetrics::default(), None);
        let value = serde_json::to_value(&narrative).expect("serialize");
        assert!(value.get("userMessage").is_none());
        assert_eq!(value["isMock"], true);
        assert_eq!(value["sanityCheck"], "Demo");
    }
}
