use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::estimation::{Assumptions, MarketMetrics};
use crate::domain::narrative::NarrativeResult;
use crate::domain::wizard::WizardInput;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisId(pub String);

impl AnalysisId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }
}

/// Opaque client-generated token that groups saved analyses. It is not an
/// authenticated identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvariantViolation("device id is required".to_string()));
        }
        if trimmed.len() > 128 {
            return Err(DomainError::InvariantViolation(
                "device id must be at most 128 characters".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Payload of an explicit "save" action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnalysis {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub inputs: WizardInput,
    #[serde(default)]
    pub metrics: MarketMetrics,
    #[serde(default)]
    pub assumptions: Option<Assumptions>,
    #[serde(default)]
    pub ai_analysis: Option<NarrativeResult>,
    #[serde(default)]
    pub logic_steps: Vec<String>,
}

impl NewAnalysis {
    /// Trims the product name and mirrors it into the input snapshot.
    pub fn normalized(mut self) -> Result<Self, DomainError> {
        let name = self.product_name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::InvariantViolation("productName is required".to_string()));
        }
        self.inputs.product_name = name.clone();
        self.product_name = name;
        Ok(self)
    }

    pub fn into_analysis(self, device_id: DeviceId, created_at: DateTime<Utc>) -> Analysis {
        Analysis {
            id: AnalysisId::generate(),
            product_name: self.product_name,
            created_at,
            device_id,
            inputs: self.inputs,
            metrics: self.metrics,
            assumptions: self.assumptions,
            ai_analysis: self.ai_analysis,
            logic_steps: self.logic_steps,
        }
    }
}

/// A saved estimate. Never updated in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub id: AnalysisId,
    pub product_name: String,
    pub created_at: DateTime<Utc>,
    pub device_id: DeviceId,
    pub inputs: WizardInput,
    pub metrics: MarketMetrics,
    pub assumptions: Option<Assumptions>,
    pub ai_analysis: Option<NarrativeResult>,
    pub logic_steps: Vec<String>,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{DeviceId, NewAnalysis};
    use crate::errors::DomainError;

    #[test]
    fn device_id_rejects_blank_tokens() {
        let error = DeviceId::parse("   ").expect_err("blank device id");
        assert!(matches!(error, DomainError::InvariantViolation(_)));
        assert_eq!(DeviceId::parse(" dev_abc ").expect("valid").as_str(), "dev_abc");
    }

    #[test]
    fn save_payload_trims_and_mirrors_product_name() {
        let payload: NewAnalysis =
            serde_json::from_str(r#"{"productName":"  Ledgerly  ","metrics":{"tam":1,"sam":1,"som":1}}"#)
                .expect("payload should parse");

        let normalized = payload.normalized().expect("name present");
        assert_eq!(normalized.product_name, "Ledgerly");
        assert_eq!(normalized.inputs.product_name, "Ledgerly");

        let analysis =
            normalized.into_analysis(DeviceId::parse("dev_1").expect("device"), Utc::now());
        assert_eq!(analysis.device_id.as_str(), "dev_1");
        assert!(!analysis.id.0.is_empty());
    }

    #[test]
    fn save_payload_without_name_is_rejected() {
        let payload: NewAnalysis = serde_json::from_str("{}").expect("payload should parse");
        assert!(payload.normalized().is_err());
    }
}
