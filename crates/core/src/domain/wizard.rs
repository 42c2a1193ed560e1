use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Raw answers collected by the sizing wizard.
///
/// Every field is optional on the wire: the estimator substitutes defaults for
/// anything missing, and numeric fields accept either JSON numbers or the
/// numeric strings a browser form posts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardInput {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub value_proposition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing_model: Option<PricingModel>,
    #[serde(default, deserialize_with = "lenient_amount", skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount", skip_serializing_if = "Option::is_none")]
    pub acv: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount", skip_serializing_if = "Option::is_none")]
    pub fees: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_type: Option<CustomerType>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geography: Option<Geography>,
    #[serde(
        default,
        alias = "employees",
        deserialize_with = "lenient_headcount",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_employees: Option<u32>,
    #[serde(flatten)]
    pub context: MarketContext,
}

/// Go-to-market and competitive context from the later wizard steps. Only
/// used to enrich the analyst prompt; the estimator ignores it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketContext {
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub buyer_persona: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub sales_cycle: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub acquisition_channels: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount", skip_serializing_if = "Option::is_none")]
    pub churn_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount", skip_serializing_if = "Option::is_none")]
    pub expansion_rate: Option<f64>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub market_maturity: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub competitors: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub barriers: Option<String>,
}

impl MarketContext {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

macro_rules! open_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            /// A value outside the known option list, kept verbatim.
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $wire,)+
                    Self::Other(raw) => raw.as_str(),
                }
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                match value.trim().to_ascii_lowercase().as_str() {
                    $($wire => Self::$variant,)+
                    _ => Self::Other(value),
                }
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::from(value.to_string())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

open_enum! {
    PricingModel {
        Subscription => "subscription",
        Usage => "usage",
        OneTime => "one_time",
        Marketplace => "marketplace",
    }
}

open_enum! {
    CustomerType {
        B2b => "b2b",
        B2c => "b2c",
        B2b2c => "b2b2c",
        Marketplace => "marketplace",
    }
}

open_enum! {
    Geography {
        Global => "global",
        Na => "na",
        Eu => "eu",
        Apac => "apac",
        Latam => "latam",
        Mea => "mea",
    }
}

impl CustomerType {
    pub fn is_consumer(&self) -> bool {
        matches!(self, Self::B2c)
    }

    /// Business-facing segments get company-size segmentation.
    pub fn sells_to_business(&self) -> bool {
        self.as_str().to_ascii_lowercase().contains("b2b")
    }
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

fn lenient_headcount<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(number_from_value)
        .filter(|count| count.is_finite() && *count >= 1.0)
        .map(|count| count.floor().min(f64::from(u32::MAX)) as u32))
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|text| !text.trim().is_empty()))
}

fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }
}
