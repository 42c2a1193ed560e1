use serde::Serialize;
use tera::{Context, Tera};

use zam_core::domain::estimation::MarketMetrics;
use zam_core::domain::wizard::{MarketContext, WizardInput};
use zam_core::sizing::format::group_thousands;

const TEMPLATE_NAME: &str = "narrative_prompt.txt";
const UNSPECIFIED: &str = "unspecified";

/// Renders the analyst prompt sent to the model.
pub struct PromptRenderer {
    tera: Tera,
}

#[derive(Serialize)]
struct PromptFields<'a> {
    product_name: &'a str,
    value_proposition: &'a str,
    industry: &'a str,
    customer_type: &'a str,
    geography: &'a str,
    price: String,
    pricing_model: &'a str,
    context: Vec<String>,
    tam: String,
    sam: String,
    som: String,
    logic_steps: &'a [String],
}

impl PromptRenderer {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, include_str!("../templates/narrative_prompt.txt"))?;
        Ok(Self { tera })
    }

    pub fn render(
        &self,
        input: &WizardInput,
        metrics: &MarketMetrics,
        logic_steps: &[String],
    ) -> Result<String, tera::Error> {
        let fields = PromptFields {
            product_name: or_unspecified(&input.product_name),
            value_proposition: or_unspecified(&input.value_proposition),
            industry: input.industry.as_deref().unwrap_or(UNSPECIFIED),
            customer_type: input.customer_type.as_ref().map_or(UNSPECIFIED, |ct| ct.as_str()),
            geography: input.geography.as_ref().map_or(UNSPECIFIED, |geo| geo.as_str()),
            price: input
                .price
                .or(input.acv)
                .map_or_else(|| "n/a".to_string(), |amount| format!("${}", group_thousands(amount))),
            pricing_model: input.pricing_model.as_ref().map_or(UNSPECIFIED, |pm| pm.as_str()),
            context: context_lines(&input.context),
            tam: group_thousands(metrics.tam),
            sam: group_thousands(metrics.sam),
            som: group_thousands(metrics.som),
            logic_steps,
        };

        self.tera.render(TEMPLATE_NAME, &Context::from_serialize(fields)?)
    }
}

fn or_unspecified(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        UNSPECIFIED
    } else {
        trimmed
    }
}

fn context_lines(context: &MarketContext) -> Vec<String> {
    let text = [
        ("Buyer persona", &context.buyer_persona),
        ("Sales cycle", &context.sales_cycle),
        ("Acquisition channels", &context.acquisition_channels),
        ("Market maturity", &context.market_maturity),
        ("Competitors", &context.competitors),
        ("Barriers to entry", &context.barriers),
    ];
    let rates = [("Churn rate", context.churn_rate), ("Expansion rate", context.expansion_rate)];

    text.into_iter()
        .filter_map(|(label, value)| value.as_ref().map(|value| format!("{label}: {value}")))
        .chain(rates.into_iter().filter_map(|(label, value)| {
            value.map(|rate| format!("{label}: {}%", group_thousands(rate)))
        }))
        .collect()
}
