use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use zam_core::config::{AppConfig, LoadOptions};
use zam_core::sizing::{self, SizingConstants};
use zam_core::{EstimationResult, ReferenceSnapshot, WizardInput};

use crate::commands::CommandResult;

/// Accepts either bare wizard answers or the `{ "formData": ... }` envelope the HTTP API uses.
#[derive(Deserialize)]
#[serde(untagged)]
enum EstimateInput {
    Envelope {
        #[serde(rename = "formData")]
        form_data: WizardInput,
    },
    Bare(WizardInput),
}

pub fn run(input: &Path) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "estimate",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            )
        }
    };

    match estimate_file(input, &config.sizing) {
        Ok(result) => {
            let message = format!(
                "TAM {} / SAM {} / SOM {}",
                sizing::format_currency(result.metrics.tam),
                sizing::format_currency(result.metrics.sam),
                sizing::format_currency(result.metrics.som),
            );
            match serde_json::to_value(&result) {
                Ok(data) => CommandResult::success_with_data("estimate", message, Some(data)),
                Err(error) => {
                    CommandResult::failure("estimate", "serialization", error.to_string(), 3)
                }
            }
        }
        Err(error) => CommandResult::failure("estimate", "invalid_input", format!("{error:#}"), 2),
    }
}

fn estimate_file(input: &Path, constants: &SizingConstants) -> Result<EstimationResult> {
    let raw = fs::read_to_string(input)
        .with_context(|| format!("failed to read wizard input {}", input.display()))?;
    let parsed: EstimateInput = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid wizard payload", input.display()))?;
    let wizard = match parsed {
        EstimateInput::Envelope { form_data } => form_data,
        EstimateInput::Bare(wizard) => wizard,
    };

    Ok(ReferenceSnapshot::builtin().estimate(&wizard, constants))
}
