use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use zam_core::config::LlmConfig;
use zam_core::domain::estimation::MarketMetrics;
use zam_core::domain::narrative::{NarrativeResult, QUOTA_USER_MESSAGE};
use zam_core::domain::wizard::WizardInput;

use crate::llm::{LlmClient, LlmError};
use crate::prompt::PromptRenderer;

/// Ordered model chain plus the retry and time bounds applied to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefinerPolicy {
    pub models: Vec<String>,
    /// Extra attempts per model after the first one fails.
    pub retries_per_model: u32,
    pub rate_limit_backoff: Duration,
    /// Soft ceiling for the whole chain; past it the placeholder is returned.
    pub deadline: Duration,
}

impl Default for RefinerPolicy {
    fn default() -> Self {
        Self {
            models: zam_core::config::DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            retries_per_model: 1,
            rate_limit_backoff: Duration::from_millis(1000),
            deadline: Duration::from_secs(45),
        }
    }
}

impl From<&LlmConfig> for RefinerPolicy {
    fn from(config: &LlmConfig) -> Self {
        Self {
            models: config
                .models
                .iter()
                .map(|model| model.trim().to_string())
                .filter(|model| !model.is_empty())
                .collect(),
            retries_per_model: config.retries_per_model,
            rate_limit_backoff: Duration::from_millis(config.rate_limit_backoff_ms),
            deadline: Duration::from_secs(config.deadline_secs),
        }
    }
}

/// What `refine` produced and how it got there.
#[derive(Clone, Debug, PartialEq)]
pub struct Refinement {
    pub narrative: NarrativeResult,
    /// Model that answered; `None` when the placeholder was synthesized.
    pub served_by: Option<String>,
    pub attempts: u32,
}

impl Refinement {
    pub fn is_fallback(&self) -> bool {
        self.served_by.is_none()
    }
}

#[derive(Debug, Default)]
struct ChainTrace {
    attempts: u32,
    rate_limited: bool,
    failures: Vec<String>,
}

enum AttemptFailure {
    ModelUnavailable,
    RateLimited,
    Other,
}

pub struct NarrativeRefiner {
    client: Arc<dyn LlmClient>,
    prompts: PromptRenderer,
    policy: RefinerPolicy,
}

impl NarrativeRefiner {
    pub fn new(
        client: Arc<dyn LlmClient>,
        policy: RefinerPolicy,
    ) -> Result<Self, tera::Error> {
        Ok(Self { client, prompts: PromptRenderer::new()?, policy })
    }

    pub fn policy(&self) -> &RefinerPolicy {
        &self.policy
    }

    /// Never fails: exhaustion, deadline and prompt errors all end in the
    /// flagged placeholder derived from `metrics`.
    pub async fn refine(
        &self,
        input: &WizardInput,
        metrics: &MarketMetrics,
        logic_steps: &[String],
    ) -> Refinement {
        let prompt = match self.prompts.render(input, metrics, logic_steps) {
            Ok(prompt) => prompt,
            Err(error) => {
                warn!(event_name = "refiner.prompt.render_failed", error = %error, "prompt rendering failed");
                return placeholder(metrics, &ChainTrace::default());
            }
        };

        let mut trace = ChainTrace::default();
        let outcome =
            tokio::time::timeout(self.policy.deadline, self.run_chain(&prompt, &mut trace)).await;

        match outcome {
            Ok(Some((model, narrative))) => {
                info!(
                    event_name = "refiner.chain.succeeded",
                    model = %model,
                    attempts = trace.attempts,
                    "model refinement succeeded"
                );
                Refinement { narrative, served_by: Some(model), attempts: trace.attempts }
            }
            Ok(None) => {
                warn!(
                    event_name = "refiner.chain.exhausted",
                    attempts = trace.attempts,
                    rate_limited = trace.rate_limited,
                    failures = ?trace.failures,
                    "all models failed, returning placeholder"
                );
                placeholder(metrics, &trace)
            }
            Err(_) => {
                warn!(
                    event_name = "refiner.chain.deadline_exceeded",
                    deadline_ms = self.policy.deadline.as_millis() as u64,
                    attempts = trace.attempts,
                    "refinement deadline exceeded, returning placeholder"
                );
                placeholder(metrics, &trace)
            }
        }
    }

    /// Walks `(model_index, retries_left)`; returns the first parsed answer.
    async fn run_chain(
        &self,
        prompt: &str,
        trace: &mut ChainTrace,
    ) -> Option<(String, NarrativeResult)> {
        let models = &self.policy.models;
        let mut model_index = 0;
        let mut retries_left = self.policy.retries_per_model;

        while let Some(model) = models.get(model_index) {
            trace.attempts += 1;
            info!(
                event_name = "refiner.attempt.started",
                model = %model,
                attempt = trace.attempts,
                "requesting model refinement"
            );

            let failure = match self.attempt(model, prompt).await {
                Ok(narrative) => return Some((model.clone(), narrative)),
                Err((failure, detail)) => {
                    warn!(
                        event_name = "refiner.attempt.failed",
                        model = %model,
                        attempt = trace.attempts,
                        error = %detail,
                        "model attempt failed"
                    );
                    trace.failures.push(format!("{model}: {detail}"));
                    failure
                }
            };

            match failure {
                AttemptFailure::ModelUnavailable => {}
                AttemptFailure::RateLimited => {
                    trace.rate_limited = true;
                    if retries_left > 0 {
                        tokio::time::sleep(self.policy.rate_limit_backoff).await;
                    }
                }
                AttemptFailure::Other => {}
            }

            let retry_same_model =
                !matches!(failure, AttemptFailure::ModelUnavailable) && retries_left > 0;
            if retry_same_model {
                retries_left -= 1;
            } else {
                model_index += 1;
                retries_left = self.policy.retries_per_model;
            }
        }

        None
    }

    async fn attempt(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<NarrativeResult, (AttemptFailure, String)> {
        let raw = self.client.generate(model, prompt).await.map_err(|error| {
            let failure = match error {
                LlmError::ModelNotFound { .. } => AttemptFailure::ModelUnavailable,
                LlmError::RateLimited(_) => AttemptFailure::RateLimited,
                LlmError::Transport(_) | LlmError::Upstream { .. } | LlmError::InvalidResponse(_) => {
                    AttemptFailure::Other
                }
            };
            (failure, error.to_string())
        })?;

        parse_narrative(&raw)
            .map_err(|error| (AttemptFailure::Other, format!("malformed JSON: {error}")))
    }
}

/// Drops Markdown code-fence markers around the model's JSON.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```JSON"))
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open.strip_suffix("```").unwrap_or(without_open).trim()
}

pub fn parse_narrative(raw: &str) -> Result<NarrativeResult, serde_json::Error> {
    serde_json::from_str(strip_code_fences(raw))
}

fn placeholder(metrics: &MarketMetrics, trace: &ChainTrace) -> Refinement {
    let user_message = trace.rate_limited.then(|| QUOTA_USER_MESSAGE.to_string());
    Refinement {
        narrative: NarrativeResult::placeholder(metrics, user_message),
        served_by: None,
        attempts: trace.attempts,
    }
}
