//! Narrative refinement: asks a generative model to critique the baseline
//! market size, suggest better assumptions and write the qualitative summary.
//!
//! The model never decides the final figures. Its suggestions are merged by
//! `zam_core::sizing::reconcile`, and every failure degrades to a flagged
//! placeholder instead of an error.

pub mod gemini;
pub mod llm;
pub mod prompt;
pub mod refiner;

pub use gemini::GeminiClient;
pub use llm::{LlmClient, LlmError};
pub use prompt::PromptRenderer;
pub use refiner::{NarrativeRefiner, Refinement, RefinerPolicy};
