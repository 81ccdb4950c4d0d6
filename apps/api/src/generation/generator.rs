//! Generator — one LLM request in, one candidate layout tree out.
//!
//! The generator never validates semantically: decode failures are
//! `MalformedResponse`, schema violations are the validator's alone. Keeping
//! one authority per concern anchors repair-loop feedback.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::generation::prompts::{build_layout_prompt, LAYOUT_SYSTEM};
use crate::layout::node::{LayoutNode, LayoutTree, ValidationViolation};
use crate::llm_client::{strip_json_fences, LayoutModel, LlmError};

/// One generator invocation, constructed by the repair loop per attempt.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt_text: String,
    /// 1-based attempt counter.
    pub attempt_number: u32,
    /// Empty on the first attempt.
    pub prior_violations: Vec<ValidationViolation>,
}

/// Generator-level failures. `ModelUnavailable` and `Timeout` are fatal to the
/// workflow; `MalformedResponse` consumes a retry attempt.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("model returned an unparseable layout: {0}")]
    MalformedResponse(String),

    #[error("model call timed out")]
    Timeout,
}

impl GenerationError {
    /// Fatal errors abort the workflow without consuming retry budget.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GenerationError::ModelUnavailable(_) | GenerationError::Timeout
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            GenerationError::MalformedResponse(_) => "MALFORMED_RESPONSE",
            GenerationError::Timeout => "TIMEOUT",
        }
    }
}

/// Issues a single LLM request per `generate` call and parses the response
/// into a candidate tree.
pub struct Generator {
    model: Arc<dyn LayoutModel>,
}

impl Generator {
    pub fn new(model: Arc<dyn LayoutModel>) -> Self {
        Self { model }
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<LayoutTree, GenerationError> {
        let prompt = build_layout_prompt(
            &request.prompt_text,
            request.attempt_number,
            &request.prior_violations,
        );

        debug!(
            "Generating layout (attempt {}, {} prior violations)",
            request.attempt_number,
            request.prior_violations.len()
        );

        let raw = self
            .model
            .complete(&prompt, LAYOUT_SYSTEM)
            .await
            .map_err(map_llm_error)?;

        parse_layout(&raw)
    }
}

fn map_llm_error(error: LlmError) -> GenerationError {
    match error {
        LlmError::Timeout => GenerationError::Timeout,
        LlmError::EmptyContent => {
            GenerationError::MalformedResponse("model returned empty content".to_string())
        }
        other => GenerationError::ModelUnavailable(other.to_string()),
    }
}

/// Decodes raw model output into a tree. Invalid JSON, a missing `kind`, or
/// wrong top-level types are `MalformedResponse` — never a validator concern.
pub fn parse_layout(raw: &str) -> Result<LayoutTree, GenerationError> {
    let payload = strip_json_fences(raw);
    let root: LayoutNode = serde_json::from_str(payload)
        .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;
    Ok(LayoutTree::new(root))
}
