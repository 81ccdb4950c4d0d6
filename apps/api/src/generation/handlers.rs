//! Axum route handlers for the layout generation API.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::figma::FigmaReceipt;
use crate::generation::generator::Generator;
use crate::generation::workflow::{RepairLoop, WorkflowReport};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateLayoutRequest {
    pub prompt: String,
    /// Optional per-request override of the repair-loop budget.
    pub retry_limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct GenerateLayoutResponse {
    pub request_id: Uuid,
    #[serde(flatten)]
    pub report: WorkflowReport,
    /// Present only when Figma export is configured and succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub figma: Option<FigmaReceipt>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/generate
///
/// Runs one repair-loop workflow for the prompt. 200 with the artifact on
/// success; 422 with the outstanding violations when the budget is exhausted;
/// 502/504 when the model is unavailable or timed out.
pub async fn handle_generate_layout(
    State(state): State<AppState>,
    Json(request): Json<GenerateLayoutRequest>,
) -> Result<(StatusCode, Json<GenerateLayoutResponse>), AppError> {
    if request.prompt.trim().is_empty() {
        return Err(AppError::Validation("prompt cannot be empty".to_string()));
    }

    let request_id = Uuid::new_v4();
    let retry_limit = request.retry_limit.unwrap_or(state.config.retry_limit);

    info!(
        "[{request_id}] Generating layout (retry_limit={retry_limit}): {}",
        request.prompt.chars().take(80).collect::<String>()
    );

    let workflow = RepairLoop::new(Generator::new(state.model.clone()), retry_limit);
    let report = workflow.run(&request.prompt).await;

    // Export never changes the workflow's classification (collaborator rule).
    let figma = match (&state.figma, report.is_succeeded(), &report.artifact) {
        (Some(client), true, Some(artifact)) => match client.export(artifact).await {
            Ok(receipt) => Some(receipt),
            Err(e) => {
                warn!("[{request_id}] Figma export failed: {e}");
                None
            }
        },
        _ => None,
    };

    let status = response_status(&report);
    Ok((
        status,
        Json(GenerateLayoutResponse {
            request_id,
            report,
            figma,
        }),
    ))
}

fn response_status(report: &WorkflowReport) -> StatusCode {
    if report.is_succeeded() {
        return StatusCode::OK;
    }
    match report.error.as_ref().map(|e| e.kind) {
        Some("TIMEOUT") => StatusCode::GATEWAY_TIMEOUT,
        Some(_) => StatusCode::BAD_GATEWAY,
        None => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::workflow::{GenerationFailure, WorkflowStatus};

    fn report(status: WorkflowStatus, error: Option<GenerationFailure>) -> WorkflowReport {
        WorkflowReport {
            status,
            attempts: 1,
            artifact: None,
            violations: vec![],
            error,
        }
    }

    #[test]
    fn test_succeeded_maps_to_200() {
        let r = report(WorkflowStatus::Succeeded, None);
        assert_eq!(response_status(&r), StatusCode::OK);
    }

    #[test]
    fn test_violation_failure_maps_to_422() {
        let r = report(WorkflowStatus::Failed, None);
        assert_eq!(response_status(&r), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_timeout_maps_to_504() {
        let r = report(
            WorkflowStatus::Failed,
            Some(GenerationFailure {
                kind: "TIMEOUT",
                message: "model call timed out".to_string(),
            }),
        );
        assert_eq!(response_status(&r), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_model_unavailable_maps_to_502() {
        let r = report(
            WorkflowStatus::Failed,
            Some(GenerationFailure {
                kind: "MODEL_UNAVAILABLE",
                message: "overloaded".to_string(),
            }),
        );
        assert_eq!(response_status(&r), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_request_deserializes_without_retry_limit() {
        let json = r#"{"prompt": "A login form"}"#;
        let request: GenerateLayoutRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.prompt, "A login form");
        assert!(request.retry_limit.is_none());
    }
}
