//! Repair Loop — the bounded generate → validate → re-prompt workflow.
//!
//! # State machine
//! - `Drafting → Validating`: generator produced a candidate tree.
//! - `Drafting → Failed`: fatal `GenerationError` (ModelUnavailable, Timeout) —
//!   surfaced immediately, no budget consumed.
//! - `Validating → Succeeded`: empty violation list.
//! - `Validating → Drafting`: violations present, attempt < retry limit; the
//!   next request carries `attempt + 1` and the full violation list.
//! - `Validating → Failed`: violations present at the retry limit. The caller
//!   receives the last candidate plus its outstanding violations — best-effort
//!   output is always distinguishable from validated output.
//!
//! A `MalformedResponse` consumes an attempt as a single UNPARSEABLE_OUTPUT
//! violation. The budget is enforced exactly: never more than `retry_limit`
//! generator invocations.
//!
//! Each run owns its trees, violations, and requests; nothing is shared across
//! workflow instances. Dropping the future (caller cancellation) abandons the
//! in-flight model call without producing a partial artifact.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::generation::generator::{GenerationError, GenerationRequest, Generator};
use crate::layout::node::{LayoutTree, ValidationViolation, ViolationRule};
use crate::layout::{format, validate, OutputArtifact};

/// Default generator-invocation budget per request.
pub const DEFAULT_RETRY_LIMIT: u32 = 3;
/// Upper bound for per-request overrides.
pub const MAX_RETRY_LIMIT: u32 = 10;

/// Clamps a requested override into the supported budget range.
pub fn clamp_retry_limit(requested: u32) -> u32 {
    requested.clamp(1, MAX_RETRY_LIMIT)
}

/// Terminal classification of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Succeeded,
    Failed,
}

/// Serializable generator failure attached to failed reports.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationFailure {
    pub kind: &'static str,
    pub message: String,
}

impl From<&GenerationError> for GenerationFailure {
    fn from(error: &GenerationError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// What every caller receives — a structured report, never a bare error.
#[derive(Debug, Serialize)]
pub struct WorkflowReport {
    pub status: WorkflowStatus,
    /// Completed generator invocations (budget consumed).
    pub attempts: u32,
    /// Present on success; on failure, the best-effort last candidate if one parsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<OutputArtifact>,
    /// Outstanding violations; empty on success.
    pub violations: Vec<ValidationViolation>,
    /// Present only when a fatal generator error ended the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<GenerationFailure>,
}

impl WorkflowReport {
    pub fn is_succeeded(&self) -> bool {
        self.status == WorkflowStatus::Succeeded
    }
}

enum WorkflowState {
    Drafting {
        attempt: u32,
        prior: Vec<ValidationViolation>,
    },
    Validating {
        attempt: u32,
        tree: LayoutTree,
    },
    Succeeded {
        attempts: u32,
        tree: LayoutTree,
    },
    Failed {
        attempts: u32,
        violations: Vec<ValidationViolation>,
        error: Option<GenerationError>,
    },
}

/// One repair loop instance. Constructed per request; holds no shared state.
pub struct RepairLoop {
    generator: Generator,
    retry_limit: u32,
}

impl RepairLoop {
    pub fn new(generator: Generator, retry_limit: u32) -> Self {
        Self {
            generator,
            retry_limit: clamp_retry_limit(retry_limit),
        }
    }

    pub async fn run(&self, prompt_text: &str) -> WorkflowReport {
        let mut last_candidate: Option<LayoutTree> = None;
        let mut state = WorkflowState::Drafting {
            attempt: 1,
            prior: Vec::new(),
        };

        loop {
            state = match state {
                WorkflowState::Drafting { attempt, prior } => {
                    debug!("Workflow state: Drafting (attempt {attempt}/{})", self.retry_limit);
                    let request = GenerationRequest {
                        prompt_text: prompt_text.to_string(),
                        attempt_number: attempt,
                        prior_violations: prior.clone(),
                    };

                    match self.generator.generate(&request).await {
                        Ok(tree) => WorkflowState::Validating { attempt, tree },
                        Err(error) if error.is_fatal() => {
                            warn!("Workflow aborted: {error}");
                            WorkflowState::Failed {
                                // Fatal errors consume no budget. Violations from
                                // the prior attempt stay with its candidate.
                                attempts: attempt - 1,
                                violations: prior,
                                error: Some(error),
                            }
                        }
                        Err(error) => {
                            // MalformedResponse: one UNPARSEABLE_OUTPUT violation,
                            // one attempt consumed.
                            let violation = ValidationViolation::new(
                                vec![],
                                ViolationRule::UnparseableOutput,
                                error.to_string(),
                            );
                            if attempt < self.retry_limit {
                                WorkflowState::Drafting {
                                    attempt: attempt + 1,
                                    prior: vec![violation],
                                }
                            } else {
                                WorkflowState::Failed {
                                    attempts: attempt,
                                    violations: vec![violation],
                                    error: None,
                                }
                            }
                        }
                    }
                }

                WorkflowState::Validating { attempt, tree } => {
                    debug!("Workflow state: Validating (attempt {attempt})");
                    let violations = validate(&tree);
                    if violations.is_empty() {
                        WorkflowState::Succeeded {
                            attempts: attempt,
                            tree,
                        }
                    } else if attempt < self.retry_limit {
                        debug!(
                            "Attempt {attempt} rejected with {} violation(s); re-prompting",
                            violations.len()
                        );
                        last_candidate = Some(tree);
                        WorkflowState::Drafting {
                            attempt: attempt + 1,
                            prior: violations,
                        }
                    } else {
                        last_candidate = Some(tree);
                        WorkflowState::Failed {
                            attempts: attempt,
                            violations,
                            error: None,
                        }
                    }
                }

                WorkflowState::Succeeded { attempts, tree } => {
                    info!("Workflow succeeded after {attempts} attempt(s)");
                    return WorkflowReport {
                        status: WorkflowStatus::Succeeded,
                        attempts,
                        artifact: Some(format(&tree)),
                        violations: Vec::new(),
                        error: None,
                    };
                }

                WorkflowState::Failed {
                    attempts,
                    violations,
                    error,
                } => {
                    info!(
                        "Workflow failed after {attempts} attempt(s) ({} outstanding violation(s))",
                        violations.len()
                    );
                    return WorkflowReport {
                        status: WorkflowStatus::Failed,
                        attempts,
                        artifact: last_candidate.as_ref().map(format),
                        violations,
                        error: error.as_ref().map(GenerationFailure::from),
                    };
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::llm_client::{LayoutModel, LlmError};

    /// Scripted stand-in for the live model: returns queued responses in order
    /// and records every prompt it receives.
    struct ScriptedModel {
        responses: Mutex<VecDeque<Result<String, LlmError>>>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(responses: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn prompt(&self, index: usize) -> String {
            self.prompts.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl LayoutModel for ScriptedModel {
        async fn complete(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted model ran out of responses")
        }
    }

    fn repair_loop(model: &Arc<ScriptedModel>, retry_limit: u32) -> RepairLoop {
        let model: Arc<dyn LayoutModel> = model.clone();
        RepairLoop::new(Generator::new(model), retry_limit)
    }

    const VALID_TREE: &str = r#"{
        "kind": "FRAME",
        "name": "Dashboard",
        "geometry": {"x": 0, "y": 0, "width": 1440, "height": 900},
        "children": [
            {
                "kind": "FRAME",
                "name": "Sidebar",
                "geometry": {"x": 0, "y": 0, "width": 250, "height": 900},
                "children": []
            },
            {
                "kind": "FRAME",
                "name": "Chart Area",
                "geometry": {"x": 250, "y": 0, "width": 1190, "height": 900},
                "children": []
            }
        ]
    }"#;

    /// Sidebar is missing `width` — one MISSING_FIELD violation at path [0].
    const MISSING_WIDTH_TREE: &str = r#"{
        "kind": "FRAME",
        "name": "Dashboard",
        "geometry": {"x": 0, "y": 0, "width": 1440, "height": 900},
        "children": [
            {
                "kind": "FRAME",
                "name": "Sidebar",
                "geometry": {"x": 0, "y": 0, "height": 900},
                "children": []
            },
            {
                "kind": "FRAME",
                "name": "Chart Area",
                "geometry": {"x": 250, "y": 0, "width": 1190, "height": 900},
                "children": []
            }
        ]
    }"#;

    #[tokio::test]
    async fn test_valid_first_attempt_succeeds() {
        let model = ScriptedModel::new(vec![Ok(VALID_TREE.to_string())]);
        let report = repair_loop(&model, 3)
            .run("Create a dashboard with a sidebar and a chart area")
            .await;

        assert!(report.is_succeeded());
        assert_eq!(report.attempts, 1);
        assert_eq!(model.calls(), 1);
        assert!(report.artifact.is_some());
        assert!(report.violations.is_empty());
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn test_one_violation_then_successful_repair() {
        let model = ScriptedModel::new(vec![
            Ok(MISSING_WIDTH_TREE.to_string()),
            Ok(VALID_TREE.to_string()),
        ]);
        let report = repair_loop(&model, 3)
            .run("Create a dashboard with a sidebar and a chart area")
            .await;

        assert!(report.is_succeeded());
        assert_eq!(report.attempts, 2);
        assert_eq!(model.calls(), 2);

        // The second prompt must embed the first attempt's violation.
        let second_prompt = model.prompt(1);
        assert!(second_prompt.contains("MISSING_FIELD"));
        assert!(second_prompt.contains("root.children[0]"));
        assert!(second_prompt.contains("width"));
        // The first prompt must not carry repair feedback.
        assert!(!model.prompt(0).contains("REJECTED"));
    }

    #[tokio::test]
    async fn test_budget_exhaustion_returns_last_candidate() {
        let model = ScriptedModel::new(vec![
            Ok(MISSING_WIDTH_TREE.to_string()),
            Ok(MISSING_WIDTH_TREE.to_string()),
            Ok(MISSING_WIDTH_TREE.to_string()),
        ]);
        let report = repair_loop(&model, 3).run("A dashboard").await;

        assert_eq!(report.status, WorkflowStatus::Failed);
        assert_eq!(report.attempts, 3);
        assert_eq!(model.calls(), 3, "exactly retry_limit invocations, never more");
        assert!(report.artifact.is_some(), "best-effort candidate is returned");
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].path, vec![0]);
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn test_timeout_fails_immediately() {
        let model = ScriptedModel::new(vec![Err(LlmError::Timeout)]);
        let report = repair_loop(&model, 3).run("A dashboard").await;

        assert_eq!(report.status, WorkflowStatus::Failed);
        assert_eq!(report.attempts, 0, "fatal errors consume no budget");
        assert_eq!(model.calls(), 1);
        assert!(report.artifact.is_none());
        assert!(report.violations.is_empty(), "zero validation attempts");
        assert_eq!(report.error.as_ref().unwrap().kind, "TIMEOUT");
    }

    #[tokio::test]
    async fn test_model_unavailable_fails_immediately() {
        let model = ScriptedModel::new(vec![Err(LlmError::Api {
            status: 503,
            message: "overloaded".to_string(),
        })]);
        let report = repair_loop(&model, 3).run("A dashboard").await;

        assert_eq!(report.status, WorkflowStatus::Failed);
        assert_eq!(model.calls(), 1);
        assert_eq!(report.error.as_ref().unwrap().kind, "MODEL_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_malformed_response_consumes_an_attempt() {
        let model = ScriptedModel::new(vec![
            Ok("I'd be happy to design that for you!".to_string()),
            Ok(VALID_TREE.to_string()),
        ]);
        let report = repair_loop(&model, 3).run("A dashboard").await;

        assert!(report.is_succeeded());
        assert_eq!(report.attempts, 2);

        // The retry prompt reports the parse failure as UNPARSEABLE_OUTPUT.
        assert!(model.prompt(1).contains("UNPARSEABLE_OUTPUT"));
    }

    #[tokio::test]
    async fn test_all_malformed_exhausts_budget_without_artifact() {
        let model = ScriptedModel::new(vec![
            Ok("not json".to_string()),
            Ok("still not json".to_string()),
        ]);
        let report = repair_loop(&model, 2).run("A dashboard").await;

        assert_eq!(report.status, WorkflowStatus::Failed);
        assert_eq!(report.attempts, 2);
        assert_eq!(model.calls(), 2);
        assert!(report.artifact.is_none(), "nothing ever parsed");
        assert_eq!(report.violations[0].rule, ViolationRule::UnparseableOutput);
    }

    #[tokio::test]
    async fn test_retry_limit_one_means_exactly_one_invocation() {
        let model = ScriptedModel::new(vec![Ok(MISSING_WIDTH_TREE.to_string())]);
        let report = repair_loop(&model, 1).run("A dashboard").await;

        assert_eq!(report.status, WorkflowStatus::Failed);
        assert_eq!(report.attempts, 1);
        assert_eq!(model.calls(), 1, "limit 1 must not issue a second call");
    }

    #[tokio::test]
    async fn test_success_on_final_attempt_is_not_failed() {
        // Off-by-one guard: the Nth (== limit) attempt may still succeed.
        let model = ScriptedModel::new(vec![
            Ok(MISSING_WIDTH_TREE.to_string()),
            Ok(MISSING_WIDTH_TREE.to_string()),
            Ok(VALID_TREE.to_string()),
        ]);
        let report = repair_loop(&model, 3).run("A dashboard").await;

        assert!(report.is_succeeded());
        assert_eq!(report.attempts, 3);
        assert_eq!(model.calls(), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_mid_loop_keeps_prior_attempt_count() {
        let model = ScriptedModel::new(vec![
            Ok(MISSING_WIDTH_TREE.to_string()),
            Err(LlmError::Timeout),
        ]);
        let report = repair_loop(&model, 3).run("A dashboard").await;

        assert_eq!(report.status, WorkflowStatus::Failed);
        // One completed attempt before the fatal second call.
        assert_eq!(report.attempts, 1);
        assert_eq!(report.error.as_ref().unwrap().kind, "TIMEOUT");
        // Best-effort candidate from attempt 1 keeps its outstanding violations.
        assert!(report.artifact.is_some());
        assert_eq!(report.violations.len(), 1);
    }

    #[test]
    fn test_clamp_retry_limit_bounds() {
        assert_eq!(clamp_retry_limit(0), 1);
        assert_eq!(clamp_retry_limit(3), 3);
        assert_eq!(clamp_retry_limit(99), MAX_RETRY_LIMIT);
    }

    #[test]
    fn test_report_serialization_shape() {
        let report = WorkflowReport {
            status: WorkflowStatus::Failed,
            attempts: 3,
            artifact: None,
            violations: vec![ValidationViolation::new(
                vec![0],
                ViolationRule::MissingField,
                "width missing",
            )],
            error: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["attempts"], 3);
        assert_eq!(json["violations"][0]["rule"], "MISSING_FIELD");
        assert!(json.get("artifact").is_none());
        assert!(json.get("error").is_none());
    }
}
