#![allow(dead_code)]

// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction that pins the model to the exact output schema.
pub const SCHEMA_FIDELITY_INSTRUCTION: &str = "\
    CRITICAL: Respond with exactly the schema described below — the same field \
    names, the same nesting, nothing extra. Every node must carry a `kind`. \
    If a rule in the schema conflicts with the user's wording, the schema wins.";
