// All LLM prompt constants for layout generation.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::layout::schema;
use crate::layout::ValidationViolation;
use crate::llm_client::prompts::SCHEMA_FIDELITY_INSTRUCTION;

/// System prompt for layout generation — enforces JSON-only output.
pub const LAYOUT_SYSTEM: &str = "You are an expert UI/UX designer producing \
    Figma-compatible layout trees from natural-language descriptions. \
    You MUST respond with a single valid JSON object — the root layout node. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Layout generation prompt template.
/// Replace: {schema_fidelity}, {schema_description}, {prompt}, {repair_section}
const LAYOUT_PROMPT_TEMPLATE: &str = r##"{schema_fidelity}

Convert the following description into a layout tree.

SCHEMA RULES:
{schema_description}

Return a JSON object with this EXACT shape (values are illustrative):
{
  "kind": "FRAME",
  "name": "Dashboard",
  "geometry": {"x": 0, "y": 0, "width": 1440, "height": 900},
  "style": {"fill": "#FFFFFF"},
  "children": [
    {
      "kind": "FRAME",
      "name": "Sidebar",
      "geometry": {"x": 0, "y": 0, "width": 250, "height": 900},
      "style": {"fill": "#F5F5F5"},
      "children": []
    },
    {
      "kind": "TEXT",
      "name": "Title",
      "geometry": {"x": 282, "y": 32, "width": 400, "height": 40},
      "content": "Overview",
      "style": {"fontSize": 28},
      "children": []
    }
  ]
}

DESCRIPTION:
{prompt}
{repair_section}"##;

/// Header for the repair section appended on retries.
const REPAIR_HEADER: &str = "\nYOUR PREVIOUS ATTEMPT WAS REJECTED. \
    Correct EXACTLY the issues listed below and change nothing else:";

/// Builds the full generation prompt for one attempt. The repair section is
/// empty on the first attempt and lists prior violations on retries.
pub fn build_layout_prompt(
    prompt_text: &str,
    attempt_number: u32,
    prior_violations: &[ValidationViolation],
) -> String {
    let repair_section = if prior_violations.is_empty() {
        String::new()
    } else {
        render_repair_section(attempt_number, prior_violations)
    };

    LAYOUT_PROMPT_TEMPLATE
        .replace("{schema_fidelity}", SCHEMA_FIDELITY_INSTRUCTION)
        .replace("{schema_description}", &schema::describe())
        .replace("{prompt}", prompt_text)
        .replace("{repair_section}", &repair_section)
}

/// Renders prior violations as a numbered list, one per line:
/// `<path>: <RULE> — <message>`. Deterministic because validator output
/// ordering is deterministic.
fn render_repair_section(attempt_number: u32, violations: &[ValidationViolation]) -> String {
    let mut section = String::from(REPAIR_HEADER);
    section.push_str(&format!(
        "\n(attempt {} was rejected with {} violation(s))\n",
        attempt_number.saturating_sub(1),
        violations.len()
    ));

    for (index, violation) in violations.iter().enumerate() {
        let rule = serde_json::to_string(&violation.rule)
            .unwrap_or_default()
            .trim_matches('"')
            .to_string();
        section.push_str(&format!(
            "{}. {}: {} - {}\n",
            index + 1,
            violation.path_display(),
            rule,
            violation.message
        ));
    }

    section
}
