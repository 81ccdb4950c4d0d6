//! Layout tree data model — the wire shape the generation LLM is asked to emit.
//!
//! Decoding is deliberately lenient: unknown kinds and missing optional fields
//! decode successfully so that the validator (not serde) owns the verdict.
//! Only a payload that is not a layout node at all (invalid JSON, missing
//! `kind`, wrong types) fails to decode — that is the generator's
//! `MalformedResponse` territory.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kind of a layout node. Unknown kind strings decode into `Other` so the
/// validator can report `UNKNOWN_KIND` with the offending value intact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    Frame,
    Page,
    Container,
    Text,
    Image,
    Button,
    Input,
    Icon,
    Other(String),
}

impl NodeKind {
    /// Canonical uppercase spelling used on the wire and in prompts.
    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::Frame => "FRAME",
            NodeKind::Page => "PAGE",
            NodeKind::Container => "CONTAINER",
            NodeKind::Text => "TEXT",
            NodeKind::Image => "IMAGE",
            NodeKind::Button => "BUTTON",
            NodeKind::Input => "INPUT",
            NodeKind::Icon => "ICON",
            NodeKind::Other(raw) => raw,
        }
    }
}

impl From<String> for NodeKind {
    fn from(raw: String) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "FRAME" => NodeKind::Frame,
            "PAGE" => NodeKind::Page,
            "CONTAINER" => NodeKind::Container,
            "TEXT" => NodeKind::Text,
            "IMAGE" => NodeKind::Image,
            "BUTTON" => NodeKind::Button,
            "INPUT" => NodeKind::Input,
            "ICON" => NodeKind::Icon,
            _ => NodeKind::Other(raw),
        }
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Node geometry in the parent's coordinate space. Components are optional at
/// decode time; the validator reports the missing ones. Overflow beyond the
/// parent is permitted and never checked.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Geometry {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

/// One element of a layout tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutNode {
    pub kind: NodeKind,
    #[serde(default)]
    pub name: String,
    pub geometry: Option<Geometry>,
    /// Required for `Text` nodes, meaningless elsewhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Style property → value. BTreeMap keeps key order stable.
    #[serde(default)]
    pub style: BTreeMap<String, Value>,
    #[serde(default)]
    pub children: Vec<LayoutNode>,
}

/// One generated artifact: a single root node. Immutable once returned to the
/// caller; the workflow never mutates a tree after validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayoutTree {
    pub root: LayoutNode,
}

impl LayoutTree {
    pub fn new(root: LayoutNode) -> Self {
        Self { root }
    }
}

/// Which structural invariant a violation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationRule {
    UnknownKind,
    MissingField,
    InvalidGeometry,
    IllegalChild,
    ChildLimitExceeded,
    DuplicateName,
    MaxDepthExceeded,
    MalformedStructure,
    UnparseableOutput,
}

/// A single structural non-conformance, located by child indices from the root.
/// Violations reference nodes by path only — they hold no pointer into the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub path: Vec<usize>,
    pub rule: ViolationRule,
    pub message: String,
}

impl ValidationViolation {
    pub fn new(path: Vec<usize>, rule: ViolationRule, message: impl Into<String>) -> Self {
        Self {
            path,
            rule,
            message: message.into(),
        }
    }

    /// Renders the path as `root.children[1].children[0]` for messages and
    /// re-prompt text.
    pub fn path_display(&self) -> String {
        let mut out = String::from("root");
        for index in &self.path {
            out.push_str(&format!(".children[{index}]"));
        }
        out
    }
}
