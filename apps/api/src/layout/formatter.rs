//! Formatter — normalizes a layout tree into the canonical output artifact.
//!
//! Pure and total over any tree, valid or best-effort: stable key ordering
//! (fixed struct field order, sorted style map), explicit defaults for absent
//! optional fields, coordinates rounded to two decimal places. Identical input
//! trees produce byte-identical output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::layout::node::{LayoutNode, LayoutTree, NodeKind};

/// Rounding precision for coordinates, in decimal places.
const COORDINATE_PRECISION: f64 = 100.0;

/// Normalized geometry: every component present and rounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanonicalGeometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One normalized node. Field order here is the canonical key order on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalNode {
    pub kind: NodeKind,
    pub name: String,
    pub geometry: CanonicalGeometry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub style: BTreeMap<String, Value>,
    pub children: Vec<CanonicalNode>,
}

/// The final artifact of a workflow run — what callers receive, what the CLI
/// writes, and what the Figma exporter consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputArtifact {
    pub root: CanonicalNode,
}

impl OutputArtifact {
    /// Canonical serialized bytes, newline-terminated. Deterministic for
    /// identical trees.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// Normalizes a tree into its canonical artifact.
pub fn format(tree: &LayoutTree) -> OutputArtifact {
    OutputArtifact {
        root: canonicalize(&tree.root),
    }
}

fn canonicalize(node: &LayoutNode) -> CanonicalNode {
    let geometry = node.geometry.unwrap_or_default();

    CanonicalNode {
        kind: node.kind.clone(),
        name: node.name.clone(),
        geometry: CanonicalGeometry {
            x: round(geometry.x.unwrap_or(0.0)),
            y: round(geometry.y.unwrap_or(0.0)),
            width: round(geometry.width.unwrap_or(0.0)),
            height: round(geometry.height.unwrap_or(0.0)),
        },
        content: node.content.clone(),
        style: node.style.clone(),
        children: node.children.iter().map(canonicalize).collect(),
    }
}

fn round(value: f64) -> f64 {
    if value.is_finite() {
        (value * COORDINATE_PRECISION).round() / COORDINATE_PRECISION
    } else {
        // Best-effort trees may carry junk geometry; the artifact stays total.
        0.0
    }
}
