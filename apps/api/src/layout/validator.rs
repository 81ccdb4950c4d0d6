//! Validator — checks a candidate tree against the Layout Schema.
//!
//! Traversal is depth-first, pre-order, left-to-right among children, and the
//! per-node check order is fixed, so violation ordering is reproducible for
//! identical input. That determinism is load-bearing: repair prompts and tests
//! both depend on it. The validator only reports — it never repairs.

use std::collections::HashSet;

use crate::layout::node::{LayoutNode, LayoutTree, ValidationViolation, ViolationRule};
use crate::layout::schema::{self, FieldConstraint, MAX_NESTING_DEPTH};

/// Validates a tree. An empty result means the tree is structurally valid.
pub fn validate(tree: &LayoutTree) -> Vec<ValidationViolation> {
    let mut violations = Vec::new();

    if !schema::is_root_kind(&tree.root.kind) {
        violations.push(ValidationViolation::new(
            vec![],
            ViolationRule::MalformedStructure,
            format!(
                "root node must be a FRAME or PAGE, found {}",
                tree.root.kind.as_str()
            ),
        ));
    }

    visit(&tree.root, &mut Vec::new(), 0, &mut violations);
    violations
}

fn visit(
    node: &LayoutNode,
    path: &mut Vec<usize>,
    depth: usize,
    violations: &mut Vec<ValidationViolation>,
) {
    if depth >= MAX_NESTING_DEPTH {
        violations.push(ValidationViolation::new(
            path.clone(),
            ViolationRule::MaxDepthExceeded,
            format!("nesting exceeds the maximum depth of {MAX_NESTING_DEPTH}"),
        ));
        // Do not descend further — this bounds traversal on degenerate input.
        return;
    }

    let kind_known = schema::is_allowed_kind(&node.kind);
    if !kind_known {
        violations.push(ValidationViolation::new(
            path.clone(),
            ViolationRule::UnknownKind,
            format!("unknown node kind {:?}", node.kind.as_str()),
        ));
    }

    check_required_fields(node, path, violations);

    if kind_known {
        check_children_legality(node, path, violations);
    }

    check_duplicate_names(node, path, violations);

    for (index, child) in node.children.iter().enumerate() {
        path.push(index);
        visit(child, path, depth + 1, violations);
        path.pop();
    }
}

fn check_required_fields(
    node: &LayoutNode,
    path: &[usize],
    violations: &mut Vec<ValidationViolation>,
) {
    for spec in schema::required_fields(&node.kind) {
        match (spec.name, spec.constraint) {
            ("name", FieldConstraint::NonEmptyString) => {
                if node.name.trim().is_empty() {
                    violations.push(ValidationViolation::new(
                        path.to_vec(),
                        ViolationRule::MissingField,
                        format!("{} node is missing a non-empty `name`", node.kind.as_str()),
                    ));
                }
            }
            ("content", FieldConstraint::NonEmptyString) => {
                let missing = node
                    .content
                    .as_deref()
                    .map(|c| c.trim().is_empty())
                    .unwrap_or(true);
                if missing {
                    violations.push(ValidationViolation::new(
                        path.to_vec(),
                        ViolationRule::MissingField,
                        format!(
                            "{} node {:?} requires a non-empty `content` string",
                            node.kind.as_str(),
                            node.name
                        ),
                    ));
                }
            }
            ("geometry", FieldConstraint::CompleteGeometry) => {
                check_geometry(node, path, violations);
            }
            // The schema only declares the three field names above.
            _ => {}
        }
    }
}

fn check_geometry(node: &LayoutNode, path: &[usize], violations: &mut Vec<ValidationViolation>) {
    let Some(geometry) = &node.geometry else {
        violations.push(ValidationViolation::new(
            path.to_vec(),
            ViolationRule::MissingField,
            format!(
                "{} node {:?} is missing `geometry`",
                node.kind.as_str(),
                node.name
            ),
        ));
        return;
    };

    // Component order is fixed so violation ordering stays deterministic.
    let components = [
        ("x", geometry.x),
        ("y", geometry.y),
        ("width", geometry.width),
        ("height", geometry.height),
    ];

    for (component, value) in components {
        match value {
            None => violations.push(ValidationViolation::new(
                path.to_vec(),
                ViolationRule::MissingField,
                format!(
                    "{} node {:?} is missing required `{component}` field",
                    node.kind.as_str(),
                    node.name
                ),
            )),
            Some(v) if !v.is_finite() => violations.push(ValidationViolation::new(
                path.to_vec(),
                ViolationRule::InvalidGeometry,
                format!("`{component}` must be a finite number, found {v}"),
            )),
            Some(v) if (component == "width" || component == "height") && v < 0.0 => violations
                .push(ValidationViolation::new(
                    path.to_vec(),
                    ViolationRule::InvalidGeometry,
                    format!("`{component}` must be >= 0, found {v}"),
                )),
            Some(_) => {}
        }
    }
}

/// Child-kind legality and child-count limits. Violations attach to the parent
/// node's path; the message names the offending child.
fn check_children_legality(
    node: &LayoutNode,
    path: &[usize],
    violations: &mut Vec<ValidationViolation>,
) {
    let allowed = schema::allowed_child_kinds(&node.kind);

    for (index, child) in node.children.iter().enumerate() {
        if !allowed.contains(&child.kind) {
            violations.push(ValidationViolation::new(
                path.to_vec(),
                ViolationRule::IllegalChild,
                format!(
                    "{} node {:?} may not contain a {} child (children[{index}])",
                    node.kind.as_str(),
                    node.name,
                    child.kind.as_str()
                ),
            ));
        }
    }

    if let Some(max) = schema::max_children(&node.kind) {
        if node.children.len() > max {
            violations.push(ValidationViolation::new(
                path.to_vec(),
                ViolationRule::ChildLimitExceeded,
                format!(
                    "{} node {:?} admits at most {max} child(ren), found {}",
                    node.kind.as_str(),
                    node.name,
                    node.children.len()
                ),
            ));
        }
    }
}

/// Duplicate `name` among immediate siblings: the first occurrence wins, each
/// later duplicate is reported at its own path. Empty names are skipped here —
/// the missing-field check already covers them.
fn check_duplicate_names(
    node: &LayoutNode,
    path: &[usize],
    violations: &mut Vec<ValidationViolation>,
) {
    let mut seen: HashSet<&str> = HashSet::new();

    for (index, child) in node.children.iter().enumerate() {
        let name = child.name.trim();
        if name.is_empty() {
            continue;
        }
        if !seen.insert(name) {
            let mut child_path = path.to_vec();
            child_path.push(index);
            violations.push(ValidationViolation::new(
                child_path,
                ViolationRule::DuplicateName,
                format!("sibling name {name:?} duplicates an earlier sibling"),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::node::{Geometry, NodeKind};

    fn geometry(x: f64, y: f64, width: f64, height: f64) -> Option<Geometry> {
        Some(Geometry {
            x: Some(x),
            y: Some(y),
            width: Some(width),
            height: Some(height),
        })
    }

    fn frame(name: &str, children: Vec<LayoutNode>) -> LayoutNode {
        LayoutNode {
            kind: NodeKind::Frame,
            name: name.to_string(),
            geometry: geometry(0.0, 0.0, 1440.0, 900.0),
            content: None,
            style: Default::default(),
            children,
        }
    }

    fn text(name: &str, content: &str) -> LayoutNode {
        LayoutNode {
            kind: NodeKind::Text,
            name: name.to_string(),
            geometry: geometry(10.0, 10.0, 200.0, 24.0),
            content: Some(content.to_string()),
            style: Default::default(),
            children: vec![],
        }
    }

    fn dashboard() -> LayoutTree {
        LayoutTree::new(frame(
            "Dashboard",
            vec![
                frame("Sidebar", vec![text("Nav Label", "Home")]),
                frame("Chart Area", vec![]),
            ],
        ))
    }

    #[test]
    fn test_valid_tree_has_no_violations() {
        assert!(validate(&dashboard()).is_empty());
    }

    #[test]
    fn test_violation_order_is_reproducible() {
        let mut tree = dashboard();
        tree.root.children[0].geometry = None;
        tree.root.children[1].name = String::new();

        let first = validate(&tree);
        let second = validate(&tree);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_width_on_first_child() {
        let mut tree = dashboard();
        tree.root.children[0].geometry = Some(Geometry {
            x: Some(0.0),
            y: Some(0.0),
            width: None,
            height: Some(900.0),
        });

        let violations = validate(&tree);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, ViolationRule::MissingField);
        assert_eq!(violations[0].path, vec![0]);
        assert!(violations[0].message.contains("width"));
    }

    #[test]
    fn test_text_with_child_is_illegal_at_text_path() {
        let mut bad_text = text("Label", "Hello");
        bad_text.children.push(text("Nested", "World"));
        let tree = LayoutTree::new(frame("Root", vec![bad_text]));

        let violations = validate(&tree);
        let illegal: Vec<_> = violations
            .iter()
            .filter(|v| v.rule == ViolationRule::IllegalChild)
            .collect();
        assert_eq!(illegal.len(), 1);
        assert_eq!(illegal[0].path, vec![0], "reported at the TEXT node's path");
    }

    #[test]
    fn test_button_with_two_text_children_exceeds_limit() {
        let button = LayoutNode {
            kind: NodeKind::Button,
            name: "Submit".to_string(),
            geometry: geometry(0.0, 0.0, 120.0, 40.0),
            content: None,
            style: Default::default(),
            children: vec![text("Label A", "Go"), text("Label B", "Stop")],
        };
        let tree = LayoutTree::new(frame("Root", vec![button]));

        let violations = validate(&tree);
        assert!(violations
            .iter()
            .any(|v| v.rule == ViolationRule::ChildLimitExceeded && v.path == vec![0]));
    }

    #[test]
    fn test_button_with_frame_child_is_illegal() {
        let button = LayoutNode {
            kind: NodeKind::Button,
            name: "Submit".to_string(),
            geometry: geometry(0.0, 0.0, 120.0, 40.0),
            content: None,
            style: Default::default(),
            children: vec![frame("Inner", vec![])],
        };
        let tree = LayoutTree::new(frame("Root", vec![button]));

        assert!(validate(&tree)
            .iter()
            .any(|v| v.rule == ViolationRule::IllegalChild));
    }

    #[test]
    fn test_unknown_kind_is_reported() {
        let mut tree = dashboard();
        tree.root.children[0].kind = NodeKind::Other("RECTANGLE".to_string());

        let violations = validate(&tree);
        assert!(violations
            .iter()
            .any(|v| v.rule == ViolationRule::UnknownKind && v.path == vec![0]));
    }

    #[test]
    fn test_text_missing_content() {
        let mut tree = dashboard();
        tree.root.children[0].children[0].content = None;

        let violations = validate(&tree);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, ViolationRule::MissingField);
        assert_eq!(violations[0].path, vec![0, 0]);
        assert!(violations[0].message.contains("content"));
    }

    #[test]
    fn test_negative_width_is_invalid_geometry() {
        let mut tree = dashboard();
        tree.root.children[1].geometry = geometry(0.0, 0.0, -5.0, 100.0);

        let violations = validate(&tree);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, ViolationRule::InvalidGeometry);
        assert_eq!(violations[0].path, vec![1]);
    }

    #[test]
    fn test_negative_coordinates_are_allowed() {
        // Overflow / off-canvas placement is permitted, only sizes are signed.
        let mut tree = dashboard();
        tree.root.children[1].geometry = geometry(-50.0, -10.0, 100.0, 100.0);
        assert!(validate(&tree).is_empty());
    }

    #[test]
    fn test_non_finite_geometry_is_invalid() {
        let mut tree = dashboard();
        tree.root.children[0].geometry = geometry(f64::NAN, 0.0, 100.0, 100.0);

        let violations = validate(&tree);
        assert_eq!(violations[0].rule, ViolationRule::InvalidGeometry);
    }

    #[test]
    fn test_duplicate_sibling_names_first_wins() {
        let tree = LayoutTree::new(frame(
            "Root",
            vec![
                frame("Panel", vec![]),
                frame("Panel", vec![]),
                frame("Panel", vec![]),
            ],
        ));

        let violations = validate(&tree);
        let duplicates: Vec<_> = violations
            .iter()
            .filter(|v| v.rule == ViolationRule::DuplicateName)
            .collect();
        // First occurrence wins; the second and third are reported.
        assert_eq!(duplicates.len(), 2);
        assert_eq!(duplicates[0].path, vec![1]);
        assert_eq!(duplicates[1].path, vec![2]);
    }

    #[test]
    fn test_same_name_in_different_parents_is_fine() {
        let tree = LayoutTree::new(frame(
            "Root",
            vec![
                frame("Left", vec![text("Label", "a")]),
                frame("Right", vec![text("Label", "b")]),
            ],
        ));
        assert!(validate(&tree).is_empty());
    }

    #[test]
    fn test_non_frame_root_is_malformed_structure() {
        let tree = LayoutTree::new(text("Floating", "oops"));

        let violations = validate(&tree);
        assert_eq!(violations[0].rule, ViolationRule::MalformedStructure);
        assert_eq!(violations[0].path, Vec::<usize>::new());
    }

    #[test]
    fn test_container_root_is_rejected() {
        let mut root = frame("Root", vec![]);
        root.kind = NodeKind::Container;
        let violations = validate(&LayoutTree::new(root));
        assert!(violations
            .iter()
            .any(|v| v.rule == ViolationRule::MalformedStructure));
    }

    #[test]
    fn test_depth_bound_is_a_violation_not_a_panic() {
        // Chain of nested frames one level past the bound.
        let mut node = frame("Leaf", vec![]);
        for i in 0..MAX_NESTING_DEPTH {
            node = frame(&format!("Level {i}"), vec![node]);
        }
        let tree = LayoutTree::new(node);

        let violations = validate(&tree);
        let deep: Vec<_> = violations
            .iter()
            .filter(|v| v.rule == ViolationRule::MaxDepthExceeded)
            .collect();
        assert_eq!(deep.len(), 1);
        assert_eq!(deep[0].path.len(), MAX_NESTING_DEPTH);
    }

    #[test]
    fn test_tree_at_exactly_max_depth_is_valid() {
        let mut node = frame("Leaf", vec![]);
        for i in 0..(MAX_NESTING_DEPTH - 1) {
            node = frame(&format!("Level {i}"), vec![node]);
        }
        assert!(validate(&LayoutTree::new(node)).is_empty());
    }
}
