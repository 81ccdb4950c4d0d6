//! Layout Schema — the single source of truth for structural validity.
//!
//! Pure lookup tables: which kinds exist, which fields each kind requires,
//! which kinds may nest under which, and how many children a kind admits.
//! The validator consults these; nothing here inspects a tree.

use crate::layout::node::NodeKind;

/// Hard bound on nesting depth. Exceeding it is a violation, not a panic.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Constraint attached to a required field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldConstraint {
    /// Present and non-empty after trimming.
    NonEmptyString,
    /// All four components present, finite, with width/height ≥ 0.
    CompleteGeometry,
}

/// One required field of a node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub constraint: FieldConstraint,
}

const COMMON_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "name",
        constraint: FieldConstraint::NonEmptyString,
    },
    FieldSpec {
        name: "geometry",
        constraint: FieldConstraint::CompleteGeometry,
    },
];

const TEXT_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "name",
        constraint: FieldConstraint::NonEmptyString,
    },
    FieldSpec {
        name: "geometry",
        constraint: FieldConstraint::CompleteGeometry,
    },
    FieldSpec {
        name: "content",
        constraint: FieldConstraint::NonEmptyString,
    },
];

const ALL_KINDS: &[NodeKind] = &[
    NodeKind::Frame,
    NodeKind::Page,
    NodeKind::Container,
    NodeKind::Text,
    NodeKind::Image,
    NodeKind::Button,
    NodeKind::Input,
    NodeKind::Icon,
];

const BUTTON_CHILDREN: &[NodeKind] = &[NodeKind::Text];

const NO_CHILDREN: &[NodeKind] = &[];

/// Every kind the schema admits.
pub fn allowed_kinds() -> &'static [NodeKind] {
    ALL_KINDS
}

pub fn is_allowed_kind(kind: &NodeKind) -> bool {
    !matches!(kind, NodeKind::Other(_))
}

/// Kinds that may sit at the root of a tree.
pub fn is_root_kind(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::Frame | NodeKind::Page)
}

/// Required fields for a kind. Unknown kinds fall back to the common set so the
/// validator still reports something useful alongside `UNKNOWN_KIND`.
pub fn required_fields(kind: &NodeKind) -> &'static [FieldSpec] {
    match kind {
        NodeKind::Text => TEXT_FIELDS,
        _ => COMMON_FIELDS,
    }
}

/// Kinds permitted as children of `kind`. Leaves admit none.
pub fn allowed_child_kinds(kind: &NodeKind) -> &'static [NodeKind] {
    match kind {
        NodeKind::Frame | NodeKind::Page | NodeKind::Container => ALL_KINDS,
        NodeKind::Button => BUTTON_CHILDREN,
        NodeKind::Text
        | NodeKind::Image
        | NodeKind::Input
        | NodeKind::Icon
        | NodeKind::Other(_) => NO_CHILDREN,
    }
}

/// Maximum child count for a kind; `None` means unbounded.
pub fn max_children(kind: &NodeKind) -> Option<usize> {
    match kind {
        NodeKind::Frame | NodeKind::Page | NodeKind::Container => None,
        NodeKind::Button => Some(1),
        NodeKind::Text
        | NodeKind::Image
        | NodeKind::Input
        | NodeKind::Icon
        | NodeKind::Other(_) => Some(0),
    }
}

/// Renders the schema rules as prompt text. Deterministic so repair prompts
/// are reproducible for identical input.
pub fn describe() -> String {
    let kinds = allowed_kinds()
        .iter()
        .map(NodeKind::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Allowed node kinds: {kinds}.\n\
         Every node requires a non-empty \"name\" and a \"geometry\" object with finite \
         numeric x, y, width, height (width and height must be >= 0; coordinates are \
         relative to the parent and may overflow it).\n\
         TEXT nodes additionally require a non-empty \"content\" string.\n\
         TEXT, IMAGE, INPUT, and ICON nodes are leaves and must have no children.\n\
         BUTTON nodes may contain at most one child, and it must be a TEXT node.\n\
         FRAME, PAGE, and CONTAINER nodes may contain any kinds.\n\
         The root node must be a FRAME or PAGE.\n\
         Nesting deeper than {MAX_NESTING_DEPTH} levels is rejected."
    )
}
