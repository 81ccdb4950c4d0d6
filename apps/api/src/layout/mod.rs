// Layout core: data model, schema rules, validation, canonical formatting.
// Validation is deterministic and CPU-cheap — it runs inline on the request task.

pub mod formatter;
pub mod node;
pub mod schema;
pub mod validator;

// Re-export the public surface consumed by generation and figma modules.
pub use formatter::{format, OutputArtifact};
pub use node::{LayoutNode, LayoutTree, NodeKind, ValidationViolation, ViolationRule};
pub use validator::validate;
