use std::sync::Arc;

use crate::config::Config;
use crate::figma::FigmaClient;
use crate::llm_client::LayoutModel;

/// Shared application state injected into all route handlers via Axum extractors.
/// Read-only after startup — workflow instances own all per-request state.
#[derive(Clone)]
pub struct AppState {
    /// The layout model behind the generator. Trait object so tests can
    /// substitute a scripted model.
    pub model: Arc<dyn LayoutModel>,
    /// Present only when Figma export is configured.
    pub figma: Option<FigmaClient>,
    pub config: Config,
}
