//! Shared state for the API router.

use std::sync::Arc;

use crate::models::AiSettings;
use crate::pipeline::analysis::AnalysisOrchestrator;

/// Shared context for all API routes.
///
/// Settings are loaded once at startup and never mutated by the server.
#[derive(Clone)]
pub struct ApiContext {
    pub orchestrator: Arc<AnalysisOrchestrator>,
    pub settings: Arc<AiSettings>,
}

impl ApiContext {
    pub fn new(orchestrator: AnalysisOrchestrator, settings: AiSettings) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            settings: Arc::new(settings),
        }
    }
}
