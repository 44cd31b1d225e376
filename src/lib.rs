pub mod api; // HTTP surface for the observation-entry workflow
pub mod config;
pub mod db; // Object code mapping store
pub mod models;
pub mod pipeline; // Inference, distance extraction, code resolution, orchestration

use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use models::AiSettings;
use pipeline::analysis::AnalysisOrchestrator;
use pipeline::inference::HttpInferenceClient;
use pipeline::object_code::{ObjectCodeResolver, SqliteMappingStore};

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// built-in default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Wire the production pipeline: HTTP inference client against the
/// configured endpoint, SQLite mapping store at `mappings_db`.
///
/// An unusable mapping database only disables code suggestions.
pub fn build_orchestrator(settings: &AiSettings, mappings_db: &Path) -> AnalysisOrchestrator {
    let client = Arc::new(HttpInferenceClient::new(&settings.inference_url));
    let resolver = match SqliteMappingStore::open(mappings_db) {
        Ok(store) => ObjectCodeResolver::new(Box::new(store)),
        Err(e) => {
            tracing::warn!(
                path = %mappings_db.display(),
                error = %e,
                "Mapping store unavailable, object codes will not be suggested"
            );
            ObjectCodeResolver::empty()
        }
    };
    AnalysisOrchestrator::new(client, resolver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_orchestrator_with_fresh_db() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("mappings.db");
        let orchestrator = build_orchestrator(&AiSettings::default(), &db_path);
        assert!(db_path.exists());

        // Disabled by default: fails fast without touching the network.
        let suggestion = orchestrator.analyze(b"img", &AiSettings::default());
        assert!(!suggestion.success);
        assert_eq!(suggestion.error_kind.as_deref(), Some("configuration"));
    }

    #[test]
    fn build_orchestrator_survives_unusable_db() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the database file should be.
        let orchestrator = build_orchestrator(&AiSettings::default(), dir.path());
        let suggestion = orchestrator.analyze(b"img", &AiSettings::default());
        assert!(!suggestion.success);
    }
}
