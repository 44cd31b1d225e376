use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "PipeVision";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hard ceiling on a single inference round trip.
pub const INFERENCE_TIMEOUT_SECS: u64 = 10;

/// Vision model endpoint used when settings do not name one.
pub const DEFAULT_INFERENCE_URL: &str = "https://inference.pipevision.app/v1/inspect";

/// Default bind address for `pipevision serve`.
pub const DEFAULT_API_ADDR: &str = "127.0.0.1:8787";

/// Environment overrides applied on top of the settings file.
pub mod env {
    pub const AI_ENABLED: &str = "PIPEVISION_AI_ENABLED";
    pub const API_KEY: &str = "PIPEVISION_API_KEY";
    pub const INFERENCE_URL: &str = "PIPEVISION_INFERENCE_URL";
    pub const CONFIDENCE_THRESHOLD: &str = "PIPEVISION_CONFIDENCE_THRESHOLD";
}

/// Get the application data directory
/// ~/PipeVision/ on all platforms; falls back to the working directory
/// when no home directory can be determined (containers, CI).
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// AI settings file (JSON, camelCase keys).
pub fn settings_path() -> PathBuf {
    app_data_dir().join("ai_settings.json")
}

/// SQLite database holding object class → observation code mappings.
pub fn mappings_db_path() -> PathBuf {
    app_data_dir().join("mappings.db")
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "pipevision_lib=debug,pipevision=debug,tower_http=info"
    } else {
        "pipevision_lib=info,pipevision=info"
    }
}
