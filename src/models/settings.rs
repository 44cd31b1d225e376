//! AI analysis settings supplied by the observation-entry workflow.
//!
//! The pipeline only reads `enabled` and `api_key`. The three toggles and
//! the confidence threshold are consumed by the caller when deciding which
//! suggested fields to apply (see `AnalysisSuggestion::auto_populate`).

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("I/O error reading settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed settings file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiSettings {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub auto_populate_enabled: bool,
    pub distance_ocr_enabled: bool,
    pub object_detection_enabled: bool,
    /// Advisory only; never enforced inside the pipeline.
    pub confidence_threshold: f32,
    pub inference_url: String,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            auto_populate_enabled: true,
            distance_ocr_enabled: true,
            object_detection_enabled: true,
            confidence_threshold: 0.5,
            inference_url: config::DEFAULT_INFERENCE_URL.to_string(),
        }
    }
}

impl AiSettings {
    /// Load settings from a JSON file (absent file = defaults), then apply
    /// `PIPEVISION_*` environment overrides.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let mut settings = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str(&raw)?
        } else {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            Self::default()
        };
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Apply overrides from a key lookup. Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(config::env::AI_ENABLED) {
            match parse_bool(&raw) {
                Some(enabled) => self.enabled = enabled,
                None => {
                    tracing::warn!(value = %raw, "Ignoring invalid {}", config::env::AI_ENABLED)
                }
            }
        }
        if let Some(key) = lookup(config::env::API_KEY) {
            let key = key.trim();
            if !key.is_empty() {
                self.api_key = Some(key.to_string());
            }
        }
        if let Some(url) = lookup(config::env::INFERENCE_URL) {
            if !url.trim().is_empty() {
                self.inference_url = url.trim().to_string();
            }
        }
        if let Some(raw) = lookup(config::env::CONFIDENCE_THRESHOLD) {
            match raw.trim().parse::<f32>() {
                Ok(t) if (0.0..=1.0).contains(&t) => self.confidence_threshold = t,
                _ => tracing::warn!(
                    value = %raw,
                    "Ignoring invalid {}",
                    config::env::CONFIDENCE_THRESHOLD
                ),
            }
        }
    }

    /// The API key, if one is configured and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
