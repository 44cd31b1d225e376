use serde::{Deserialize, Serialize};

use crate::models::AiSettings;
use crate::pipeline::analysis::AnalysisError;
use crate::pipeline::distance::DistanceCandidate;
use crate::pipeline::inference::{DetectedObject, OcrFragment};

/// Everything the model saw in one call, kept for diagnostics and review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Predictions {
    pub objects: Vec<DetectedObject>,
    pub text: Vec<OcrFragment>,
    /// Merged, deduplicated candidates, highest confidence first.
    pub distances: Vec<DistanceCandidate>,
}

/// Result of one `analyze` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSuggestion {
    pub success: bool,
    pub distance: Option<f64>,
    pub observation_code: Option<String>,
    /// Mean of every object and text confidence seen. Informational.
    pub confidence: f32,
    pub error: Option<String>,
    /// `configuration`, `timeout` or `inference_failed`.
    pub error_kind: Option<String>,
    pub predictions: Option<Predictions>,
}

/// Fields the entry form may fill in without asking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoPopulateFields {
    pub distance: Option<f64>,
    pub observation_code: Option<String>,
}

impl AnalysisSuggestion {
    pub fn failed(error: &AnalysisError) -> Self {
        Self {
            success: false,
            distance: None,
            observation_code: None,
            confidence: 0.0,
            error: Some(error.to_string()),
            error_kind: Some(error.kind().to_string()),
            predictions: None,
        }
    }

    /// Apply the user's auto-populate toggles. The confidence threshold
    /// is left to the caller.
    pub fn auto_populate(&self, settings: &AiSettings) -> AutoPopulateFields {
        if !self.success || !settings.auto_populate_enabled {
            return AutoPopulateFields::default();
        }
        AutoPopulateFields {
            distance: self.distance.filter(|_| settings.distance_ocr_enabled),
            observation_code: self
                .observation_code
                .clone()
                .filter(|_| settings.object_detection_enabled),
        }
    }
}
