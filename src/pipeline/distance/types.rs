use serde::{Deserialize, Serialize};

use crate::pipeline::inference::BoundingBox;

/// A scored distance hypothesis derived from one OCR fragment (or from the
/// model's own extracted distance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceCandidate {
    /// Meters, within [0, 999] after unit conversion.
    pub value: f64,
    /// Exact matched token, including a leading `+` if present.
    pub original_text: String,
    /// Blended final score in [0, 1].
    pub confidence: f32,
    pub details: CandidateDetails,
}

/// Diagnostic record explaining how a candidate was scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDetails {
    pub ocr_confidence: f32,
    /// Pattern base confidence after the decimal boost and caps.
    pub pattern_confidence: f32,
    pub position_score: f32,
    pub pattern_name: String,
    pub full_text: String,
    pub has_decimal: bool,
    pub bounding_box: Option<BoundingBox>,
}

impl DistanceCandidate {
    /// Grouping key for deduplication: value rounded to 2 decimal places.
    pub fn dedup_key(&self) -> i64 {
        (self.value * 100.0).round() as i64
    }
}
