use std::collections::HashMap;

use super::patterns::{best_match, contains_millimeter_token};
use super::position::score_bbox;
use super::thresholds;
use super::types::{CandidateDetails, DistanceCandidate};
use crate::pipeline::inference::OcrFragment;

/// Characters that never occur in a distance token; they mark timestamps
/// (`00:12`) and dates or ratios (`12/03`).
const REJECT_CHARS: &[char] = &['/', ':'];

/// Blend the three signals into the final candidate confidence.
pub fn blend_confidence(ocr: f32, pattern: f32, position: f32) -> f32 {
    (thresholds::OCR_WEIGHT * ocr
        + thresholds::PATTERN_WEIGHT * pattern
        + thresholds::POSITION_WEIGHT * position)
        .clamp(0.0, 1.0)
}

/// Score one fragment. `None` when it is filtered out or matches nothing.
pub fn score_fragment(
    fragment: &OcrFragment,
    frame_height: Option<f64>,
) -> Option<DistanceCandidate> {
    if fragment.text.contains(REJECT_CHARS) {
        return None;
    }
    let hit = best_match(&fragment.text)?;

    let position_score = score_bbox(fragment.bounding_box.as_ref(), frame_height);
    let mut confidence =
        blend_confidence(fragment.confidence, hit.pattern_confidence, position_score);
    if hit.is_millimeter || contains_millimeter_token(&fragment.text) {
        confidence = confidence.min(thresholds::MILLIMETER_CAP);
    }

    Some(DistanceCandidate {
        value: hit.value,
        original_text: hit.token,
        confidence,
        details: CandidateDetails {
            ocr_confidence: fragment.confidence,
            pattern_confidence: hit.pattern_confidence,
            position_score,
            pattern_name: hit.pattern_name.to_string(),
            full_text: fragment.text.clone(),
            has_decimal: hit.has_decimal,
            bounding_box: fragment.bounding_box.clone(),
        },
    })
}

/// Keep the highest-confidence candidate per value (rounded to 2 decimals),
/// sorted by descending confidence. Equal confidences keep the earlier one.
pub fn dedup_by_value(candidates: Vec<DistanceCandidate>) -> Vec<DistanceCandidate> {
    let mut kept: Vec<DistanceCandidate> = Vec::with_capacity(candidates.len());
    let mut index_by_key: HashMap<i64, usize> = HashMap::new();

    for candidate in candidates {
        match index_by_key.get(&candidate.dedup_key()) {
            Some(&i) => {
                if candidate.confidence > kept[i].confidence {
                    kept[i] = candidate;
                }
            }
            None => {
                index_by_key.insert(candidate.dedup_key(), kept.len());
                kept.push(candidate);
            }
        }
    }

    // Stable sort keeps first-seen order among equal scores.
    kept.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    kept
}

/// Extract ranked distance candidates from OCR fragments.
///
/// `frame_height` (pixels) resolves pixel bounding boxes; boxes already in
/// [0, 1] need no frame.
pub fn extract_distances(
    fragments: &[OcrFragment],
    frame_height: Option<f64>,
) -> Vec<DistanceCandidate> {
    let candidates: Vec<DistanceCandidate> = fragments
        .iter()
        .filter_map(|f| score_fragment(f, frame_height))
        .collect();

    tracing::debug!(
        fragments = fragments.len(),
        candidates = candidates.len(),
        "Distance candidates scored"
    );

    dedup_by_value(candidates)
}
