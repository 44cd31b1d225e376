use std::cmp::Ordering;

use crate::pipeline::distance::patterns::best_match;
use crate::pipeline::distance::{dedup_by_value, thresholds, CandidateDetails, DistanceCandidate};

/// Selection cutoffs. Empirically tuned alongside the extractor weights.
pub mod cutoffs {
    /// Confidence gap above which the higher candidate wins outright.
    pub const DECISIVE_GAP: f32 = 0.1;
    /// A candidate above this licenses dropping noise.
    pub const CLEAR_WINNER: f32 = 0.7;
    /// Noise floor applied once a clear winner exists.
    pub const NOISE_FLOOR: f32 = 0.5;
    /// Model-supplied distance with / without a decimal point.
    pub const MODEL_DECIMAL_CONFIDENCE: f32 = 0.9;
    pub const MODEL_INTEGER_CONFIDENCE: f32 = 0.6;
}

pub const MODEL_DISTANCE_PATTERN: &str = "model_extracted";

/// Turn the model's own extracted distance into a candidate.
///
/// Accepted only when it has a decimal point or ends in a digit directly
/// followed by `M`/`m`; a bare integer is not trusted.
pub fn candidate_from_model_distance(raw: &str) -> Option<DistanceCandidate> {
    let text = raw.trim();
    let has_decimal = text.contains('.');
    if !has_decimal && !ends_with_meter_suffix(text) {
        tracing::debug!(text, "Discarding model distance without decimal or unit");
        return None;
    }
    let hit = best_match(text)?;

    let mut confidence = if has_decimal {
        cutoffs::MODEL_DECIMAL_CONFIDENCE
    } else {
        cutoffs::MODEL_INTEGER_CONFIDENCE
    };
    if hit.is_millimeter {
        confidence = confidence.min(thresholds::MILLIMETER_CAP);
    }

    Some(DistanceCandidate {
        value: hit.value,
        original_text: text.to_string(),
        confidence,
        details: CandidateDetails {
            ocr_confidence: confidence,
            pattern_confidence: hit.pattern_confidence,
            position_score: thresholds::NO_POSITION_SCORE,
            pattern_name: MODEL_DISTANCE_PATTERN.to_string(),
            full_text: raw.to_string(),
            has_decimal,
            bounding_box: None,
        },
    })
}

fn ends_with_meter_suffix(text: &str) -> bool {
    let mut rev = text.chars().rev();
    matches!(
        (rev.next(), rev.next()),
        (Some('m' | 'M'), Some(d)) if d.is_ascii_digit()
    )
}

/// Merge the model candidate (if any) with extracted ones and deduplicate.
pub fn merge_candidates(
    model: Option<DistanceCandidate>,
    extracted: Vec<DistanceCandidate>,
) -> Vec<DistanceCandidate> {
    let mut all = Vec::with_capacity(extracted.len() + 1);
    all.extend(model);
    all.extend(extracted);
    dedup_by_value(all)
}

/// Drop low-confidence candidates when a clear winner exists.
pub fn filter_noise(candidates: Vec<DistanceCandidate>) -> Vec<DistanceCandidate> {
    if candidates.len() <= 1
        || !candidates.iter().any(|c| c.confidence > cutoffs::CLEAR_WINNER)
    {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|c| c.confidence >= cutoffs::NOISE_FLOOR)
        .collect()
}

/// Pairwise preference: `Greater` means `challenger` beats `current`.
fn compare(current: &DistanceCandidate, challenger: &DistanceCandidate) -> Ordering {
    let gap = challenger.confidence - current.confidence;
    if gap.abs() > cutoffs::DECISIVE_GAP {
        return gap.total_cmp(&0.0);
    }
    let decimal = challenger
        .details
        .has_decimal
        .cmp(&current.details.has_decimal);
    if decimal != Ordering::Equal {
        return decimal;
    }
    challenger
        .details
        .position_score
        .partial_cmp(&current.details.position_score)
        .unwrap_or(Ordering::Equal)
}

/// Reduce the list to one candidate. Full ties keep the first encountered.
pub fn select_best(candidates: &[DistanceCandidate]) -> Option<&DistanceCandidate> {
    candidates.iter().reduce(|best, next| {
        if compare(best, next) == Ordering::Greater {
            next
        } else {
            best
        }
    })
}
