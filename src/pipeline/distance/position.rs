//! Positional heuristic: distance overlays are burned in at the very top or
//! very bottom of the frame.

use super::thresholds;
use crate::pipeline::inference::BoundingBox;

/// Score a normalized vertical position (0 = top edge, 1 = bottom edge).
///
/// Top band: 0.9 at y=0 falling linearly to 0.6 at the band edge.
/// Bottom band: 0.6 at the band edge rising linearly to 0.9 at y=1.
/// Middle: flat `MIDDLE_SCORE`.
pub fn position_score(normalized_y: f64) -> f32 {
    let y = normalized_y.clamp(0.0, 1.0);
    let band = thresholds::EDGE_BAND;
    let (peak, edge) = (thresholds::EDGE_PEAK_SCORE as f64, thresholds::EDGE_MIN_SCORE as f64);

    let score = if y <= band {
        peak - (y / band) * (peak - edge)
    } else if y >= 1.0 - band {
        edge + ((y - (1.0 - band)) / band) * (peak - edge)
    } else {
        thresholds::MIDDLE_SCORE as f64
    };
    score as f32
}

/// Vertical centroid of a box as a fraction of frame height.
///
/// Boxes already in [0, 1] are taken as-is; pixel boxes need a known frame
/// height. `None` means the box gives no usable position.
pub fn normalized_y(bbox: &BoundingBox, frame_height: Option<f64>) -> Option<f64> {
    let (_, y) = bbox.to_centroid()?;
    if bbox.is_normalized() {
        return Some(y);
    }
    match frame_height {
        Some(h) if h > 0.0 => Some((y / h).clamp(0.0, 1.0)),
        _ => None,
    }
}

/// Position score for an optional box, falling back to `NO_POSITION_SCORE`.
pub fn score_bbox(bbox: Option<&BoundingBox>, frame_height: Option<f64>) -> f32 {
    bbox.and_then(|b| normalized_y(b, frame_height))
        .map(position_score)
        .unwrap_or(thresholds::NO_POSITION_SCORE)
}
