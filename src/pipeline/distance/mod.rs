//! Distance extraction from OCR fragments.
//!
//! Fragments are pre-filtered, matched against a prioritized pattern table,
//! scored on OCR certainty, pattern strength and vertical position, then
//! deduplicated by value and ranked.

pub mod extractor;
pub mod patterns;
pub mod position;
pub mod types;

pub use extractor::*;
pub use types::*;

/// Scoring constants. These are empirically tuned; keep them exact.
pub mod thresholds {
    /// Final blend weights (sum to 1.0).
    pub const OCR_WEIGHT: f32 = 0.3;
    pub const PATTERN_WEIGHT: f32 = 0.4;
    pub const POSITION_WEIGHT: f32 = 0.3;

    /// Multiplier for tokens containing a literal '.'; result capped at 1.0.
    pub const DECIMAL_BOOST: f32 = 1.3;

    /// Ceiling for any reading involving millimetres.
    pub const MILLIMETER_CAP: f32 = 0.15;

    /// Top/bottom band height as a fraction of the frame.
    pub const EDGE_BAND: f64 = 0.15;
    /// Score at the very top or bottom edge.
    pub const EDGE_PEAK_SCORE: f32 = 0.9;
    /// Score at the inner edge of a band.
    pub const EDGE_MIN_SCORE: f32 = 0.6;
    /// Score anywhere in the middle of the frame.
    pub const MIDDLE_SCORE: f32 = 0.2;
    /// Score when no usable bounding box exists.
    pub const NO_POSITION_SCORE: f32 = 0.3;

    /// Accepted range in meters, after unit conversion.
    pub const MIN_DISTANCE_M: f64 = 0.0;
    pub const MAX_DISTANCE_M: f64 = 999.0;

}
