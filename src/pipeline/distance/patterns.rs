//! Distance pattern table.
//!
//! Each entry is a regex with two named groups, `token` (the substring kept
//! as `original_text`) and `value` (the number), plus a base confidence and
//! unit divisor. New formats are added by appending an entry; scoring is
//! shared by every entry. The `regex` crate has no look-around, so trailing
//! context is matched by a non-capturing group outside `token`.

use std::sync::LazyLock;

use regex::Regex;

use super::thresholds;

/// One row of the pattern table.
pub struct DistancePattern {
    pub name: &'static str,
    pub regex: Regex,
    pub base_confidence: f32,
    /// Divide the captured number by this to get meters.
    pub divisor: f64,
    /// Millimetre readings are capped at `thresholds::MILLIMETER_CAP`.
    pub is_millimeter: bool,
}

impl DistancePattern {
    fn new(name: &'static str, pattern: &str, base_confidence: f32) -> Self {
        Self {
            name,
            // Table patterns are literals covered by tests.
            regex: Regex::new(pattern).unwrap(),
            base_confidence,
            divisor: 1.0,
            is_millimeter: false,
        }
    }

    fn divided_by(mut self, divisor: f64) -> Self {
        self.divisor = divisor;
        self
    }

    fn millimeter(mut self) -> Self {
        self.is_millimeter = true;
        self
    }
}

/// Ordered by priority. Equal scores keep the earlier entry, so the
/// inspection overlay format is listed first.
pub static DISTANCE_PATTERNS: LazyLock<Vec<DistancePattern>> = LazyLock::new(|| {
    vec![
        // 002.34m: the usual burned-in overlay
        DistancePattern::new(
            "inspection_format_decimal",
            r"^(?P<token>\+?0*(?P<value>\d+\.\d+)\s?[Mm])$",
            0.98,
        ),
        // 12.34M
        DistancePattern::new(
            "exact_decimal_meters",
            r"^(?P<token>\+?(?P<value>\d+\.\d+)[Mm])$",
            1.0,
        ),
        // 12.34
        DistancePattern::new("exact_decimal", r"^(?P<token>\+?(?P<value>\d+\.\d+))$", 0.95),
        // "DIST 12.34M CAM 1"
        DistancePattern::new(
            "embedded_decimal_meters",
            r"(?:^|[^\d.])(?P<token>\+?(?P<value>\d+\.\d+)[Mm])(?:[^A-Za-z]|$)",
            0.9,
        ),
        // 12.34 m
        DistancePattern::new(
            "spaced_decimal_meters",
            r"(?:^|[^\d.])(?P<token>\+?(?P<value>\d+\.\d+)\s+[Mm])(?:[^A-Za-z]|$)",
            0.85,
        ),
        // 12m
        DistancePattern::new(
            "integer_meters",
            r"(?:^|[^\d.])(?P<token>\+?(?P<value>\d+)[Mm])(?:[^A-Za-z]|$)",
            0.6,
        ),
        // 12
        DistancePattern::new("standalone_integer", r"^(?P<token>\+?(?P<value>\d+))$", 0.4),
        // 12 meters / 12.5 metres
        DistancePattern::new(
            "meters_word",
            r"(?:^|[^\d.])(?P<token>\+?(?P<value>\d+(?:\.\d+)?)\s*(?i:meters?|metres?))(?:[^A-Za-z]|$)",
            0.7,
        ),
        // 150cm
        DistancePattern::new(
            "centimeters",
            r"(?:^|[^\d.])(?P<token>\+?(?P<value>\d+(?:\.\d+)?)\s*(?i:cm))(?:[^A-Za-z]|$)",
            0.3,
        )
        .divided_by(100.0),
        // 2340mm / 2340MM
        DistancePattern::new(
            "millimeters",
            r"(?:^|[^\d.])(?P<token>\+?(?P<value>\d+(?:\.\d+)?)\s*(?i:mm))(?:[^A-Za-z]|$)",
            thresholds::MILLIMETER_CAP,
        )
        .divided_by(1000.0)
        .millimeter(),
    ]
});

/// A single pattern hit inside one text.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch {
    pub pattern_name: &'static str,
    pub token: String,
    /// Meters after unit conversion.
    pub value: f64,
    pub has_decimal: bool,
    /// Base confidence after decimal boost and caps.
    pub pattern_confidence: f32,
    pub is_millimeter: bool,
}

/// Apply the decimal boost and caps to a base confidence.
pub fn boosted_confidence(base: f32, has_decimal: bool, is_millimeter: bool) -> f32 {
    let boosted = if has_decimal {
        (base * thresholds::DECIMAL_BOOST).min(1.0)
    } else {
        base.min(1.0)
    };
    if is_millimeter {
        boosted.min(thresholds::MILLIMETER_CAP)
    } else {
        boosted
    }
}

/// Try one pattern against a trimmed text: the first in-range match wins.
///
/// Out-of-range matches are discarded and the search resumes after their
/// token, so the context character that follows stays available to the next
/// match.
fn try_pattern(pattern: &DistancePattern, text: &str) -> Option<PatternMatch> {
    let mut start = 0;
    while let Some(caps) = pattern.regex.captures_at(text, start) {
        let token = caps.name("token")?;
        start = token.end();
        let Some(value) = caps
            .name("value")
            .and_then(|v| v.as_str().parse::<f64>().ok())
            .map(|raw| raw / pattern.divisor)
        else {
            continue;
        };
        if (thresholds::MIN_DISTANCE_M..=thresholds::MAX_DISTANCE_M).contains(&value) {
            return Some(pattern_match(pattern, token.as_str(), value));
        }
    }
    None
}

fn pattern_match(pattern: &DistancePattern, token: &str, value: f64) -> PatternMatch {
    let has_decimal = token.contains('.');
    PatternMatch {
        pattern_name: pattern.name,
        token: token.to_string(),
        value,
        has_decimal,
        pattern_confidence: boosted_confidence(
            pattern.base_confidence,
            has_decimal,
            pattern.is_millimeter,
        ),
        is_millimeter: pattern.is_millimeter,
    }
}

/// Best-scoring pattern hit for a text, or `None`.
///
/// Every table entry is tried; the highest boosted confidence wins and
/// ties keep the earlier entry.
pub fn best_match(text: &str) -> Option<PatternMatch> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    DISTANCE_PATTERNS
        .iter()
        .filter_map(|p| try_pattern(p, trimmed))
        .fold(None, |best: Option<PatternMatch>, m| match best {
            Some(b) if b.pattern_confidence >= m.pattern_confidence => Some(b),
            _ => Some(m),
        })
}

/// True when the text carries a millimetre reading anywhere.
pub fn contains_millimeter_token(text: &str) -> bool {
    DISTANCE_PATTERNS
        .iter()
        .filter(|p| p.is_millimeter)
        .any(|p| p.regex.is_match(text.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(text: &str) -> PatternMatch {
        best_match(text).unwrap_or_else(|| panic!("no match for {text:?}"))
    }

    #[test]
    fn table_compiles_with_token_and_value_groups() {
        for p in DISTANCE_PATTERNS.iter() {
            let names: Vec<_> = p.regex.capture_names().flatten().collect();
            assert!(names.contains(&"token"), "{} lacks token", p.name);
            assert!(names.contains(&"value"), "{} lacks value", p.name);
        }
    }

    #[test]
    fn inspection_format_wins_for_overlay_text() {
        for text in ["002.34m", "4.00M", "0012.5m", "12.34M"] {
            let hit = m(text);
            assert_eq!(hit.pattern_name, "inspection_format_decimal", "{text}");
            assert!(hit.pattern_confidence >= 0.9, "{text}");
        }
        assert!((m("002.34m").value - 2.34).abs() < 1e-9);
    }

    #[test]
    fn exact_decimal_without_suffix() {
        let hit = m("12.34");
        assert_eq!(hit.pattern_name, "exact_decimal");
        assert!((hit.pattern_confidence - 1.0).abs() < f32::EPSILON);
        assert!(hit.has_decimal);
    }

    #[test]
    fn leading_plus_is_kept_in_token() {
        let hit = m("+12.34");
        assert_eq!(hit.token, "+12.34");
        assert!((hit.value - 12.34).abs() < 1e-9);
    }

    #[test]
    fn embedded_decimal_meters() {
        let hit = m("DIST 12.34M CAM1");
        assert_eq!(hit.pattern_name, "embedded_decimal_meters");
        assert_eq!(hit.token, "12.34M");
        assert!((hit.pattern_confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn out_of_range_match_does_not_hide_later_reading() {
        let hit = m("1500.0M 12.34M");
        assert_eq!(hit.pattern_name, "embedded_decimal_meters");
        assert_eq!(hit.token, "12.34M");
        assert!((hit.value - 12.34).abs() < 1e-9);
    }

    #[test]
    fn spaced_decimal_meters() {
        let hit = m("at 7.5 m from MH1");
        assert_eq!(hit.pattern_name, "spaced_decimal_meters");
        assert_eq!(hit.token, "7.5 m");
    }

    #[test]
    fn integer_meters_has_no_boost() {
        let hit = m("15m");
        assert_eq!(hit.pattern_name, "integer_meters");
        assert!((hit.pattern_confidence - 0.6).abs() < f32::EPSILON);
        assert!(!hit.has_decimal);
    }

    #[test]
    fn integer_meters_does_not_match_fraction_digits() {
        // The "34m" tail of a decimal must not surface as its own integer reading.
        let hit = m("x 12.34m");
        assert_eq!(hit.value, 12.34);
    }

    #[test]
    fn standalone_integer_is_weak() {
        let hit = m("42");
        assert_eq!(hit.pattern_name, "standalone_integer");
        assert!((hit.pattern_confidence - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn meters_word() {
        let hit = m("23 meters");
        assert_eq!(hit.pattern_name, "meters_word");
        assert!((hit.pattern_confidence - 0.7).abs() < f32::EPSILON);
        let hit = m("12.5 Metres");
        assert_eq!(hit.pattern_name, "meters_word");
        assert!((hit.pattern_confidence - 0.91).abs() < 1e-6);
    }

    #[test]
    fn centimeters_are_converted() {
        let hit = m("150cm");
        assert_eq!(hit.pattern_name, "centimeters");
        assert!((hit.value - 1.5).abs() < 1e-9);
        assert!((hit.pattern_confidence - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn millimeters_are_converted_and_capped() {
        for text in ["2340mm", "2340MM", "2.5mm", "12 mM"] {
            let hit = m(text);
            assert_eq!(hit.pattern_name, "millimeters", "{text}");
            assert!(hit.pattern_confidence <= thresholds::MILLIMETER_CAP, "{text}");
        }
        assert!((m("2340mm").value - 2.34).abs() < 1e-9);
        assert!(contains_millimeter_token("pipe 300MM"));
        assert!(!contains_millimeter_token("12.3m"));
    }

    #[test]
    fn out_of_range_values_are_discarded() {
        assert!(best_match("1234.5").is_none());
        assert!(best_match("5000m").is_none());
        // Same digits as centimetres fit the range.
        assert!((m("5000cm").value - 50.0).abs() < 1e-9);
    }

    #[test]
    fn non_distance_text_does_not_match() {
        assert!(best_match("ROOT INTRUSION").is_none());
        assert!(best_match("").is_none());
        assert!(best_match("   ").is_none());
        assert!(best_match("MH12").is_none());
    }

    #[test]
    fn decimal_boost_is_capped() {
        assert!((boosted_confidence(0.9, true, false) - 1.0).abs() < f32::EPSILON);
        assert!((boosted_confidence(0.6, true, false) - 0.78).abs() < 1e-6);
        assert!((boosted_confidence(0.6, false, false) - 0.6).abs() < f32::EPSILON);
        assert!(boosted_confidence(0.9, true, true) <= thresholds::MILLIMETER_CAP);
    }
}
