use serde::{Deserialize, Serialize};

pub const HIGH_THRESHOLD: f64 = 0.85;
pub const MEDIUM_THRESHOLD: f64 = 0.65;
pub const LOW_THRESHOLD: f64 = 0.4;
pub const DEFAULT_PERCENT_DECIMALS: u32 = 1;
pub const MAX_PERCENT_DECIMALS: u32 = 12;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Critical,
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Brings a score reported either as a fraction or as a percentage onto the
/// [0, 1] scale. Anything at or below 1.0 is taken to be a fraction already.
pub fn normalize_score(raw: f64) -> f64 {
    if raw > 1.0 { raw / 100.0 } else { raw }
}

/// NaN fails every comparison and lands in `Critical`.
pub fn confidence_level(normalized: f64) -> ConfidenceLevel {
    if normalized >= HIGH_THRESHOLD {
        ConfidenceLevel::High
    } else if normalized >= MEDIUM_THRESHOLD {
        ConfidenceLevel::Medium
    } else if normalized >= LOW_THRESHOLD {
        ConfidenceLevel::Low
    } else {
        ConfidenceLevel::Critical
    }
}

/// Renders `normalized * 100` with `decimals` places, rounding half away
/// from zero. `decimals` is capped at `MAX_PERCENT_DECIMALS`.
pub fn to_percentage(normalized: f64, decimals: u32) -> String {
    let decimals = decimals.min(MAX_PERCENT_DECIMALS);
    let precision = decimals as usize;
    let factor = 10_f64.powi(decimals as i32);
    let scaled = normalized * 100.0 * factor;
    if !scaled.is_finite() {
        return format!("{:.*}", precision, normalized * 100.0);
    }

    let rounded = scaled.round() / factor;
    // avoid printing "-0.0" for tiny negatives that round to zero
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{:.*}", precision, rounded)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{
        ConfidenceLevel, MAX_PERCENT_DECIMALS, confidence_level, normalize_score, to_percentage,
    };

    #[test]
    fn normalize_score_divides_percentage_form_only() {
        assert_eq!(normalize_score(87.5), 0.875);
        assert_eq!(normalize_score(0.42), 0.42);
        assert_eq!(normalize_score(1.0), 1.0);
        assert_eq!(normalize_score(1.5), 0.015);
    }

    #[test]
    fn normalize_score_passes_out_of_range_values_through() {
        assert_eq!(normalize_score(250.0), 2.5);
        assert_eq!(normalize_score(-3.0), -3.0);
        assert!(normalize_score(f64::NAN).is_nan());
    }

    #[test]
    fn confidence_level_boundaries_favor_higher_band() {
        assert_eq!(confidence_level(0.85), ConfidenceLevel::High);
        assert_eq!(confidence_level(0.849999), ConfidenceLevel::Medium);
        assert_eq!(confidence_level(0.65), ConfidenceLevel::Medium);
        assert_eq!(confidence_level(0.649999), ConfidenceLevel::Low);
        assert_eq!(confidence_level(0.4), ConfidenceLevel::Low);
        assert_eq!(confidence_level(0.399999), ConfidenceLevel::Critical);
    }

    #[test]
    fn malformed_scores_fall_through_to_critical() {
        assert_eq!(confidence_level(f64::NAN), ConfidenceLevel::Critical);
        assert_eq!(confidence_level(-0.2), ConfidenceLevel::Critical);
    }

    #[test]
    fn confidence_levels_are_totally_ordered() {
        assert!(ConfidenceLevel::Critical < ConfidenceLevel::Low);
        assert!(ConfidenceLevel::Low < ConfidenceLevel::Medium);
        assert!(ConfidenceLevel::Medium < ConfidenceLevel::High);
    }

    #[test]
    fn to_percentage_rounds_half_away_from_zero() {
        assert_eq!(to_percentage(0.8125, 1), "81.3");
        assert_eq!(to_percentage(0.8125, 2), "81.25");
        assert_eq!(to_percentage(0.5, 0), "50");
        assert_eq!(to_percentage(0.005, 0), "1");
        assert_eq!(to_percentage(-0.005, 0), "-1");
        assert_eq!(to_percentage(1.0, 1), "100.0");
    }

    #[test]
    fn to_percentage_caps_excessive_decimals() {
        let capped = "0".repeat(MAX_PERCENT_DECIMALS as usize);
        assert_eq!(to_percentage(0.5, 70_000), format!("50.{capped}"));
        assert_eq!(to_percentage(0.5, 3_000_000_000), format!("50.{capped}"));
        assert_eq!(to_percentage(0.5, u32::MAX), format!("50.{capped}"));
        assert_eq!(to_percentage(f64::NAN, 70_000), "NaN");
        assert_eq!(to_percentage(0.12345, 2), "12.35");
    }

    #[test]
    fn to_percentage_does_not_emit_negative_zero() {
        assert_eq!(to_percentage(-0.0001, 1), "0.0");
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent_for_fractions(x in -5.0_f64..=1.0) {
            let once = normalize_score(x);
            prop_assert_eq!(normalize_score(once), once);
        }

        #[test]
        fn percentage_form_lands_in_unit_interval(x in 1.0001_f64..=100.0) {
            let normalized = normalize_score(x);
            prop_assert!(normalized > 0.0 && normalized <= 1.0);
        }
    }
}
