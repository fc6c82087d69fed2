//! Confidence Normalizer
//!
//! Every confidence leaving this crate is clamped to `[0, 1]` and rounded to
//! four decimal digits. Scores are not recalibrated between providers: 0.9 from
//! the local model and 0.9 from a remote API are treated alike.

use crate::types::{Alternate, RawClassification};

/// Decimal digits kept on every confidence value
pub const CONFIDENCE_DECIMALS: i32 = 4;

/// Top entry plus this many alternates are kept for display
pub const MAX_ALTERNATES: usize = 4;

/// Clamp to `[0, 1]` and round to 4 decimals
///
/// NaN is treated as no confidence at all.
pub fn normalize(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    let scale = 10f64.powi(CONFIDENCE_DECIMALS);
    (score.clamp(0.0, 1.0) * scale).round() / scale
}

/// Package ranked provider entries for display
///
/// Returns the top entry followed by up to [`MAX_ALTERNATES`] further
/// candidates, each with a normalised confidence and its provider-native label.
pub fn alternates(raw: &RawClassification) -> Vec<Alternate> {
    raw.entries
        .iter()
        .take(1 + MAX_ALTERNATES)
        .map(|entry| Alternate {
            label: entry.label.clone(),
            confidence: normalize(entry.score),
        })
        .collect()
}

/// Express a normalised confidence as a percentage with one decimal
pub fn as_percent(confidence: f64) -> f64 {
    (confidence * 1000.0).round() / 10.0
}
