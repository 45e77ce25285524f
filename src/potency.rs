//! Potency recommendation.
//!
//! Pure, stateless mapping from (final score, case acuity) to a dilution
//! label. Acute cases lean on lower potencies; chronic cases escalate to
//! 200C/1M territory only on very strong matches.

use crate::models::Acuity;

/// Map a bounded score and an acuity hint to a potency label.
/// Total over score ∈ [0, 100] and both acuity values.
pub fn recommend_potency(score: u32, acuity: Acuity) -> &'static str {
    match acuity {
        Acuity::Acute => {
            if score >= 80 {
                "30C"
            } else if score >= 60 {
                "12C"
            } else {
                "6C"
            }
        }
        Acuity::Chronic => {
            if score >= 90 {
                "1M"
            } else if score >= 70 {
                "200C"
            } else if score >= 50 {
                "30C"
            } else {
                "12C"
            }
        }
    }
}
