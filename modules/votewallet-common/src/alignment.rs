//! Alignment match scoring.
//!
//! One shared function, one scale: user weights and business values are both
//! 0-100, and the score is 0-100. The pipeline uses it for quality ranking;
//! the product surfaces use it for match percentages.

use crate::types::{AlignmentAxis, AlignmentVector};

/// Compute a 0-100 match between a user value-vector and a business
/// value-vector.
///
/// Weighted average of business values over the axes the user cares about
/// (weight > 0). A user with no weights set scores 0 against everything, and
/// a business unrated on every axis the user cares about scores 0 — "no
/// opinion, no match claim" rather than a fabricated neutral score.
pub fn score(user: &AlignmentVector, business: &AlignmentVector) -> u8 {
    let mut weighted = 0.0;
    let mut total_weight = 0.0;

    for axis in AlignmentAxis::ALL {
        let weight = user.get(axis);
        if weight > 0.0 {
            weighted += business.get(axis) * weight;
            total_weight += weight;
        }
    }

    if total_weight == 0.0 {
        return 0;
    }

    (weighted / total_weight).round().clamp(0.0, 100.0) as u8
}
