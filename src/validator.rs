//! Business plausibility checks for target rating / review combinations.
//!
//! Thresholds come from percentiles of the Bandung Google Maps snapshot the
//! classifier was trained on (mean rating 4.51, mean review count 517).
//! They have not been re-derived since that snapshot and should be
//! revalidated whenever the training data is refreshed.

use crate::types::district::DistrictProfile;
use serde::{Deserialize, Serialize};

/// Ratings at or above this are rare outside small review counts.
pub const EXCEPTIONAL_RATING: f64 = 4.8;
/// Hard review ceiling for exceptional ratings.
pub const EXCEPTIONAL_RATING_MAX_REVIEWS: u32 = 200;
/// Advisory review ceiling for exceptional ratings.
pub const EXCEPTIONAL_RATING_WARN_REVIEWS: u32 = 100;

pub const EXCELLENT_RATING: f64 = 4.5;
pub const EXCELLENT_RATING_HIGH_REVIEWS: u32 = 1000;
pub const EXCELLENT_RATING_WARN_REVIEWS: u32 = 500;

/// Absolute review ceiling (above the observed maximum).
pub const MAX_REVIEWS: u32 = 5000;
/// Roughly the 99th review-count percentile.
pub const P99_REVIEWS: u32 = 2800;
/// Roughly the 90th review-count percentile.
pub const P90_REVIEWS: u32 = 950;

/// Reviews as a percentage of district population.
pub const MAX_REVIEW_PCT: f64 = 3.0;
pub const WARN_REVIEW_PCT: f64 = 1.0;

pub const MIN_RATING: f64 = 3.0;
pub const LOW_RATING: f64 = 3.5;

/// Below this rating, more than [`LOW_RATING_MAX_REVIEWS`] is inconsistent.
pub const GOOD_RATING: f64 = 4.0;
pub const LOW_RATING_MAX_REVIEWS: u32 = 500;

/// Warnings (advisory) and errors (blocking), in rule order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    fn error(&mut self, message: String) {
        self.errors.push(message);
    }
}

/// Check a target rating / review combination against historical bounds.
///
/// Every rule is evaluated; messages accumulate in rule order. Domain
/// violations are reported in the outcome, never as failures.
pub fn validate(
    target_reviews: u32,
    target_rating: f64,
    district: &DistrictProfile,
) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();

    // Rating vs. review volume
    if target_rating >= EXCEPTIONAL_RATING {
        if target_reviews > EXCEPTIONAL_RATING_MAX_REVIEWS {
            outcome.error(format!(
                "Rating {target_rating:.1} with {target_reviews} reviews is unrealistic: \
                 ratings >= {EXCEPTIONAL_RATING} are only observed with at most \
                 {EXCEPTIONAL_RATING_MAX_REVIEWS} reviews"
            ));
        } else if target_reviews > EXCEPTIONAL_RATING_WARN_REVIEWS {
            outcome.warn(format!(
                "Rating {target_rating:.1} with {target_reviews} reviews is rare: \
                 ratings >= {EXCEPTIONAL_RATING} usually have fewer than \
                 {EXCEPTIONAL_RATING_WARN_REVIEWS} reviews"
            ));
        }
    } else if target_rating >= EXCELLENT_RATING {
        if target_reviews > EXCELLENT_RATING_HIGH_REVIEWS {
            outcome.warn(format!(
                "Rating {target_rating:.1} with {target_reviews} reviews is very ambitious: \
                 few places rated >= {EXCELLENT_RATING} exceed {EXCELLENT_RATING_HIGH_REVIEWS} reviews"
            ));
        } else if target_reviews > EXCELLENT_RATING_WARN_REVIEWS {
            outcome.warn(format!(
                "Rating {target_rating:.1} with {target_reviews} reviews is ambitious: \
                 places rated >= {EXCELLENT_RATING} rarely exceed {EXCELLENT_RATING_WARN_REVIEWS} reviews"
            ));
        }
    }

    // Absolute review volume
    if target_reviews > MAX_REVIEWS {
        outcome.error(format!(
            "{target_reviews} reviews exceeds the maximum of {MAX_REVIEWS} observed in Bandung"
        ));
    } else if target_reviews > P99_REVIEWS {
        outcome.warn(format!(
            "{target_reviews} reviews is above the 99th percentile ({P99_REVIEWS})"
        ));
    } else if target_reviews > P90_REVIEWS {
        outcome.warn(format!(
            "{target_reviews} reviews is above the 90th percentile ({P90_REVIEWS})"
        ));
    }

    // Reviews relative to population
    let review_pct = target_reviews as f64 / district.population() as f64 * 100.0;
    if review_pct > MAX_REVIEW_PCT {
        outcome.error(format!(
            "{target_reviews} reviews is {review_pct:.2}% of the {} population of {}, \
             above the {MAX_REVIEW_PCT}% limit",
            district.population(),
            district.name()
        ));
    } else if review_pct > WARN_REVIEW_PCT {
        outcome.warn(format!(
            "{target_reviews} reviews is {review_pct:.2}% of the {} population of {}, \
             above the usual {WARN_REVIEW_PCT}%",
            district.population(),
            district.name()
        ));
    }

    // Minimum rating
    if target_rating < MIN_RATING {
        outcome.error(format!(
            "Target rating {target_rating:.1} is below the minimum of {MIN_RATING:.1}"
        ));
    } else if target_rating < LOW_RATING {
        outcome.warn(format!(
            "Target rating {target_rating:.1} is below {LOW_RATING:.1} and may hurt viability"
        ));
    }

    if target_rating < GOOD_RATING && target_reviews > LOW_RATING_MAX_REVIEWS {
        outcome.warn(format!(
            "Rating {target_rating:.1} with {target_reviews} reviews is inconsistent: \
             places rated below {GOOD_RATING:.1} rarely exceed {LOW_RATING_MAX_REVIEWS} reviews"
        ));
    }

    outcome
}
