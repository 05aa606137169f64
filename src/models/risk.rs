//! Composite risk scoring from class probabilities and market pressure

use crate::types::prediction::{RiskLevel, RiskLevelThresholds};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rating assumed for labels without a configured anchor
pub const NEUTRAL_RATING: f64 = 3.0;

/// Saturation (reviews per resident) at which the saturation term maxes out
pub const SATURATION_CEILING: f64 = 0.001;

/// Competition density at which the competition term maxes out
pub const COMPETITION_CEILING: f64 = 10.0;

/// Weights of the three risk components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskWeights {
    pub rating: f64,
    pub saturation: f64,
    pub competition: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            rating: 0.5,
            saturation: 0.3,
            competition: 0.2,
        }
    }
}

/// Default per-label rating anchors
pub fn default_label_ratings() -> HashMap<String, f64> {
    let mut ratings = HashMap::new();
    ratings.insert("Go".to_string(), 4.5);
    ratings.insert("Consider".to_string(), 3.75);
    ratings.insert("Avoid".to_string(), 3.0);
    ratings
}

/// Turns a class distribution plus market pressure into a risk score in [0, 1].
///
/// `score = w_r * (5 - rating)/4 + w_s * min(saturation * 1000, 1) + w_c * min(density / 10, 1)`
#[derive(Debug, Clone)]
pub struct RiskScorer {
    weights: RiskWeights,
    thresholds: RiskLevelThresholds,
    label_ratings: HashMap<String, f64>,
}

impl RiskScorer {
    pub fn new(
        weights: RiskWeights,
        thresholds: RiskLevelThresholds,
        label_ratings: HashMap<String, f64>,
    ) -> Self {
        // keys may arrive lowercased from the config layer
        let label_ratings = label_ratings
            .into_iter()
            .map(|(label, rating)| (label.to_lowercase(), rating))
            .collect();

        Self {
            weights,
            thresholds,
            label_ratings,
        }
    }

    /// Rating anchor for a class label (case-insensitive)
    pub fn label_rating(&self, label: &str) -> f64 {
        self.label_ratings
            .get(&label.to_lowercase())
            .copied()
            .unwrap_or(NEUTRAL_RATING)
    }

    /// Probability-weighted rating over `(label, probability)` pairs
    pub fn rating_estimate<'a>(&self, distribution: impl Iterator<Item = (&'a str, f64)>) -> f64 {
        let (weighted, total) = distribution.fold((0.0, 0.0), |(weighted, total), (label, p)| {
            (weighted + p * self.label_rating(label), total + p)
        });

        if total > 0.0 {
            weighted / total
        } else {
            NEUTRAL_RATING
        }
    }

    /// Composite risk score, clipped to [0, 1]
    pub fn score(&self, rating_estimate: f64, saturation: f64, competition_density: f64) -> f64 {
        let rating_risk = (5.0 - rating_estimate) / 4.0;
        let saturation_risk = (saturation / SATURATION_CEILING).min(1.0);
        let competition_risk = (competition_density / COMPETITION_CEILING).min(1.0);

        let score = self.weights.rating * rating_risk
            + self.weights.saturation * saturation_risk
            + self.weights.competition * competition_risk;

        if score.is_nan() {
            return 1.0;
        }
        score.clamp(0.0, 1.0)
    }

    pub fn level(&self, score: f64) -> RiskLevel {
        RiskLevel::from_score(score, &self.thresholds)
    }

    pub fn weights(&self) -> &RiskWeights {
        &self.weights
    }

    pub fn thresholds(&self) -> &RiskLevelThresholds {
        &self.thresholds
    }
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self::new(
            RiskWeights::default(),
            RiskLevelThresholds::default(),
            default_label_ratings(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_estimate() {
        let scorer = RiskScorer::default();

        let certain_go = scorer.rating_estimate(vec![("Avoid", 0.0), ("Consider", 0.0), ("Go", 1.0)].into_iter());
        assert!((certain_go - 4.5).abs() < 1e-9);

        let mixed = scorer.rating_estimate(vec![("Avoid", 0.2), ("Consider", 0.3), ("Go", 0.5)].into_iter());
        assert!((mixed - (0.2 * 3.0 + 0.3 * 3.75 + 0.5 * 4.5)).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_label_is_neutral() {
        let scorer = RiskScorer::default();
        assert_eq!(scorer.label_rating("Maybe"), NEUTRAL_RATING);
        assert_eq!(scorer.label_rating("go"), 4.5);
        assert_eq!(scorer.rating_estimate(std::iter::empty()), NEUTRAL_RATING);
    }

    #[test]
    fn test_score_formula() {
        let scorer = RiskScorer::default();
        // 0.5 * 0.25 + 0.3 * 0.5 + 0.2 * 0.4
        let score = scorer.score(4.0, 0.0005, 4.0);
        assert!((score - 0.355).abs() < 1e-9);
        assert_eq!(scorer.level(score), RiskLevel::Medium);
    }

    #[test]
    fn test_score_is_clipped() {
        let scorer = RiskScorer::default();
        assert_eq!(scorer.score(0.0, 1.0, 100.0), 1.0);
        assert_eq!(scorer.score(10.0, 0.0, 0.0), 0.0);
        assert_eq!(scorer.score(f64::NAN, 0.0, 0.0), 1.0);
    }

    #[test]
    fn test_score_is_monotonic() {
        let scorer = RiskScorer::default();

        let mut previous = f64::NEG_INFINITY;
        for step in 0..=40 {
            let rating = 5.0 - step as f64 * 0.1;
            let score = scorer.score(rating, 0.0004, 3.0);
            assert!(score >= previous);
            previous = score;
        }

        let mut previous = f64::NEG_INFINITY;
        for step in 0..=30 {
            let saturation = step as f64 * 0.0001;
            let score = scorer.score(4.0, saturation, 3.0);
            assert!(score >= previous);
            previous = score;
        }

        let mut previous = f64::NEG_INFINITY;
        for step in 0..=30 {
            let density = step as f64 * 0.5;
            let score = scorer.score(4.0, 0.0004, density);
            assert!(score >= previous);
            previous = score;
        }
    }

    #[test]
    fn test_levels() {
        let scorer = RiskScorer::default();
        assert_eq!(scorer.level(0.3), RiskLevel::Low);
        assert_eq!(scorer.level(0.31), RiskLevel::Medium);
        assert_eq!(scorer.level(0.6), RiskLevel::Medium);
        assert_eq!(scorer.level(0.61), RiskLevel::High);
    }
}
