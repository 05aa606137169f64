//! Human-readable interpretation of a prediction

use crate::types::district::{CompetitionLevel, DistrictProfile, ReviewRange};
use crate::types::prediction::PredictionResult;
use crate::types::query::BusinessQuery;
use serde::{Deserialize, Serialize};

pub const HIGH_CONFIDENCE: f64 = 0.7;
pub const MEDIUM_CONFIDENCE: f64 = 0.5;

pub const HIGH_REVIEW_TARGET: u32 = 500;
pub const MEDIUM_REVIEW_TARGET: u32 = 150;

pub const HIGH_DENSITY: f64 = 20_000.0;
pub const LOW_DENSITY: f64 = 10_000.0;

/// Confidence in the predicted label, from its probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    #[default]
    Low,
}

impl ConfidenceLevel {
    pub fn from_probability(probability: f64) -> Self {
        if probability > HIGH_CONFIDENCE {
            ConfidenceLevel::High
        } else if probability > MEDIUM_CONFIDENCE {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

/// What the review target says about the market the query aims at.
///
/// The classifier learned review volume as a proxy for area competition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReviewTargetBand {
    /// Above 500: crowded area, heavy investment needed
    High,
    /// 150 to 500: balanced competition
    Medium,
    /// Below 150: emerging area
    #[default]
    Low,
}

impl ReviewTargetBand {
    pub fn from_reviews(reviews: u32) -> Self {
        if reviews > HIGH_REVIEW_TARGET {
            ReviewTargetBand::High
        } else if reviews >= MEDIUM_REVIEW_TARGET {
            ReviewTargetBand::Medium
        } else {
            ReviewTargetBand::Low
        }
    }
}

/// Notable characteristics of a district
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationInsight {
    HighDensity,
    LowDensity,
    StrongMallPresence,
    FewMalls,
    DenseRetail,
    SparseRetail,
    GreenSpace,
}

impl LocationInsight {
    pub fn message(&self) -> &'static str {
        match self {
            LocationInsight::HighDensity => "High density: large pool of potential walk-in customers",
            LocationInsight::LowDensity => "Low density: focus on loyalty and repeat customers",
            LocationInsight::StrongMallPresence => {
                "Good mall coverage: strong competition but easy customer access"
            }
            LocationInsight::FewMalls => "Few malls: room to be a pioneer in this area",
            LocationInsight::DenseRetail => "Dense retail: active commercial area with good spending power",
            LocationInsight::SparseRetail => "Sparse retail: weigh accessibility and convenience",
            LocationInsight::GreenSpace => "Plenty of green space: family-friendly, suits family dining",
        }
    }
}

/// Interpretation attached to an assessment report
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Insights {
    pub confidence: ConfidenceLevel,
    pub review_band: ReviewTargetBand,
    pub competition: CompetitionLevel,
    /// Realistic review targets for the district's competition level
    pub review_range: ReviewRange,
    pub review_target_realistic: bool,
    pub location: Vec<LocationInsight>,
    pub recommendations: Vec<String>,
}

/// Derive insights from a district, the query and its prediction
pub fn interpret(
    district: &DistrictProfile,
    query: &BusinessQuery,
    result: &PredictionResult,
) -> Insights {
    let competition = district.competition();
    let review_range = competition.review_range();

    Insights {
        confidence: ConfidenceLevel::from_probability(result.confidence),
        review_band: ReviewTargetBand::from_reviews(query.target_reviews),
        competition,
        review_range,
        review_target_realistic: review_range.contains(query.target_reviews),
        location: location_insights(district),
        recommendations: recommendations(district, result),
    }
}

/// Density, mall, minimarket and park observations for a district
pub fn location_insights(district: &DistrictProfile) -> Vec<LocationInsight> {
    let mut insights = Vec::new();

    if district.density() > HIGH_DENSITY {
        insights.push(LocationInsight::HighDensity);
    } else if district.density() < LOW_DENSITY {
        insights.push(LocationInsight::LowDensity);
    }

    if district.malls() >= 3.0 {
        insights.push(LocationInsight::StrongMallPresence);
    } else if district.malls() < 2.0 {
        insights.push(LocationInsight::FewMalls);
    }

    if district.minimarkets() > 30.0 {
        insights.push(LocationInsight::DenseRetail);
    } else if district.minimarkets() < 15.0 {
        insights.push(LocationInsight::SparseRetail);
    }

    if district.parks() > 40.0 {
        insights.push(LocationInsight::GreenSpace);
    }

    insights
}

/// Business advice driven by the risk components
pub fn recommendations(district: &DistrictProfile, result: &PredictionResult) -> Vec<String> {
    let mut advice: Vec<&str> = Vec::new();

    if result.rating_estimate < 3.5 {
        advice.push("Focus on exceptional food quality and service");
        advice.push("Consider a unique value proposition to stand out");
    }

    if result.saturation > 0.001 {
        advice.push("Differentiate with a specialized cuisine or concept");
        advice.push("Implement a competitive pricing strategy");
    }

    if result.competition_density > 5.0 {
        advice.push("Invest in strong marketing and branding");
        advice.push("Focus on exceptional customer experience");
    }

    if district.population() < 50_000 {
        advice.push("Target tourists or office workers");
        advice.push("Host events to attract customers from nearby areas");
    }

    if result.risk_score > 0.6 {
        advice.push("Consider alternative locations or business models");
        advice.push("Ensure strong financial reserves for the initial period");
    } else if result.risk_score < 0.3 {
        advice.push("Good location fundamentals, focus on execution");
        advice.push("Monitor market trends for expansion opportunities");
    }

    advice.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::prediction::RiskLevel;

    fn result(confidence: f64, rating_estimate: f64, risk_score: f64) -> PredictionResult {
        PredictionResult {
            label: "Go".to_string(),
            recommendation: None,
            class_probabilities: Vec::new(),
            confidence,
            rating_estimate,
            saturation: 0.0005,
            competition_density: 2.0,
            risk_score,
            risk_level: RiskLevel::Medium,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_confidence_levels() {
        assert_eq!(ConfidenceLevel::from_probability(0.71), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_probability(0.7), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_probability(0.5), ConfidenceLevel::Low);
    }

    #[test]
    fn test_review_bands() {
        assert_eq!(ReviewTargetBand::from_reviews(501), ReviewTargetBand::High);
        assert_eq!(ReviewTargetBand::from_reviews(500), ReviewTargetBand::Medium);
        assert_eq!(ReviewTargetBand::from_reviews(150), ReviewTargetBand::Medium);
        assert_eq!(ReviewTargetBand::from_reviews(149), ReviewTargetBand::Low);
    }

    #[test]
    fn test_location_insights() {
        // density ~23 488, one mall, 20 minimarkets, 34 parks
        let andir = DistrictProfile::new("Andir", 99119, 4.22, 1.0, 20.0, 34.0).unwrap();
        assert_eq!(
            location_insights(&andir),
            vec![LocationInsight::HighDensity, LocationInsight::FewMalls]
        );

        let outskirts = DistrictProfile::new("Outskirts", 40000, 8.0, 3.0, 35.0, 45.0).unwrap();
        assert_eq!(
            location_insights(&outskirts),
            vec![
                LocationInsight::LowDensity,
                LocationInsight::StrongMallPresence,
                LocationInsight::DenseRetail,
                LocationInsight::GreenSpace,
            ]
        );
        assert!(!LocationInsight::GreenSpace.message().is_empty());
    }

    #[test]
    fn test_recommendations() {
        let small = DistrictProfile::new("Small", 40000, 8.0, 3.0, 35.0, 45.0).unwrap();

        let risky = recommendations(&small, &result(0.4, 3.2, 0.7));
        assert!(risky.iter().any(|r| r.contains("food quality")));
        assert!(risky.iter().any(|r| r.contains("tourists")));
        assert!(risky.iter().any(|r| r.contains("alternative locations")));

        let safe = recommendations(&small, &result(0.9, 4.4, 0.2));
        assert!(!safe.iter().any(|r| r.contains("food quality")));
        assert!(safe.iter().any(|r| r.contains("fundamentals")));
    }

    #[test]
    fn test_interpret() {
        let district = DistrictProfile::new("Coblong", 130000, 7.35, 4.0, 40.0, 30.0)
            .unwrap()
            .with_competition(CompetitionLevel::High);
        let query = BusinessQuery::new("coblong", "Cafe", 2, 4.3, 300);

        let insights = interpret(&district, &query, &result(0.8, 4.2, 0.45));

        assert_eq!(insights.confidence, ConfidenceLevel::High);
        assert_eq!(insights.review_band, ReviewTargetBand::Medium);
        assert_eq!(insights.competition, CompetitionLevel::High);
        assert!(insights.review_target_realistic);
        assert_eq!(insights.review_range.recommended, 400);
    }
}
