//! Prediction results and assessment reports

use crate::insights::Insights;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Risk level classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Bucket a risk score; bounds are inclusive upper limits
    pub fn from_score(score: f64, thresholds: &RiskLevelThresholds) -> Self {
        if score <= thresholds.low {
            RiskLevel::Low
        } else if score <= thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

/// Configurable risk level thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLevelThresholds {
    /// Scores up to and including this are low risk
    pub low: f64,
    /// Scores up to and including this are medium risk
    pub medium: f64,
}

impl Default for RiskLevelThresholds {
    fn default() -> Self {
        Self {
            low: 0.3,
            medium: 0.6,
        }
    }
}

/// The three business-viability recommendations the classifier is trained on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    Go,
    Consider,
    Avoid,
}

impl Recommendation {
    /// Interpret a decoded class label; labels outside the known set yield `None`
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "go" => Some(Recommendation::Go),
            "consider" => Some(Recommendation::Consider),
            "avoid" => Some(Recommendation::Avoid),
            _ => None,
        }
    }
}

/// Probability assigned to one class label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassProbability {
    pub label: String,
    pub probability: f64,
}

/// Outcome of a successful prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Decoded arg-max label
    pub label: String,

    /// Label interpreted as a known recommendation
    pub recommendation: Option<Recommendation>,

    /// Per-class probabilities in class-index order
    pub class_probabilities: Vec<ClassProbability>,

    /// Probability of the predicted label
    pub confidence: f64,

    /// Probability-weighted rating implied by the class distribution
    pub rating_estimate: f64,

    /// Target reviews per resident
    pub saturation: f64,

    /// Engineered competition density fed to the classifier
    pub competition_density: f64,

    /// Composite risk score (0.0 - 1.0)
    pub risk_score: f64,

    /// Risk level classification
    pub risk_level: RiskLevel,

    /// Advisory validation messages
    pub warnings: Vec<String>,
}

impl PredictionResult {
    /// Probability of a label, if the classifier knows it
    pub fn probability_of(&self, label: &str) -> Option<f64> {
        self.class_probabilities
            .iter()
            .find(|c| c.label == label)
            .map(|c| c.probability)
    }
}

/// Self-contained record of one assessment, as emitted by the binary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentReport {
    /// Unique report identifier
    pub report_id: String,

    /// Identifier of the originating query
    pub query_id: String,

    /// Resolved district key
    pub district: String,

    /// Prediction details
    pub result: PredictionResult,

    /// Interpretation of the prediction
    pub insights: Insights,

    /// Report generation timestamp
    pub timestamp: DateTime<Utc>,
}

impl AssessmentReport {
    pub fn new(query_id: &str, district: &str, result: PredictionResult, insights: Insights) -> Self {
        Self {
            report_id: uuid::Uuid::new_v4().to_string(),
            query_id: query_id.to_string(),
            district: district.to_string(),
            result,
            insights,
            timestamp: Utc::now(),
        }
    }
}
