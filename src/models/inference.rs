//! Prediction engine: validation, encoding, features, classification, risk

use crate::config::AppConfig;
use crate::encoder::{encode_price_tier, CategoryEncoder};
use crate::error::{EncodeError, InferenceError, PredictError};
use crate::feature_extractor::{FeatureExtractor, FormulaVariant};
use crate::insights;
use crate::models::classifier::{Classifier, OnnxClassifier};
use crate::models::loader::{ClassLabels, ModelArtifacts};
use crate::models::risk::RiskScorer;
use crate::models::scaler::StandardScaler;
use crate::types::district::{DistrictProfile, DistrictTable};
use crate::types::prediction::{
    AssessmentReport, ClassProbability, PredictionResult, Recommendation,
};
use crate::types::query::BusinessQuery;
use crate::validator::validate;
use anyhow::Result;
use tracing::{debug, info};

pub const MIN_TARGET_RATING: f64 = 1.0;
pub const MAX_TARGET_RATING: f64 = 5.0;

/// Allowed deviation of the probability sum from 1.0
pub const PROBABILITY_TOLERANCE: f64 = 1e-3;

/// Location prediction engine around an injected classifier.
///
/// Holds only immutable state, so one engine can serve concurrent callers
/// as long as the classifier is `Sync`.
pub struct PredictionEngine<C: Classifier> {
    classifier: C,
    extractor: FeatureExtractor,
    categories: CategoryEncoder,
    labels: ClassLabels,
    scaler: Option<StandardScaler>,
    risk: RiskScorer,
}

impl PredictionEngine<OnnxClassifier> {
    /// Create an engine from configuration, loading artifacts and the ONNX model
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let artifacts = ModelArtifacts::load(&config.models)?;
        let classifier = OnnxClassifier::from_config(&config.models)?;
        let risk = RiskScorer::new(
            config.risk.weights.clone(),
            config.risk.thresholds.clone(),
            config.risk.label_ratings.clone(),
        );

        let engine = Self::new(artifacts, classifier, config.features.formula, risk);

        info!(
            formula = ?config.features.formula,
            features = engine.extractor.feature_count(),
            classes = engine.labels.len(),
            "Prediction engine initialized"
        );

        Ok(engine)
    }
}

impl<C: Classifier> PredictionEngine<C> {
    pub fn new(
        artifacts: ModelArtifacts,
        classifier: C,
        variant: FormulaVariant,
        risk: RiskScorer,
    ) -> Self {
        Self {
            classifier,
            extractor: FeatureExtractor::new(artifacts.feature_names, variant),
            categories: artifacts.categories,
            labels: artifacts.labels,
            scaler: artifacts.scaler,
            risk,
        }
    }

    /// Predict viability and risk for a query against a resolved district.
    ///
    /// Malformed input is rejected before business validation; a query with
    /// validation errors never reaches the classifier.
    pub fn predict(
        &self,
        district: &DistrictProfile,
        query: &BusinessQuery,
    ) -> Result<PredictionResult, PredictError> {
        check_target_rating(query.target_rating)?;
        let category_code = self.categories.encode(&query.category)?;
        let price_code = encode_price_tier(query.price_tier)?;

        let outcome = validate(query.target_reviews, query.target_rating, district);
        if !outcome.is_valid() {
            debug!(
                query_id = %query.query_id,
                district = %district.key(),
                errors = outcome.errors.len(),
                "Query rejected by validation"
            );
            return Err(PredictError::Rejected(outcome));
        }

        let engineered = self
            .extractor
            .engineer(district, query, category_code, price_code);
        let features = self.extractor.project(&engineered);
        let features = match &self.scaler {
            Some(scaler) => scaler.transform(&features)?,
            None => features,
        };

        let probabilities = self.classifier.classify(features.values())?;
        self.check_probabilities(&probabilities)?;

        let best = argmax(&probabilities);
        let label = self
            .labels
            .get(best)
            .ok_or(InferenceError::UnknownClass(best))?
            .to_string();

        let class_probabilities: Vec<ClassProbability> = self
            .labels
            .iter()
            .zip(&probabilities)
            .map(|(label, &probability)| ClassProbability {
                label: label.to_string(),
                probability,
            })
            .collect();

        let rating_estimate = self.risk.rating_estimate(
            class_probabilities
                .iter()
                .map(|c| (c.label.as_str(), c.probability)),
        );
        let saturation = query.target_reviews as f64 / district.population() as f64;
        let competition_density = engineered.competition_density;
        let risk_score = self
            .risk
            .score(rating_estimate, saturation, competition_density);
        let risk_level = self.risk.level(risk_score);

        debug!(
            query_id = %query.query_id,
            district = %district.key(),
            label = %label,
            risk_score = risk_score,
            "Prediction complete"
        );

        Ok(PredictionResult {
            recommendation: Recommendation::from_label(&label),
            label,
            confidence: probabilities[best],
            class_probabilities,
            rating_estimate,
            saturation,
            competition_density,
            risk_score,
            risk_level,
            warnings: outcome.warnings,
        })
    }

    /// Resolve the query's district, predict, and attach insights
    pub fn assess(
        &self,
        districts: &DistrictTable,
        query: &BusinessQuery,
    ) -> Result<AssessmentReport, PredictError> {
        let district = districts.resolve(&query.district)?;
        let result = self.predict(district, query)?;
        let insights = insights::interpret(district, query, &result);

        Ok(AssessmentReport::new(
            &query.query_id,
            district.key(),
            result,
            insights,
        ))
    }

    fn check_probabilities(&self, probabilities: &[f64]) -> Result<(), InferenceError> {
        if probabilities.len() != self.labels.len() {
            return Err(InferenceError::ClassCountMismatch {
                expected: self.labels.len(),
                got: probabilities.len(),
            });
        }

        if let Some(bad) = probabilities.iter().find(|p| !p.is_finite() || **p < 0.0) {
            return Err(InferenceError::MalformedOutput(format!(
                "invalid probability {}",
                bad
            )));
        }

        let sum: f64 = probabilities.iter().sum();
        if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(InferenceError::MalformedOutput(format!(
                "probabilities sum to {:.4}",
                sum
            )));
        }

        Ok(())
    }

    pub fn categories(&self) -> &CategoryEncoder {
        &self.categories
    }

    pub fn labels(&self) -> &ClassLabels {
        &self.labels
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn risk_scorer(&self) -> &RiskScorer {
        &self.risk
    }
}

fn check_target_rating(rating: f64) -> Result<(), EncodeError> {
    if rating.is_finite() && (MIN_TARGET_RATING..=MAX_TARGET_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(EncodeError::OutOfRange {
            field: "target_rating",
            value: rating.to_string(),
            expected: "1.0..=5.0",
        })
    }
}

/// Index of the highest probability; the first one wins ties
fn argmax(probabilities: &[f64]) -> usize {
    let mut best = 0;
    for (index, &p) in probabilities.iter().enumerate() {
        if p > probabilities[best] {
            best = index;
        }
    }
    best
}
