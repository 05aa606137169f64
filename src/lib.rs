//! FnB Location Engine Library
//!
//! Feature engineering, business-plausibility validation and risk scoring
//! for restaurant location recommendations in Bandung.

pub mod config;
pub mod encoder;
pub mod error;
pub mod feature_extractor;
pub mod insights;
pub mod metrics;
pub mod models;
pub mod types;
pub mod validator;

pub use config::AppConfig;
pub use encoder::CategoryEncoder;
pub use error::{DistrictError, EncodeError, InferenceError, PredictError};
pub use feature_extractor::{FeatureExtractor, FeatureVector, FormulaVariant};
pub use models::inference::PredictionEngine;
pub use types::{
    district::{DistrictProfile, DistrictTable},
    prediction::{AssessmentReport, PredictionResult, RiskLevel},
    query::BusinessQuery,
};
pub use validator::{validate, ValidationOutcome};
