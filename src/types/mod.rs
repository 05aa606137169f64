//! Type definitions for the location engine

pub mod district;
pub mod prediction;
pub mod query;

pub use district::{CompetitionLevel, DistrictProfile, DistrictTable};
pub use prediction::{AssessmentReport, PredictionResult, Recommendation, RiskLevel};
pub use query::BusinessQuery;
