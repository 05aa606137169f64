//! Trained model components

pub mod classifier;
pub mod inference;
pub mod loader;
pub mod risk;
pub mod scaler;

pub use classifier::{Classifier, OnnxClassifier};
pub use inference::PredictionEngine;
pub use loader::{ClassLabels, LoadedModel, ModelArtifacts};
pub use risk::{RiskScorer, RiskWeights};
pub use scaler::StandardScaler;
