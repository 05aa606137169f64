//! Standardization applied to feature vectors before classification

use crate::error::InferenceError;
use crate::feature_extractor::FeatureVector;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Per-feature `(x - mean) / scale`, as fitted by the training scaler.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        let scaler = Self { mean, scale };
        scaler.check()?;
        Ok(scaler)
    }

    /// Load exported scaler parameters (`{"mean": [..], "scale": [..]}`).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scaler {}", path.display()))?;
        let scaler: Self = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse scaler {}", path.display()))?;
        scaler.check()?;
        Ok(scaler)
    }

    fn check(&self) -> Result<()> {
        if self.mean.len() != self.scale.len() {
            anyhow::bail!(
                "Scaler has {} means but {} scales",
                self.mean.len(),
                self.scale.len()
            );
        }
        if let Some(bad) = self.scale.iter().find(|s| !s.is_finite() || **s == 0.0) {
            anyhow::bail!("Scaler contains invalid scale {}", bad);
        }
        Ok(())
    }

    pub fn feature_count(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, features: &FeatureVector) -> Result<FeatureVector, InferenceError> {
        if features.len() != self.mean.len() {
            return Err(InferenceError::ScalerMismatch {
                expected: self.mean.len(),
                got: features.len(),
            });
        }

        let values = features
            .values()
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect();

        Ok(features.with_values(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_extractor::{FeatureExtractor, FormulaVariant};
    use crate::types::{district::DistrictProfile, query::BusinessQuery};

    fn vector(names: &[&str]) -> FeatureVector {
        let extractor = FeatureExtractor::new(
            names.iter().map(|s| s.to_string()).collect(),
            FormulaVariant::Competition,
        );
        let district = DistrictProfile::new("Andir", 99119, 4.22, 1.0, 20.0, 34.0).unwrap();
        let query = BusinessQuery::new("andir", "Cafe", 1, 4.0, 200);
        extractor.build(&district, &query, 0, 0)
    }

    #[test]
    fn test_transform() {
        let scaler = StandardScaler::new(vec![4.0, 100.0], vec![0.5, 50.0]).unwrap();
        let scaled = scaler
            .transform(&vector(&["google_rating", "jumlah_ulasan"]))
            .unwrap();

        assert_eq!(scaled.values(), &[0.0, 2.0]);
        assert_eq!(scaled.names()[1], "jumlah_ulasan");
    }

    #[test]
    fn test_length_mismatch() {
        let scaler = StandardScaler::new(vec![0.0], vec![1.0]).unwrap();
        let err = scaler
            .transform(&vector(&["google_rating", "jumlah_ulasan"]))
            .unwrap_err();
        assert_eq!(err, InferenceError::ScalerMismatch { expected: 1, got: 2 });
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(StandardScaler::new(vec![0.0, 1.0], vec![1.0]).is_err());
        assert!(StandardScaler::new(vec![0.0], vec![0.0]).is_err());
    }
}
