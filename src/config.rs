//! Configuration management for the location engine

use crate::feature_extractor::FormulaVariant;
use crate::models::risk::{default_label_ratings, RiskWeights};
use crate::types::prediction::RiskLevelThresholds;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub models: ModelsConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub districts: DistrictsConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    pub logging: LoggingConfig,
}

/// Trained model artifacts, relative to `models_dir`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Directory containing the model and its artifacts
    pub models_dir: String,
    /// ONNX export of the trained classifier
    pub model_file: String,
    /// Trained feature names, one per line
    pub feature_names_file: String,
    /// Label to class-index mapping (JSON object)
    pub target_mapping_file: String,
    /// Category vocabulary of the label encoder (JSON array)
    pub categories_file: String,
    /// Standard scaler parameters; features pass through unscaled when absent
    #[serde(default)]
    pub scaler_file: Option<String>,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_onnx_threads() -> usize {
    1
}

/// Feature engineering configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeaturesConfig {
    /// Formula set the trained model expects
    #[serde(default)]
    pub formula: FormulaVariant,
}

/// District reference data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DistrictsConfig {
    /// JSON district table; the built-in Bandung table is used when unset
    #[serde(default)]
    pub path: Option<String>,
}

/// Risk scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    #[serde(default)]
    pub weights: RiskWeights,
    #[serde(default)]
    pub thresholds: RiskLevelThresholds,
    /// Rating anchor per class label, used for the rating estimate
    #[serde(default = "default_label_ratings")]
    pub label_ratings: HashMap<String, f64>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            weights: RiskWeights::default(),
            thresholds: RiskLevelThresholds::default(),
            label_ratings: default_label_ratings(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path.
    ///
    /// Environment variables override file values, e.g.
    /// `FNB_MODELS__ONNX_THREADS=4` or `FNB_FEATURES__FORMULA=legacy`.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(
                Config::try_from(&AppConfig::default()).context("Failed to encode defaults")?,
            )
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("FNB")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            models: ModelsConfig {
                models_dir: "models/competition".to_string(),
                model_file: "final_competition_model.onnx".to_string(),
                feature_names_file: "feature_names_competition.txt".to_string(),
                target_mapping_file: "target_mapping.json".to_string(),
                categories_file: "label_classes_kategori.json".to_string(),
                scaler_file: None,
                onnx_threads: 1,
            },
            features: FeaturesConfig::default(),
            districts: DistrictsConfig::default(),
            risk: RiskConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.models.models_dir, "models/competition");
        assert_eq!(config.models.onnx_threads, 1);
        assert_eq!(config.features.formula, FormulaVariant::Competition);
        assert!(config.districts.path.is_none());
        assert!(config.models.scaler_file.is_none());
        assert_eq!(config.risk.weights, RiskWeights::default());
        assert_eq!(config.risk.label_ratings.get("Go"), Some(&4.5));
    }

    #[test]
    fn test_load_from_path() {
        let path = std::env::temp_dir().join(format!("fnb-config-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"
[models]
models_dir = "artifacts"
model_file = "model.onnx"
feature_names_file = "features.txt"
target_mapping_file = "target.json"
categories_file = "categories.json"

[features]
formula = "legacy"

[risk.thresholds]
low = 0.25
medium = 0.5

[logging]
level = "debug"
format = "json"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.models.models_dir, "artifacts");
        assert!(config.models.scaler_file.is_none());
        assert_eq!(config.features.formula, FormulaVariant::Legacy);
        assert_eq!(config.risk.thresholds.low, 0.25);
        assert_eq!(config.risk.weights.rating, 0.5);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_shipped_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/config.toml");
        let config = AppConfig::load_from_path(path).unwrap();
        assert_eq!(config.models.model_file, "final_competition_model.onnx");
        assert_eq!(
            config.models.scaler_file.as_deref(),
            Some("competition_scaler.json")
        );
        assert_eq!(config.risk.weights.saturation, 0.3);
    }
}
