//! Loading of trained model artifacts

use crate::config::ModelsConfig;
use crate::encoder::CategoryEncoder;
use crate::models::scaler::StandardScaler;
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Class-index to label mapping of the trained classifier
#[derive(Debug, Clone, PartialEq)]
pub struct ClassLabels {
    labels: Vec<String>,
}

impl ClassLabels {
    /// Build from a `label -> class index` mapping; indices must be 0..n.
    pub fn from_mapping(mapping: &HashMap<String, usize>) -> Result<Self> {
        let mut labels = vec![None; mapping.len()];
        for (label, &index) in mapping {
            let slot = labels.get_mut(index).with_context(|| {
                format!("Class index {} for '{}' is out of range", index, label)
            })?;
            if slot.is_some() {
                anyhow::bail!("Class index {} is mapped twice", index);
            }
            *slot = Some(label.clone());
        }

        Ok(Self {
            labels: labels.into_iter().flatten().collect(),
        })
    }

    /// Labels already in class-index order
    pub fn from_labels(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

/// Everything besides the classifier itself that inference depends on
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    /// Trained feature names, in column order
    pub feature_names: Vec<String>,
    /// Class-index to label mapping
    pub labels: ClassLabels,
    /// Restaurant category vocabulary
    pub categories: CategoryEncoder,
    /// Optional standardization in front of the classifier
    pub scaler: Option<StandardScaler>,
}

impl ModelArtifacts {
    /// Load artifacts from the configured models directory
    pub fn load(config: &ModelsConfig) -> Result<Self> {
        let dir = Path::new(&config.models_dir);

        let feature_names = load_feature_names(dir.join(&config.feature_names_file))?;
        let labels = load_target_mapping(dir.join(&config.target_mapping_file))?;
        let categories = load_categories(dir.join(&config.categories_file))?;

        let scaler = match &config.scaler_file {
            Some(file) => {
                let scaler = StandardScaler::load(dir.join(file))?;
                if scaler.feature_count() != feature_names.len() {
                    anyhow::bail!(
                        "Scaler covers {} features but the model expects {}",
                        scaler.feature_count(),
                        feature_names.len()
                    );
                }
                Some(scaler)
            }
            None => {
                warn!("No scaler configured, features are passed to the classifier unscaled");
                None
            }
        };

        info!(
            features = feature_names.len(),
            classes = labels.len(),
            categories = categories.len(),
            scaled = scaler.is_some(),
            "Model artifacts loaded from {}",
            dir.display()
        );

        Ok(Self {
            feature_names,
            labels,
            categories,
            scaler,
        })
    }
}

/// One feature name per line; blank lines are ignored
pub fn load_feature_names<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read feature names {}", path.display()))?;
    let names = parse_feature_names(&text);
    if names.is_empty() {
        anyhow::bail!("No feature names in {}", path.display());
    }
    Ok(names)
}

fn parse_feature_names(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// JSON object `{"Avoid": 0, "Consider": 1, "Go": 2}`
pub fn load_target_mapping<P: AsRef<Path>>(path: P) -> Result<ClassLabels> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read target mapping {}", path.display()))?;
    let mapping: HashMap<String, usize> = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse target mapping {}", path.display()))?;
    ClassLabels::from_mapping(&mapping)
}

/// JSON array of category labels in encoder order
pub fn load_categories<P: AsRef<Path>>(path: P) -> Result<CategoryEncoder> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read categories {}", path.display()))?;
    let classes: Vec<String> = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse categories {}", path.display()))?;
    if classes.is_empty() {
        anyhow::bail!("Empty category vocabulary in {}", path.display());
    }
    Ok(CategoryEncoder::new(classes))
}

/// Trained classifier session with its resolved input and output names
pub struct LoadedModel {
    /// Model file stem, used in logs
    pub name: String,
    pub session: Session,
    pub input_name: String,
    /// Output holding class probabilities
    pub output_name: String,
}

impl LoadedModel {
    /// Open `model_file` from the models directory
    pub fn load(config: &ModelsConfig) -> Result<Self> {
        let dir = Path::new(&config.models_dir);
        let path = dir.join(&config.model_file);
        let name = Path::new(&config.model_file)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("classifier")
            .to_string();

        ort::init()
            .commit()
            .context("Failed to initialize ONNX Runtime")?;

        info!(model = %name, path = %path.display(), threads = config.onnx_threads, "Loading classifier");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.onnx_threads)?
            .commit_from_file(&path)
            .with_context(|| {
                format!(
                    "Failed to load classifier '{}' from models directory {}",
                    config.model_file,
                    dir.display()
                )
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .with_context(|| format!("Classifier '{}' declares no inputs", config.model_file))?;

        let outputs: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        let output_name = probability_output(&outputs).with_context(|| {
            format!(
                "Classifier '{}' has no probability output (outputs: {:?})",
                config.model_file, outputs
            )
        })?;

        info!(model = %name, input = %input_name, output = %output_name, "Classifier loaded");

        Ok(Self {
            name,
            session,
            input_name,
            output_name,
        })
    }
}

/// Classifier exports carry a label output and a probability output.
/// Prefers a name containing "prob", else the last output that is not a label.
fn probability_output(outputs: &[String]) -> Option<String> {
    outputs
        .iter()
        .find(|name| name.contains("prob"))
        .or_else(|| outputs.iter().rev().find(|name| !name.contains("label")))
        .cloned()
}
