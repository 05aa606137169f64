//! Trained classifier capability and its ONNX Runtime implementation

use crate::config::ModelsConfig;
use crate::error::InferenceError;
use crate::models::loader::LoadedModel;
use anyhow::Result;
use ort::memory::Allocator;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, Tensor};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Maps an ordered feature vector to per-class probabilities.
///
/// Implementations must be safe to share between threads; a prediction only
/// ever needs `&self`.
pub trait Classifier: Send + Sync {
    fn classify(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError>;
}

/// Classifier backed by an exported ONNX model
pub struct OnnxClassifier {
    /// Sessions need `&mut` to run, so calls are serialized
    model: Mutex<LoadedModel>,
}

impl OnnxClassifier {
    pub fn new(model: LoadedModel) -> Self {
        Self {
            model: Mutex::new(model),
        }
    }

    /// Load the configured model file from the models directory
    pub fn from_config(config: &ModelsConfig) -> Result<Self> {
        Ok(Self::new(LoadedModel::load(config)?))
    }

    /// Extract class probabilities from model output.
    /// Handles plain tensor outputs and the seq(map) outputs of boosted-tree exports.
    fn extract_probabilities(
        outputs: &ort::session::SessionOutputs,
        output_name: &str,
        model_name: &str,
    ) -> Result<Vec<f64>, InferenceError> {
        if let Some(output) = outputs.get(output_name) {
            if let Some(probs) = Self::extract_from_value(output, model_name)? {
                return Ok(probs);
            }
        }

        for (name, output) in outputs.iter() {
            if name.contains("label") {
                continue;
            }
            if let Some(probs) = Self::extract_from_value(&output, model_name)? {
                debug!(model = %model_name, output = %name, "Probabilities from fallback output");
                return Ok(probs);
            }
        }

        warn!(model = %model_name, "No probability output found");
        Err(InferenceError::MalformedOutput(
            "no probability output in model results".to_string(),
        ))
    }

    fn extract_from_value(
        output: &ort::value::DynValue,
        model_name: &str,
    ) -> Result<Option<Vec<f64>>, InferenceError> {
        let dtype = output.dtype();

        if let Ok(tensor) = output.try_extract_tensor::<f32>() {
            let (shape, data) = tensor;
            let dims: Vec<i64> = shape.iter().copied().collect();
            let probs = probabilities_from_tensor(&dims, data)?;
            debug!(model = %model_name, classes = probs.len(), "Extracted from tensor");
            return Ok(Some(probs));
        }

        if DynSequenceValueType::can_downcast(&dtype) {
            let probs = Self::extract_from_sequence_map(output)?;
            debug!(model = %model_name, classes = probs.len(), "Extracted from seq(map)");
            return Ok(Some(probs));
        }

        Ok(None)
    }

    /// seq(map(int64, float)); keys are class indices and must cover 0..n
    fn extract_from_sequence_map(output: &ort::value::DynValue) -> Result<Vec<f64>, InferenceError> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| InferenceError::MalformedOutput(e.to_string()))?;

        let maps = sequence
            .try_extract_sequence::<DynMapValueType>(&allocator)
            .map_err(|e| InferenceError::MalformedOutput(e.to_string()))?;

        // batch size is always 1
        let map_value = maps
            .first()
            .ok_or_else(|| InferenceError::MalformedOutput("empty sequence".to_string()))?;

        let kv_pairs = map_value
            .try_extract_key_values::<i64, f32>()
            .map_err(|e| InferenceError::MalformedOutput(e.to_string()))?;

        probabilities_from_pairs(kv_pairs.iter().map(|(k, v)| (*k, *v)))
    }
}

/// Probabilities from a `[1, n_classes]` or `[n_classes]` tensor
fn probabilities_from_tensor(dims: &[i64], data: &[f32]) -> Result<Vec<f64>, InferenceError> {
    let classes = match dims {
        [1, n] | [n] => usize::try_from(*n).map_err(|_| {
            InferenceError::MalformedOutput(format!("negative class dimension {}", n))
        })?,
        _ => {
            return Err(InferenceError::MalformedOutput(format!(
                "unexpected probability shape {:?}",
                dims
            )))
        }
    };

    data.get(..classes)
        .map(|row| row.iter().map(|&p| p as f64).collect())
        .ok_or_else(|| InferenceError::MalformedOutput("truncated probability tensor".to_string()))
}

/// Order `(class index, probability)` pairs by index; indices must be 0..n
fn probabilities_from_pairs(
    pairs: impl Iterator<Item = (i64, f32)>,
) -> Result<Vec<f64>, InferenceError> {
    let mut pairs: Vec<(i64, f32)> = pairs.collect();
    pairs.sort_by_key(|(class, _)| *class);

    for (position, (class, _)) in pairs.iter().enumerate() {
        if *class != position as i64 {
            return Err(InferenceError::MalformedOutput(format!(
                "class indices are not contiguous at {}",
                class
            )));
        }
    }

    Ok(pairs.into_iter().map(|(_, p)| p as f64).collect())
}

impl Classifier for OnnxClassifier {
    fn classify(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        let data: Vec<f32> = features.iter().map(|&v| v as f32).collect();
        let shape = vec![1_i64, data.len() as i64];
        let input_tensor = Tensor::from_array((shape, data))
            .map_err(|e| InferenceError::Classifier(format!("failed to create input tensor: {}", e)))?;

        let mut guard = self
            .model
            .lock()
            .map_err(|e| InferenceError::Classifier(format!("lock error: {}", e)))?;
        let model = &mut *guard;

        let outputs = model
            .session
            .run(ort::inputs![&model.input_name => input_tensor])
            .map_err(|e| InferenceError::Classifier(e.to_string()))?;

        Self::extract_probabilities(&outputs, &model.output_name, &model.name)
    }
}

impl<C: Classifier + ?Sized> Classifier for std::sync::Arc<C> {
    fn classify(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        (**self).classify(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_are_ordered_by_class() {
        let probs =
            probabilities_from_pairs(vec![(2, 0.7_f32), (0, 0.1), (1, 0.2)].into_iter()).unwrap();
        assert_eq!(probs.len(), 3);
        assert!((probs[0] - 0.1).abs() < 1e-6);
        assert!((probs[2] - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_pairs_with_gap_are_malformed() {
        let err = probabilities_from_pairs(vec![(0, 0.5_f32), (2, 0.5)].into_iter()).unwrap_err();
        assert!(matches!(err, InferenceError::MalformedOutput(_)));
    }

    #[test]
    fn test_tensor_probabilities() {
        let data = [0.2_f32, 0.3, 0.5];

        let batched = probabilities_from_tensor(&[1, 3], &data).unwrap();
        assert_eq!(batched.len(), 3);
        assert!((batched[2] - 0.5).abs() < 1e-6);

        let flat = probabilities_from_tensor(&[3], &data).unwrap();
        assert_eq!(flat, batched);
    }

    #[test]
    fn test_tensor_shape_errors() {
        let data = [0.2_f32, 0.3, 0.5];

        for dims in [&[2_i64, 3, 1][..], &[2, 3][..], &[][..]] {
            let err = probabilities_from_tensor(dims, &data).unwrap_err();
            assert!(matches!(err, InferenceError::MalformedOutput(ref m) if m.contains("shape")));
        }

        let err = probabilities_from_tensor(&[1, -3], &data).unwrap_err();
        assert!(matches!(err, InferenceError::MalformedOutput(ref m) if m.contains("negative")));

        let err = probabilities_from_tensor(&[1, 5], &data).unwrap_err();
        assert_eq!(
            err,
            InferenceError::MalformedOutput("truncated probability tensor".to_string())
        );
    }

    #[test]
    fn test_arc_classifier_delegates() {
        struct Fixed;
        impl Classifier for Fixed {
            fn classify(&self, _features: &[f64]) -> Result<Vec<f64>, InferenceError> {
                Ok(vec![0.25, 0.75])
            }
        }

        let shared = std::sync::Arc::new(Fixed);
        assert_eq!(shared.classify(&[1.0]).unwrap(), vec![0.25, 0.75]);
    }
}
