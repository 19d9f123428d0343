use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};

use ort::session::Session;
use ort::value::Tensor;

use super::config::EngineConfig;
use super::error::ClassifierError;
use super::normalizer::ImageTensor;
use super::scoring::RecognitionLabel;
use crate::model_manager::ModelManager;
use crate::models::BuiltinModel;
use crate::runtime::{create_session_builder, RuntimeConfig};

/// A loaded visual-recognition model.
///
/// Implementations turn a normalized image tensor into generic labels ordered
/// by descending probability. The engine treats them as black boxes.
pub trait RecognitionModel: Send + Sync {
    fn classify(&self, input: &ImageTensor, top_k: usize) -> Result<Vec<RecognitionLabel>, ClassifierError>;
}

/// Obtains a [`RecognitionModel`]. Called by the engine on every load or reload.
pub trait ModelLoader: Send + Sync {
    type Model: RecognitionModel + 'static;

    fn load(&self, config: &EngineConfig) -> impl Future<Output = Result<Self::Model, ClassifierError>> + Send;
}

/// Recognition model backed by an ONNX Runtime session and a label list.
#[derive(Debug)]
pub struct OnnxRecognizer {
    session: Session,
    labels: Vec<String>,
    outputs_logits: bool,
    model_path: PathBuf,
}

impl OnnxRecognizer {
    /// Builds a session from `model_path` and reads one label per line from `labels_path`.
    pub fn from_files(
        model_path: &Path,
        labels_path: &Path,
        runtime_config: &RuntimeConfig,
        outputs_logits: bool,
    ) -> Result<Self, ClassifierError> {
        let labels_text = fs::read_to_string(labels_path).map_err(|e| {
            ClassifierError::ModelLoadError(format!("Failed to read labels {:?}: {}", labels_path, e))
        })?;
        let labels = parse_labels(&labels_text);
        if labels.is_empty() {
            return Err(ClassifierError::ModelLoadError(format!(
                "Labels file {:?} is empty",
                labels_path
            )));
        }

        let session = create_session_builder(runtime_config)?.commit_from_file(model_path)?;
        Self::validate_model(&session)?;
        log::info!(
            "Recognition model loaded from {:?} with {} labels",
            model_path,
            labels.len()
        );

        Ok(Self {
            session,
            labels,
            outputs_logits,
            model_path: model_path.to_path_buf(),
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn num_labels(&self) -> usize {
        self.labels.len()
    }

    fn validate_model(session: &Session) -> Result<(), ClassifierError> {
        if session.inputs.len() != 1 {
            return Err(ClassifierError::ModelLoadError(format!(
                "Model must have exactly 1 image input, found {}",
                session.inputs.len()
            )));
        }
        if session.outputs.is_empty() {
            return Err(ClassifierError::ModelLoadError(
                "Model must have at least 1 output for class scores".to_string(),
            ));
        }
        Ok(())
    }
}

impl RecognitionModel for OnnxRecognizer {
    fn classify(&self, input: &ImageTensor, top_k: usize) -> Result<Vec<RecognitionLabel>, ClassifierError> {
        let input_name = self.session.inputs[0].name.clone();

        let input_dyn = input.as_array().view().into_dyn();
        let input_array = input_dyn.as_standard_layout();
        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            input_name.as_str(),
            Tensor::from_array(&input_array)
                .map_err(|e| ClassifierError::InferenceError(format!("Failed to create input tensor: {}", e)))?,
        );

        let outputs = self
            .session
            .run(input_tensors)
            .map_err(|e| ClassifierError::InferenceError(format!("Failed to run model: {}", e)))?;
        let output_tensor = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::InferenceError(format!("Failed to extract output tensor: {}", e)))?;

        let raw: Vec<f32> = output_tensor.iter().copied().collect();
        let mut probabilities = if self.outputs_logits { softmax(&raw) } else { raw };
        // Some exports prepend a background class
        if probabilities.len() == self.labels.len() + 1 {
            probabilities.remove(0);
        }

        Ok(top_k_labels(&probabilities, &self.labels, top_k))
    }
}

/// Where the ONNX model and its labels come from.
#[derive(Debug, Clone)]
pub enum ModelSource {
    Builtin(BuiltinModel),
    Custom {
        model_path: PathBuf,
        labels_path: PathBuf,
        outputs_logits: bool,
    },
}

/// Loads an [`OnnxRecognizer`], downloading builtin models on first use.
#[derive(Debug, Clone)]
pub struct OnnxModelLoader {
    source: ModelSource,
    models_dir: Option<PathBuf>,
    runtime_config: RuntimeConfig,
}

impl OnnxModelLoader {
    pub fn new(source: ModelSource) -> Self {
        Self {
            source,
            models_dir: None,
            runtime_config: RuntimeConfig::default(),
        }
    }

    pub fn with_models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.models_dir = Some(dir.into());
        self
    }

    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    pub fn source(&self) -> &ModelSource {
        &self.source
    }

    async fn resolve_files(&self) -> Result<(PathBuf, PathBuf, bool), ClassifierError> {
        match &self.source {
            ModelSource::Builtin(model) => {
                let manager = match &self.models_dir {
                    Some(dir) => ModelManager::new(dir),
                    None => ModelManager::new_default(),
                }
                .map_err(|e| ClassifierError::ModelLoadError(format!("Failed to create model manager: {}", e)))?;
                let (model_path, labels_path) = manager.ensure_model_downloaded(*model).await?;
                Ok((model_path, labels_path, model.characteristics().outputs_logits))
            }
            ModelSource::Custom {
                model_path,
                labels_path,
                outputs_logits,
            } => {
                if !model_path.exists() {
                    return Err(ClassifierError::ModelLoadError(format!(
                        "Model file not found: {:?}",
                        model_path
                    )));
                }
                if !labels_path.exists() {
                    return Err(ClassifierError::ModelLoadError(format!(
                        "Labels file not found: {:?}",
                        labels_path
                    )));
                }
                Ok((model_path.clone(), labels_path.clone(), *outputs_logits))
            }
        }
    }
}

impl ModelLoader for OnnxModelLoader {
    type Model = OnnxRecognizer;

    async fn load(&self, _config: &EngineConfig) -> Result<OnnxRecognizer, ClassifierError> {
        let (model_path, labels_path, outputs_logits) = self.resolve_files().await?;
        let runtime_config = self.runtime_config.clone();

        // Session construction is CPU-bound.
        tokio::task::spawn_blocking(move || {
            OnnxRecognizer::from_files(&model_path, &labels_path, &runtime_config, outputs_logits)
        })
        .await
        .map_err(|e| ClassifierError::ModelLoadError(format!("Model loading task failed: {}", e)))?
    }
}

/// Parses a label list, one label per line, dropping a leading WordNet id such as `n01440764`.
pub(crate) fn parse_labels(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once(' ') {
            Some((id, rest)) if is_wordnet_id(id) => rest.trim().to_string(),
            _ => line.to_string(),
        })
        .collect()
}

fn is_wordnet_id(token: &str) -> bool {
    token.len() == 9 && token.starts_with('n') && token[1..].chars().all(|c| c.is_ascii_digit())
}

pub(crate) fn softmax(values: &[f32]) -> Vec<f32> {
    if values.is_empty() {
        return Vec::new();
    }
    let max_val = values.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = values.iter().map(|v| (v - max_val).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if !(sum > 0.0) {
        return vec![0.0; values.len()];
    }
    exps.iter().map(|e| e / sum).collect()
}

/// Returns the `k` most probable labels, highest first. Ties keep label order.
pub(crate) fn top_k_labels(probabilities: &[f32], labels: &[String], k: usize) -> Vec<RecognitionLabel> {
    let mut indexed: Vec<(usize, f32)> = probabilities.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    indexed
        .into_iter()
        .take(k)
        .map(|(i, p)| {
            let label = labels.get(i).cloned().unwrap_or_else(|| format!("class {}", i));
            RecognitionLabel::new(label, p)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels_strips_wordnet_ids() {
        let labels = parse_labels("n01440764 tench, Tinca tinca\n\nn04557648 water bottle\nbanana\n");
        assert_eq!(labels, vec!["tench, Tinca tinca", "water bottle", "banana"]);
    }

    #[test]
    fn test_parse_labels_keeps_plain_words() {
        let labels = parse_labels("nail polish\nn95 mask");
        assert_eq!(labels, vec!["nail polish", "n95 mask"]);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
        assert!(softmax(&[]).is_empty());
    }

    #[test]
    fn test_top_k_orders_by_probability() {
        let labels: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let top = top_k_labels(&[0.1, 0.6, 0.05, 0.25], &labels, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].label, "b");
        assert_eq!(top[1].label, "d");
    }

    #[test]
    fn test_top_k_names_unlabelled_outputs() {
        let labels = vec!["only".to_string()];
        let top = top_k_labels(&[0.2, 0.8], &labels, 5);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].label, "class 1");
    }

    #[tokio::test]
    async fn test_custom_source_missing_files() {
        let loader = OnnxModelLoader::new(ModelSource::Custom {
            model_path: PathBuf::from("/nonexistent/model.onnx"),
            labels_path: PathBuf::from("/nonexistent/labels.txt"),
            outputs_logits: true,
        });
        let result = loader.load(&EngineConfig::default()).await;
        assert!(matches!(result, Err(ClassifierError::ModelLoadError(_))));
    }
}
