use std::path::PathBuf;

use log::info;

use super::config::EngineConfig;
use super::engine::PlasticClassifier;
use super::error::ClassifierError;
use super::normalizer::{PixelScaling, TensorLayout};
use super::recognizer::{ModelLoader, ModelSource, OnnxModelLoader};
use super::scoring::ScoringWeights;
use crate::models::BuiltinModel;
use crate::runtime::RuntimeConfig;

/// A builder for constructing a PlasticClassifier with a fluent interface.
#[derive(Default, Debug)]
pub struct PlasticClassifierBuilder {
    source: Option<ModelSource>,
    models_dir: Option<PathBuf>,
    runtime_config: RuntimeConfig,
    config: EngineConfig,
}

impl PlasticClassifierBuilder {
    /// Creates a new empty builder with the default engine configuration
    ///
    /// # Example
    /// ```
    /// use plastic_id::PlasticClassifierBuilder;
    ///
    /// let builder = PlasticClassifierBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the runtime configuration for ONNX model execution
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Uses a built-in recognition model and adopts its input contract
    /// (image size, pixel scaling and tensor layout).
    ///
    /// The model files are downloaded on the first `load_model` call.
    ///
    /// # Errors
    /// - `ValidationError` if a model was already set
    pub fn with_model(mut self, model: BuiltinModel) -> Result<Self, ClassifierError> {
        if self.source.is_some() {
            return Err(ClassifierError::ValidationError("Model already set".to_string()));
        }
        let characteristics = model.characteristics();
        self.config.image_size = characteristics.input_size;
        self.config.scaling = characteristics.scaling;
        self.config.layout = characteristics.layout;
        self.source = Some(ModelSource::Builtin(model));
        info!("Using builtin model {:?}", model);
        Ok(self)
    }

    /// Uses an ONNX model and label list from disk.
    ///
    /// The input contract defaults to the engine defaults; adjust it with
    /// [`Self::with_image_size`], [`Self::with_pixel_scaling`] and [`Self::with_tensor_layout`].
    ///
    /// # Errors
    /// - `ValidationError` if either path is empty or a model was already set
    ///
    /// # Example
    /// ```
    /// use plastic_id::PlasticClassifierBuilder;
    ///
    /// let builder = PlasticClassifierBuilder::new()
    ///     .with_custom_model("path/to/model.onnx", "path/to/labels.txt", true);
    /// assert!(builder.is_ok());
    /// ```
    pub fn with_custom_model(
        mut self,
        model_path: &str,
        labels_path: &str,
        outputs_logits: bool,
    ) -> Result<Self, ClassifierError> {
        if model_path.is_empty() || labels_path.is_empty() {
            return Err(ClassifierError::ValidationError(
                "Model and labels paths cannot be empty".to_string(),
            ));
        }
        if self.source.is_some() {
            return Err(ClassifierError::ValidationError("Model already set".to_string()));
        }
        self.source = Some(ModelSource::Custom {
            model_path: PathBuf::from(model_path),
            labels_path: PathBuf::from(labels_path),
            outputs_logits,
        });
        Ok(self)
    }

    /// Stores downloaded builtin models under `dir` instead of the default cache
    pub fn with_models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.models_dir = Some(dir.into());
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.config.confidence_threshold = threshold;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.config.top_k = top_k;
        self
    }

    pub fn with_image_size(mut self, size: u32) -> Self {
        self.config.image_size = size;
        self
    }

    pub fn with_pixel_scaling(mut self, scaling: PixelScaling) -> Self {
        self.config.scaling = scaling;
        self
    }

    pub fn with_tensor_layout(mut self, layout: TensorLayout) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn with_scoring_weights(mut self, weights: ScoringWeights) -> Self {
        self.config.weights = weights;
        self
    }

    /// Whether inference calls are funnelled through the model handle one at a time
    pub fn with_serialized_inference(mut self, serialize: bool) -> Self {
        self.config.serialize_inference = serialize;
        self
    }

    /// Builds an engine backed by ONNX Runtime. The model is not loaded yet.
    ///
    /// # Errors
    /// - `ValidationError` if no model was set or the configuration is invalid
    pub fn build(self) -> Result<PlasticClassifier, ClassifierError> {
        let source = self
            .source
            .ok_or_else(|| ClassifierError::ValidationError("A model must be set before building".to_string()))?;

        let mut loader = OnnxModelLoader::new(source).with_runtime_config(self.runtime_config);
        if let Some(dir) = self.models_dir {
            loader = loader.with_models_dir(dir);
        }
        PlasticClassifier::new(loader, self.config)
    }

    /// Builds an engine around any recognition backend. A model set with
    /// `with_model` or `with_custom_model` is ignored.
    pub fn build_with_loader<L: ModelLoader>(self, loader: L) -> Result<PlasticClassifier<L>, ClassifierError> {
        PlasticClassifier::new(loader, self.config)
    }
}
