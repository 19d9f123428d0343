use serde::{Deserialize, Serialize};

use super::error::ClassifierError;
use super::normalizer::{ImageNormalizer, PixelScaling, TensorLayout};
use super::scoring::ScoringWeights;

/// Tunable settings of the classification engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Side length of the square tensor fed to the recognition model
    pub image_size: u32,
    /// Number of recognition labels requested per image
    pub top_k: usize,
    /// Minimum score before a category is reported instead of UNKNOWN
    pub confidence_threshold: f32,
    pub weights: ScoringWeights,
    pub scaling: PixelScaling,
    pub layout: TensorLayout,
    /// Run at most one inference at a time through the model handle
    pub serialize_inference: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            image_size: 224,
            top_k: 5,
            confidence_threshold: 0.5,
            weights: ScoringWeights::default(),
            scaling: PixelScaling::ZeroCentered,
            layout: TensorLayout::Nchw,
            serialize_inference: true,
        }
    }
}

impl EngineConfig {
    pub fn normalizer(&self) -> ImageNormalizer {
        ImageNormalizer::new(self.image_size, self.scaling, self.layout)
    }

    /// Checks the configuration for values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.image_size == 0 {
            return Err(ClassifierError::ValidationError("Image size must be at least 1".into()));
        }
        if self.top_k == 0 {
            return Err(ClassifierError::ValidationError("top_k must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ClassifierError::ValidationError(format!(
                "Confidence threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if !self.weights.is_valid() {
            return Err(ClassifierError::ValidationError(
                "Scoring weights must be finite and non-negative".into(),
            ));
        }
        Ok(())
    }
}
