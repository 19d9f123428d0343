//! Identifies the plastic category of an object in a photo.
//!
//! A generic visual-recognition model (ONNX MobileNetV2 by default) labels the
//! image; those labels and a few pixel statistics are scored against a fixed
//! registry of plastic signatures, and the best category above a confidence
//! floor is reported together with recycling guidance.
//!
//! # Basic Usage
//!
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use plastic_id::{BuiltinModel, PlasticClassifier};
//!
//! let classifier = PlasticClassifier::builder()
//!     .with_model(BuiltinModel::MobileNetV2)?
//!     .build()?;
//!
//! if !classifier.load_model().await {
//!     eprintln!("model unavailable, results will be UNKNOWN");
//! }
//!
//! let result = classifier.classify_file("bottle.jpg").await;
//! let guidance = result.guidance();
//! println!("{} ({:.2}), recyclable: {}", result.category, result.confidence, guidance.recyclable);
//! # Ok(())
//! # }
//! ```
//!
//! # Scoring without a model
//!
//! The scoring and decision stages are pure functions and can be driven with
//! labels from any source:
//!
//! ```rust
//! use plastic_id::{decide, score_categories, ImageStatistics, PlasticCategory, RecognitionLabel, ScoringWeights};
//!
//! let labels = vec![RecognitionLabel::new("water bottle", 0.9)];
//! let stats = ImageStatistics::from_ratios(0.95, 0.97, 0.01);
//! let scores = score_categories(&labels, &stats, &ScoringWeights::default());
//! let result = decide(&scores, 0.5);
//! assert_eq!(result.category, PlasticCategory::Pet);
//! ```

pub mod classifier;
mod runtime;
pub mod model_manager;
pub mod models;

pub use classifier::{
    decide, score_categories, CategoryScores, CategorySignature, ClassificationResult, ClassifierError,
    ClassifierInfo, EngineConfig, ImageNormalizer, ImageStatistics, ImageTensor, ModelLoader, ModelSource,
    ModelState, OnnxModelLoader, OnnxRecognizer, PixelBuffer, PixelFormat, PixelScaling, PlasticCategory,
    PlasticClassifier, PlasticClassifierBuilder, RecognitionLabel, RecognitionModel, RecyclingGuidance,
    ScoringWeights, TensorLayout, Texture, Transparency, VisualProfile, signatures, REGISTRY_ORDER,
    OPAQUE_BRIGHTNESS_THRESHOLD, TEXTURE_THRESHOLD, TRANSPARENT_RATIO_THRESHOLD,
};
pub use runtime::{RuntimeConfig, create_session_builder};
pub use model_manager::{ModelManager, ModelError};
pub use models::{BuiltinModel, ModelCharacteristics, ModelInfo};

/// Installs `env_logger` as the `log` backend. Later calls are no-ops.
pub fn init_logger() {
    let _ = env_logger::try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_twice() {
        init_logger();
        init_logger();
        log::info!("logger still usable after a second init");
    }
}
