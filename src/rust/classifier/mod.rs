mod error;
mod engine;
mod normalizer;
mod properties;
mod recycling;
mod scoring;
mod decision;
mod config;
pub mod builder;
pub mod recognizer;
pub mod signature;

pub use error::ClassifierError;
pub use engine::{ModelState, PlasticClassifier};
pub use builder::PlasticClassifierBuilder;
pub use config::EngineConfig;
pub use normalizer::{ImageNormalizer, ImageTensor, PixelScaling, TensorLayout};
pub use properties::{
    ImageStatistics, PixelBuffer, PixelFormat, BRIGHT_PIXEL_THRESHOLD, OPAQUE_BRIGHTNESS_THRESHOLD,
    TEXTURE_THRESHOLD, TRANSPARENT_RATIO_THRESHOLD,
};
pub use recycling::RecyclingGuidance;
pub use scoring::{score_categories, CategoryScores, RecognitionLabel, ScoringWeights};
pub use decision::{decide, ClassificationResult};
pub use recognizer::{ModelLoader, ModelSource, OnnxModelLoader, OnnxRecognizer, RecognitionModel};
pub use signature::{
    signatures, CategorySignature, PlasticCategory, Texture, Transparency, VisualProfile, REGISTRY_ORDER,
};

/// Information about the current state and configuration of a classifier
#[derive(Debug, Clone)]
pub struct ClassifierInfo {
    /// Lifecycle state of the recognition model
    pub state: ModelState,
    /// Categories the classifier can report, in tie-breaking order
    pub categories: Vec<PlasticCategory>,
    pub confidence_threshold: f32,
    pub image_size: u32,
    pub top_k: usize,
}
