use ort::Error as OrtError;
use std::fmt;

use super::engine::ModelState;
use crate::model_manager::ModelError;

/// Represents the different types of errors that can occur in the plastic classifier.
#[derive(Debug)]
pub enum ClassifierError {
    /// The recognition model could not be obtained (download, file or runtime failure).
    /// Recoverable by calling `load_model` again.
    ModelLoadError(String),
    /// The image is empty, undecodable or its pixel buffer does not match its dimensions
    InvalidImage(String),
    /// Classification was attempted while the model was not ready
    ModelNotReady(ModelState),
    /// The recognition backend failed while classifying a tensor
    InferenceError(String),
    /// Error occurred due to invalid configuration parameters
    ValidationError(String),
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelLoadError(msg) => write!(f, "Model load error: {}", msg),
            Self::InvalidImage(msg) => write!(f, "Invalid image: {}", msg),
            Self::ModelNotReady(state) => write!(f, "Model not ready (state: {})", state),
            Self::InferenceError(msg) => write!(f, "Inference error: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ClassifierError {}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::ModelLoadError(err.to_string())
    }
}

impl From<ModelError> for ClassifierError {
    fn from(err: ModelError) -> Self {
        ClassifierError::ModelLoadError(err.to_string())
    }
}

impl From<image::ImageError> for ClassifierError {
    fn from(err: image::ImageError) -> Self {
        ClassifierError::InvalidImage(err.to_string())
    }
}
