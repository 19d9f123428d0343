use crate::classifier::{PixelScaling, TensorLayout};

/// Represents the available built-in recognition models in the library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinModel {
    /// MobileNetV2 trained on ImageNet-1k, exported to ONNX
    ///
    /// Characteristics:
    /// - Input: 224x224 RGB, NCHW, ImageNet mean/std scaling
    /// - Output: 1000 logits
    /// - Size: ~14MB
    MobileNetV2,
}

/// Characteristics of a model including its input contract
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCharacteristics {
    /// Side length of the square input image
    pub input_size: u32,
    pub layout: TensorLayout,
    pub scaling: PixelScaling,
    /// Whether the raw outputs are logits that still need a softmax
    pub outputs_logits: bool,
    /// Approximate size of the model file
    pub model_size_mb: usize,
}

/// Where to fetch a model and its label list, and how to verify them
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    pub model_url: String,
    pub labels_url: String,
    /// Hex SHA-256 of the model file. Unpinned files are only checked for presence.
    pub model_hash: Option<String>,
    pub labels_hash: Option<String>,
}

impl BuiltinModel {
    /// Get the characteristics of the model
    pub fn characteristics(&self) -> ModelCharacteristics {
        match self {
            Self::MobileNetV2 => ModelCharacteristics {
                input_size: 224,
                layout: TensorLayout::Nchw,
                scaling: PixelScaling::Imagenet,
                outputs_logits: true,
                model_size_mb: 14,
            },
        }
    }

    pub fn get_model_info(&self) -> ModelInfo {
        match self {
            Self::MobileNetV2 => ModelInfo {
                name: "mobilenetv2".to_string(),
                model_url: "https://github.com/onnx/models/raw/main/validated/vision/classification/mobilenet/model/mobilenetv2-12.onnx".to_string(),
                labels_url: "https://raw.githubusercontent.com/onnx/models/main/validated/vision/classification/synset.txt".to_string(),
                model_hash: None,
                labels_hash: None,
            },
        }
    }
}
