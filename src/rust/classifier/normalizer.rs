use image::imageops::{self, FilterType};
use image::DynamicImage;
use ndarray::Array4;
use serde::{Deserialize, Serialize};

use super::error::ClassifierError;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Numeric range the recognition model expects its input pixels in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelScaling {
    /// `(v - 127.5) / 127.5`, range `[-1, 1]`
    ZeroCentered,
    /// `v / 255`, range `[0, 1]`
    UnitRange,
    /// `(v / 255 - mean) / std` with the ImageNet channel statistics
    Imagenet,
}

impl PixelScaling {
    #[inline]
    fn apply(self, value: u8, channel: usize) -> f32 {
        let v = value as f32;
        match self {
            Self::ZeroCentered => (v - 127.5) / 127.5,
            Self::UnitRange => v / 255.0,
            Self::Imagenet => (v / 255.0 - IMAGENET_MEAN[channel]) / IMAGENET_STD[channel],
        }
    }
}

/// Memory layout of the input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TensorLayout {
    /// `[1, 3, size, size]`
    Nchw,
    /// `[1, size, size, 3]`
    Nhwc,
}

/// A single-image input tensor ready for the recognition model.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Array4<f32>,
    layout: TensorLayout,
}

impl ImageTensor {
    pub fn as_array(&self) -> &Array4<f32> {
        &self.data
    }

    pub fn into_array(self) -> Array4<f32> {
        self.data
    }

    pub fn layout(&self) -> TensorLayout {
        self.layout
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }
}

/// Resizes decoded images to a fixed square and rescales them into the model's input range.
///
/// Resizing is nearest-neighbour, so the same image always yields the same tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageNormalizer {
    size: u32,
    scaling: PixelScaling,
    layout: TensorLayout,
}

impl ImageNormalizer {
    pub fn new(size: u32, scaling: PixelScaling, layout: TensorLayout) -> Self {
        Self { size, scaling, layout }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Converts a decoded image into a `[1, 3, S, S]` or `[1, S, S, 3]` tensor.
    ///
    /// # Errors
    /// - `InvalidImage` if the image or the configured size is zero
    pub fn normalize(&self, image: &DynamicImage) -> Result<ImageTensor, ClassifierError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ClassifierError::InvalidImage(format!(
                "Cannot normalize a {}x{} image",
                image.width(),
                image.height()
            )));
        }
        if self.size == 0 {
            return Err(ClassifierError::InvalidImage("Target size must be non-zero".into()));
        }

        // The intermediate buffers live only for this scope.
        let rgb = image.to_rgb8();
        let resized = imageops::resize(&rgb, self.size, self.size, FilterType::Nearest);
        drop(rgb);

        let s = self.size as usize;
        let scaling = self.scaling;
        let data = match self.layout {
            TensorLayout::Nchw => Array4::from_shape_fn((1, 3, s, s), |(_, c, y, x)| {
                scaling.apply(resized.get_pixel(x as u32, y as u32)[c], c)
            }),
            TensorLayout::Nhwc => Array4::from_shape_fn((1, s, s, 3), |(_, y, x, c)| {
                scaling.apply(resized.get_pixel(x as u32, y as u32)[c], c)
            }),
        };

        Ok(ImageTensor { data, layout: self.layout })
    }
}
