use image::DynamicImage;
use serde::{Deserialize, Serialize};

use super::error::ClassifierError;

/// Per-pixel brightness above which a pixel counts towards the transparency ratio (0..=255 scale).
pub const BRIGHT_PIXEL_THRESHOLD: f32 = 240.0;
/// `transparency_ratio` above which an image is considered transparent.
pub const TRANSPARENT_RATIO_THRESHOLD: f32 = 0.7;
/// Normalized `average_brightness` below which an image is considered opaque.
pub const OPAQUE_BRIGHTNESS_THRESHOLD: f32 = 200.0 / 255.0;
/// Mean brightness step between neighbouring pixels (0..=255 scale) above which
/// an image is considered textured.
pub const TEXTURE_THRESHOLD: f32 = 0.1;

/// Channel layout of a raw pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
        }
    }
}

/// A borrowed, row-major 8-bit pixel buffer.
#[derive(Debug, Clone, Copy)]
pub struct PixelBuffer<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl<'a> PixelBuffer<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32, format: PixelFormat) -> Self {
        Self { data, width, height, format }
    }

    fn pixel_count(&self) -> Result<usize, ClassifierError> {
        if self.width == 0 || self.height == 0 {
            return Err(ClassifierError::InvalidImage(format!(
                "Image has zero size ({}x{})",
                self.width, self.height
            )));
        }
        let pixels = self.width as usize * self.height as usize;
        let expected = pixels * self.format.channels();
        if self.data.len() != expected {
            return Err(ClassifierError::InvalidImage(format!(
                "Pixel buffer holds {} bytes, expected {} for {}x{} {:?}",
                self.data.len(), expected, self.width, self.height, self.format
            )));
        }
        Ok(pixels)
    }
}

/// Aggregate visual statistics of one image, independent of the recognition model.
///
/// All ratios are in `[0, 1]`. The booleans are thresholded from the ratios
/// using [`TRANSPARENT_RATIO_THRESHOLD`], [`OPAQUE_BRIGHTNESS_THRESHOLD`] and
/// [`TEXTURE_THRESHOLD`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageStatistics {
    pub transparency_ratio: f32,
    pub average_brightness: f32,
    pub texture_variation: f32,
    pub is_transparent: bool,
    pub is_opaque: bool,
    pub has_texture: bool,
}

impl ImageStatistics {
    /// Builds statistics from already-computed ratios, clamping them and deriving the flags.
    pub fn from_ratios(transparency_ratio: f32, average_brightness: f32, texture_variation: f32) -> Self {
        let transparency_ratio = clamp_unit(transparency_ratio);
        let average_brightness = clamp_unit(average_brightness);
        let texture_variation = clamp_unit(texture_variation);
        Self {
            transparency_ratio,
            average_brightness,
            texture_variation,
            is_transparent: transparency_ratio > TRANSPARENT_RATIO_THRESHOLD,
            is_opaque: average_brightness < OPAQUE_BRIGHTNESS_THRESHOLD,
            has_texture: texture_variation > TEXTURE_THRESHOLD,
        }
    }

    /// Scans a raw pixel buffer once. The alpha channel, if present, is ignored.
    ///
    /// # Errors
    /// - `InvalidImage` if the image has zero size or the buffer length does not
    ///   match `width * height * channels`
    pub fn analyze(buffer: &PixelBuffer<'_>) -> Result<Self, ClassifierError> {
        let pixel_count = buffer.pixel_count()?;
        let channels = buffer.format.channels();

        let mut bright_pixels = 0usize;
        let mut brightness_sum = 0f64;
        let mut variation_sum = 0f64;
        let mut previous: Option<f32> = None;

        for pixel in buffer.data.chunks_exact(channels) {
            let brightness = (pixel[0] as f32 + pixel[1] as f32 + pixel[2] as f32) / 3.0;
            if brightness > BRIGHT_PIXEL_THRESHOLD {
                bright_pixels += 1;
            }
            brightness_sum += brightness as f64;
            if let Some(prev) = previous {
                variation_sum += (brightness - prev).abs() as f64;
            }
            previous = Some(brightness);
        }

        let n = pixel_count as f64;
        Ok(Self::from_ratios(
            (bright_pixels as f64 / n) as f32,
            (brightness_sum / n / 255.0) as f32,
            // Mean step per pixel; `from_ratios` thresholds it and clamps the stored ratio.
            (variation_sum / n) as f32,
        ))
    }

    /// Analyzes a decoded image, borrowing its buffer when it is already RGB8 or RGBA8.
    pub fn from_image(image: &DynamicImage) -> Result<Self, ClassifierError> {
        let (width, height) = (image.width(), image.height());
        match image {
            DynamicImage::ImageRgb8(rgb) => {
                Self::analyze(&PixelBuffer::new(rgb.as_raw(), width, height, PixelFormat::Rgb8))
            }
            DynamicImage::ImageRgba8(rgba) => {
                Self::analyze(&PixelBuffer::new(rgba.as_raw(), width, height, PixelFormat::Rgba8))
            }
            other => {
                let rgba = other.to_rgba8();
                Self::analyze(&PixelBuffer::new(rgba.as_raw(), width, height, PixelFormat::Rgba8))
            }
        }
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn test_all_white_is_transparent() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([255, 255, 255])));
        let stats = ImageStatistics::from_image(&image).unwrap();
        assert_eq!(stats.transparency_ratio, 1.0);
        assert_eq!(stats.average_brightness, 1.0);
        assert!(stats.is_transparent);
        assert!(!stats.is_opaque);
        assert!(!stats.has_texture);
    }

    #[test]
    fn test_all_black_is_opaque() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255])));
        let stats = ImageStatistics::from_image(&image).unwrap();
        assert_eq!(stats.transparency_ratio, 0.0);
        assert_eq!(stats.average_brightness, 0.0);
        assert_eq!(stats.texture_variation, 0.0);
        assert!(!stats.is_transparent);
        assert!(stats.is_opaque);
        assert!(!stats.has_texture);
    }

    #[test]
    fn test_alternating_pixels_have_texture() {
        let data: Vec<u8> = (0..16)
            .flat_map(|i| if i % 2 == 0 { [0u8, 0, 0] } else { [255u8, 255, 255] })
            .collect();
        let stats = ImageStatistics::analyze(&PixelBuffer::new(&data, 4, 4, PixelFormat::Rgb8)).unwrap();
        // 15 transitions of 255 over 16 pixels, clamped
        assert_eq!(stats.texture_variation, 1.0);
        assert!(stats.has_texture);
        assert!((stats.transparency_ratio - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_subtle_grain_has_texture() {
        let data: Vec<u8> = (0..64)
            .flat_map(|i| if i % 2 == 0 { [60u8, 60, 60] } else { [80u8, 80, 80] })
            .collect();
        let stats = ImageStatistics::analyze(&PixelBuffer::new(&data, 8, 8, PixelFormat::Rgb8)).unwrap();
        // 63 steps of 20 over 64 pixels is well above a mean step of 0.1
        assert!(stats.has_texture);
        assert_eq!(stats.texture_variation, 1.0);
        assert!(stats.is_opaque);
        assert!(!stats.is_transparent);
    }

    #[test]
    fn test_flat_image_has_no_texture() {
        let data = [90u8; 8 * 8 * 3];
        let stats = ImageStatistics::analyze(&PixelBuffer::new(&data, 8, 8, PixelFormat::Rgb8)).unwrap();
        assert_eq!(stats.texture_variation, 0.0);
        assert!(!stats.has_texture);
    }

    #[test]
    fn test_bright_threshold_is_strict() {
        let data = [240u8, 240, 240];
        let stats = ImageStatistics::analyze(&PixelBuffer::new(&data, 1, 1, PixelFormat::Rgb8)).unwrap();
        assert_eq!(stats.transparency_ratio, 0.0);
    }

    #[test]
    fn test_alpha_is_ignored() {
        let opaque = [10u8, 20, 30, 255];
        let clear = [10u8, 20, 30, 0];
        let a = ImageStatistics::analyze(&PixelBuffer::new(&opaque, 1, 1, PixelFormat::Rgba8)).unwrap();
        let b = ImageStatistics::analyze(&PixelBuffer::new(&clear, 1, 1, PixelFormat::Rgba8)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_size_is_invalid() {
        let result = ImageStatistics::analyze(&PixelBuffer::new(&[], 0, 0, PixelFormat::Rgb8));
        assert!(matches!(result, Err(ClassifierError::InvalidImage(_))));

        let empty = DynamicImage::new_rgb8(0, 5);
        assert!(ImageStatistics::from_image(&empty).is_err());
    }

    #[test]
    fn test_mismatched_buffer_is_invalid() {
        let data = [0u8; 10];
        let result = ImageStatistics::analyze(&PixelBuffer::new(&data, 2, 2, PixelFormat::Rgb8));
        assert!(matches!(result, Err(ClassifierError::InvalidImage(_))));
    }

    #[test]
    fn test_from_ratios_clamps() {
        let stats = ImageStatistics::from_ratios(1.5, -0.2, f32::NAN);
        assert_eq!(stats.transparency_ratio, 1.0);
        assert_eq!(stats.average_brightness, 0.0);
        assert_eq!(stats.texture_variation, 0.0);
    }
}
