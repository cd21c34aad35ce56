//! Subject isolation
//!
//! Separates a photographed subject from a light studio background by building
//! a per-pixel opacity mask and multiplying it into the image's alpha channel.
//! Mask construction sits behind [`MaskStrategy`] so a learned segmenter can be
//! swapped in without touching the compositor.

use crate::{
    config::MaskConfig,
    error::{CompositeError, Result},
    types::RawImage,
};
use image::{imageops, GrayImage, Luma};
use imageproc::{contrast, filter, stats};

/// Single-channel opacity mask, same dimensions as its source image
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationMask {
    pub pixels: GrayImage,
}

impl SegmentationMask {
    #[must_use]
    pub fn new(pixels: GrayImage) -> Self {
        Self { pixels }
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Mean opacity of the mask in 0.0-1.0
    #[must_use]
    pub fn coverage(&self) -> f32 {
        let total = self.pixels.len();
        if total == 0 {
            return 0.0;
        }
        let sum: u64 = self.pixels.iter().map(|&v| u64::from(v)).sum();
        sum as f32 / (total as f32 * 255.0)
    }
}

/// Strategy for deriving a subject mask from a normalized image
pub trait MaskStrategy: Send + Sync {
    /// Human-readable strategy name for logs
    fn name(&self) -> &'static str;

    /// Build a mask the same size as `image`
    fn build_mask(&self, image: &RawImage) -> Result<SegmentationMask>;
}

/// Deterministic luma-threshold heuristic tuned for evenly lit studio shots
///
/// Pixels darker than the threshold after contrast normalization are treated
/// as subject. Busy or dark backgrounds over- or under-isolate; there is no
/// fallback.
#[derive(Debug, Clone, Default)]
pub struct LumaThresholdMask {
    config: MaskConfig,
}

impl LumaThresholdMask {
    #[must_use]
    pub fn new(config: MaskConfig) -> Self {
        Self { config }
    }

    /// Decode display gamma so thresholding works on linear light
    fn gamma_correct(luma: &mut GrayImage, gamma: f32) {
        let lut: Vec<u8> = (0..=255u8)
            .map(|v| ((f32::from(v) / 255.0).powf(gamma) * 255.0).round() as u8)
            .collect();
        apply_lut(luma, &lut);
    }

    /// Stretch the 1st-99th percentile range to the full 0-255 range
    fn normalize_contrast(luma: &mut GrayImage) {
        let low = stats::percentile(luma, 1);
        let high = stats::percentile(luma, 99);
        if high > low {
            contrast::stretch_contrast_mut(luma, low, high);
        }
    }

    /// Gaussian blur that leaves flat regions at their original level
    ///
    /// The imageproc kernel is not normalized and truncates between passes,
    /// so a flat white field comes back below 255. The response of a single
    /// white pixel (edges replicate) gives that ceiling and the output is
    /// stretched back up to it.
    fn blur(luma: &GrayImage, sigma: f32) -> GrayImage {
        if sigma <= 0.0 {
            return luma.clone();
        }

        let mut blurred = filter::gaussian_blur_f32(luma, sigma);
        let white = GrayImage::from_pixel(1, 1, Luma([u8::MAX]));
        let ceiling = filter::gaussian_blur_f32(&white, sigma)
            .get_pixel(0, 0)[0]
            .saturating_sub(1);
        if ceiling > 0 && ceiling < u8::MAX {
            contrast::stretch_contrast_mut(&mut blurred, 0, ceiling);
        }
        blurred
    }
}

impl MaskStrategy for LumaThresholdMask {
    fn name(&self) -> &'static str {
        "luma-threshold"
    }

    fn build_mask(&self, image: &RawImage) -> Result<SegmentationMask> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(CompositeError::composition_stage_error(
                "mask building",
                "image has no pixels",
                Some(&format!("{}x{}", width, height)),
            ));
        }

        // Alpha is ignored; only the color channels feed the luma estimate
        let mut luma = imageops::grayscale(&image.pixels);
        Self::gamma_correct(&mut luma, self.config.gamma);
        Self::normalize_contrast(&mut luma);

        let smoothed = Self::blur(&luma, self.config.blur_sigma);
        let mut binary = contrast::threshold(&smoothed, self.config.threshold);
        // Light background is above the threshold; the subject is what remains
        imageops::invert(&mut binary);

        let softened = Self::blur(&binary, self.config.edge_blur_sigma);
        let mask = SegmentationMask::new(softened);

        tracing::debug!(
            strategy = self.name(),
            width,
            height,
            coverage = %format!("{:.3}", mask.coverage()),
            "Built subject mask"
        );
        Ok(mask)
    }
}

/// Multiply the mask into the image's alpha channel
///
/// Areas outside the mask become transparent; color channels are untouched.
pub fn apply_mask(image: &RawImage, mask: &SegmentationMask) -> Result<RawImage> {
    if image.dimensions() != mask.dimensions() {
        let (iw, ih) = image.dimensions();
        let (mw, mh) = mask.dimensions();
        return Err(CompositeError::composition_stage_error(
            "mask application",
            &format!("mask is {}x{} but image is {}x{}", mw, mh, iw, ih),
            None,
        ));
    }

    let mut pixels = image.pixels.clone();
    for (pixel, Luma([coverage])) in pixels.pixels_mut().zip(mask.pixels.pixels()) {
        let alpha = u16::from(pixel[3]) * u16::from(*coverage);
        pixel[3] = ((alpha + 127) / 255) as u8;
    }

    Ok(RawImage {
        pixels,
        metadata: image.metadata.clone(),
    })
}

/// Build and apply a mask in one step
pub fn isolate(strategy: &dyn MaskStrategy, image: &RawImage) -> Result<RawImage> {
    let mask = strategy.build_mask(image)?;
    apply_mask(image, &mask)
}

fn apply_lut(image: &mut GrayImage, lut: &[u8]) {
    for value in image.iter_mut() {
        if let Some(mapped) = lut.get(usize::from(*value)) {
            *value = *mapped;
        }
    }
}
