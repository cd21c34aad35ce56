//! Color grading
//!
//! Every composite gets a baseline grade: brightness and saturation lift, a
//! linear contrast stretch, tile-based adaptive contrast equalization on luma
//! and a midtone gamma. Clothing gets a second, lighter pass on top.
//! Alpha is never modified.

use crate::{
    config::GradingConfig,
    error::{CompositeError, Result},
    types::Category,
    utils::NumericValidator,
};
use image::RgbaImage;

const BASE_BRIGHTNESS: f32 = 1.03;
const BASE_SATURATION: f32 = 1.05;
const BASE_LINEAR: (f32, f32) = (1.03, -6.0);

const CLOTHING_BRIGHTNESS: f32 = 1.04;
const CLOTHING_SATURATION: f32 = 1.02;
const CLOTHING_LINEAR: (f32, f32) = (1.05, -5.0);

#[inline]
fn luma(r: f32, g: f32, b: f32) -> f32 {
    0.299 * r + 0.587 * g + 0.114 * b
}

/// Category-aware tone and contrast grading
#[derive(Debug, Clone, Default)]
pub struct ColorGrader {
    config: GradingConfig,
}

impl ColorGrader {
    #[must_use]
    pub fn new(config: GradingConfig) -> Self {
        Self { config }
    }

    /// Grade a composite, returning a new buffer of the same size
    ///
    /// # Errors
    ///
    /// Returns `Composition` for an empty buffer
    pub fn grade(&self, image: &RgbaImage, category: Category) -> Result<RgbaImage> {
        if image.width() == 0 || image.height() == 0 {
            return Err(CompositeError::composition_stage_error(
                "color grading",
                "image has no pixels",
                None,
            ));
        }

        let mut graded = image.clone();
        modulate_linear(&mut graded, BASE_BRIGHTNESS, BASE_SATURATION, BASE_LINEAR);
        equalize_local_contrast(&mut graded, self.config.tile_size, self.config.max_slope);
        apply_gamma(&mut graded, self.config.gamma);

        if category == Category::Clothing {
            modulate_linear(
                &mut graded,
                CLOTHING_BRIGHTNESS,
                CLOTHING_SATURATION,
                CLOTHING_LINEAR,
            );
        }

        tracing::trace!(category = %category, "Applied color grade");
        Ok(graded)
    }
}

/// Brightness multiply, saturation around luma, then `a * v + b`
fn modulate_linear(image: &mut RgbaImage, brightness: f32, saturation: f32, linear: (f32, f32)) {
    let (a, b) = linear;
    for pixel in image.pixels_mut() {
        let r = f32::from(pixel[0]) * brightness;
        let g = f32::from(pixel[1]) * brightness;
        let bl = f32::from(pixel[2]) * brightness;
        let y = luma(r, g, bl);

        for (channel, value) in [r, g, bl].into_iter().enumerate() {
            let saturated = y + (value - y) * saturation;
            pixel[channel] = NumericValidator::clamp_channel(a * saturated + b);
        }
    }
}

fn apply_gamma(image: &mut RgbaImage, gamma: f32) {
    let exponent = 1.0 / gamma;
    let lut: Vec<u8> = (0..=255u8)
        .map(|v| NumericValidator::clamp_channel((f32::from(v) / 255.0).powf(exponent) * 255.0))
        .collect();
    for pixel in image.pixels_mut() {
        for channel in 0..3 {
            pixel[channel] = lut[usize::from(pixel[channel])];
        }
    }
}

/// Contrast-limited adaptive histogram equalization on luma
///
/// Each tile gets its own clipped equalization curve; pixels interpolate
/// bilinearly between the curves of the four nearest tile centers. The luma
/// shift is added equally to all three color channels.
fn equalize_local_contrast(image: &mut RgbaImage, tile_size: u32, max_slope: f32) {
    let (width, height) = image.dimensions();
    let tile = tile_size.max(2);
    let tiles_x = width.div_ceil(tile);
    let tiles_y = height.div_ceil(tile);

    let luma_plane: Vec<u8> = image
        .pixels()
        .map(|p| NumericValidator::clamp_channel(luma(f32::from(p[0]), f32::from(p[1]), f32::from(p[2]))))
        .collect();

    let mut curves = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let mut histogram = [0u32; 256];
            let x_end = ((tx + 1) * tile).min(width);
            let y_end = ((ty + 1) * tile).min(height);
            for y in ty * tile..y_end {
                let row = (y * width) as usize;
                for x in tx * tile..x_end {
                    histogram[usize::from(luma_plane[row + x as usize])] += 1;
                }
            }
            let count = (x_end - tx * tile) * (y_end - ty * tile);
            curves.push(clipped_equalization(&histogram, count, max_slope));
        }
    }

    let axis = |position: u32, tiles: u32| -> (usize, usize, f32) {
        let center = (position as f32 + 0.5) / tile as f32 - 0.5;
        let low = center.floor().clamp(0.0, (tiles - 1) as f32);
        let high = (low + 1.0).min((tiles - 1) as f32);
        let weight = (center - low).clamp(0.0, 1.0);
        (low as usize, high as usize, weight)
    };

    for y in 0..height {
        let (ty0, ty1, wy) = axis(y, tiles_y);
        for x in 0..width {
            let (tx0, tx1, wx) = axis(x, tiles_x);
            let value = luma_plane[(y * width + x) as usize];
            let sample = |tx: usize, ty: usize| f32::from(curves[ty * tiles_x as usize + tx][usize::from(value)]);

            let top = sample(tx0, ty0) * (1.0 - wx) + sample(tx1, ty0) * wx;
            let bottom = sample(tx0, ty1) * (1.0 - wx) + sample(tx1, ty1) * wx;
            let delta = top * (1.0 - wy) + bottom * wy - f32::from(value);

            let pixel = image.get_pixel_mut(x, y);
            for channel in 0..3 {
                pixel[channel] = NumericValidator::clamp_channel(f32::from(pixel[channel]) + delta);
            }
        }
    }
}

/// Equalization curve for one tile with its histogram clipped at `max_slope` times the mean bin
fn clipped_equalization(histogram: &[u32; 256], count: u32, max_slope: f32) -> [u8; 256] {
    let mut curve = [0u8; 256];
    if count == 0 {
        for (value, slot) in curve.iter_mut().enumerate() {
            *slot = value as u8;
        }
        return curve;
    }

    let limit = ((max_slope * count as f32 / 256.0) as u32).max(1);
    let mut clipped = *histogram;
    let mut excess = 0u32;
    for bin in &mut clipped {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }

    let share = excess / 256;
    let remainder = (excess % 256) as usize;
    for (index, bin) in clipped.iter_mut().enumerate() {
        *bin += share + u32::from(index < remainder);
    }

    let mut cumulative = 0u32;
    for (slot, bin) in curve.iter_mut().zip(clipped.iter()) {
        cumulative += bin;
        *slot = NumericValidator::clamp_channel(cumulative as f32 * 255.0 / count as f32);
    }
    curve
}
