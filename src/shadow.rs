//! Contact shadow synthesis
//!
//! Produces a transparent canvas the size of the placement rectangle holding a
//! soft dark ellipse near its bottom edge.

use crate::{
    compositor::centered_offset,
    config::ShadowConfig,
    error::{CompositeError, Result},
    utils::NumericValidator,
};
use image::{imageops, Rgba, RgbaImage};
use imageproc::{drawing::draw_filled_ellipse_mut, filter::gaussian_blur_f32};

/// Builds decorative shadows for placed products
#[derive(Debug, Clone, Default)]
pub struct ShadowSynthesizer {
    config: ShadowConfig,
}

impl ShadowSynthesizer {
    #[must_use]
    pub fn new(config: ShadowConfig) -> Self {
        Self { config }
    }

    /// Vertical offset of the shadow canvas relative to the placement top
    #[must_use]
    pub fn vertical_offset(&self, placement_height: u32) -> u32 {
        (f64::from(placement_height) * f64::from(self.config.offset_ratio)).round() as u32
    }

    /// Synthesize the top `rows` rows of a `width` x `height` shadow canvas
    ///
    /// The ellipse keeps the geometry of the full canvas; rows below the
    /// window are only drawn as far as the blur reaches back into it.
    ///
    /// # Errors
    ///
    /// Returns `Composition` for an empty canvas or an out-of-range opacity
    pub fn synthesize(&self, width: u32, height: u32, rows: u32) -> Result<RgbaImage> {
        if width == 0 || height == 0 {
            return Err(CompositeError::composition_stage_error(
                "shadow synthesis",
                "canvas has no area",
                Some(&format!("{}x{}", width, height)),
            ));
        }
        let opacity = NumericValidator::validate_fraction("shadow opacity", self.config.opacity)
            .map_err(|e| CompositeError::composition(e.to_string()))?;

        let shadow_width =
            NumericValidator::round_extent(f64::from(width) * f64::from(self.config.width_ratio))?
                .min(width);
        let shadow_height =
            NumericValidator::round_extent(f64::from(height) * f64::from(self.config.height_ratio))?
                .min(height);

        let top = NumericValidator::round_non_negative(
            f64::from(height) * f64::from(self.config.vertical_position),
        )?
        .min(height - shadow_height);
        let left = centered_offset(width, shadow_width);

        let rows = rows.clamp(1, height);
        let blur_reach = if self.config.blur_sigma > 0.0 {
            (2.0 * self.config.blur_sigma).ceil() as u32 + 1
        } else {
            0
        };
        let drawn_rows = rows.saturating_add(blur_reach).min(height);

        let mut canvas = RgbaImage::from_pixel(width, drawn_rows, Rgba([0, 0, 0, 0]));
        if top < drawn_rows {
            let to_i32 = |value: u32| {
                i32::try_from(value).map_err(|_| {
                    CompositeError::composition(format!("Shadow geometry {} is out of range", value))
                })
            };
            let center = (
                to_i32(left + shadow_width / 2)?,
                to_i32(top + shadow_height / 2)?,
            );
            draw_filled_ellipse_mut(
                &mut canvas,
                center,
                to_i32((shadow_width / 2).max(1))?,
                to_i32((shadow_height / 2).max(1))?,
                Rgba([0, 0, 0, NumericValidator::opacity_to_alpha(opacity)]),
            );
        }

        let mut shadow = if self.config.blur_sigma > 0.0 {
            gaussian_blur_f32(&canvas, self.config.blur_sigma)
        } else {
            canvas
        };
        if drawn_rows > rows {
            shadow = imageops::crop_imm(&shadow, 0, 0, width, rows).to_image();
        }

        tracing::trace!(width, height, rows, shadow_width, shadow_height, top, "Synthesized shadow");
        Ok(shadow)
    }
}
