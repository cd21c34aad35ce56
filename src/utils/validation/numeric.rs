//! Numeric validation utilities
//!
//! Provides safe numeric conversions for pixel geometry so that rounding
//! and flooring never wrap or produce zero-sized rectangles silently.

use crate::error::{CompositeError, Result};

/// Validator for numeric operations and conversions
pub struct NumericValidator;

impl NumericValidator {
    /// Round a pixel coordinate and convert it to u32, flooring negatives at zero
    pub fn round_non_negative(value: f64) -> Result<u32> {
        if !value.is_finite() {
            return Err(CompositeError::composition(format!(
                "Cannot convert non-finite value {} to a pixel coordinate",
                value
            )));
        }

        let rounded = value.round().max(0.0);
        if rounded > f64::from(u32::MAX) {
            return Err(CompositeError::composition(format!(
                "Value {} exceeds u32::MAX ({})",
                value,
                u32::MAX
            )));
        }

        Ok(rounded as u32)
    }

    /// Round a pixel extent, clamping it to at least one pixel
    pub fn round_extent(value: f64) -> Result<u32> {
        Ok(Self::round_non_negative(value)?.max(1))
    }

    /// Validate fraction value (0.0 to 1.0)
    pub fn validate_fraction(name: &str, value: f32) -> Result<f32> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(CompositeError::invalid_config(format!(
                "{} must be between 0.0 and 1.0, got {}",
                name, value
            )));
        }
        Ok(value)
    }

    /// Convert a 0.0-1.0 opacity to an 8-bit alpha value
    #[must_use]
    pub fn opacity_to_alpha(opacity: f32) -> u8 {
        (opacity.clamp(0.0, 1.0) * 255.0).round() as u8
    }

    /// Clamp a float channel value into the 0-255 range
    #[must_use]
    pub fn clamp_channel(value: f32) -> u8 {
        if value.is_nan() {
            return 0;
        }
        value.round().clamp(0.0, 255.0) as u8
    }
}
