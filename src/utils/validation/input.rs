//! Input image validation
//!
//! Reads only the image header to determine dimensions, then enforces the
//! minimum longest-side rule before any pixel work is attempted.

use crate::error::{CompositeError, Result};
use image::ImageReader;
use std::io::Cursor;

/// Validator for raw input buffers
#[derive(Debug, Clone, Copy)]
pub struct ImageValidator {
    min_dimension: u32,
}

impl Default for ImageValidator {
    fn default() -> Self {
        Self::new(800)
    }
}

impl ImageValidator {
    #[must_use]
    pub fn new(min_dimension: u32) -> Self {
        Self { min_dimension }
    }

    #[must_use]
    pub fn min_dimension(&self) -> u32 {
        self.min_dimension
    }

    /// Read width and height from the header without decoding pixel data
    pub fn read_dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
        if bytes.is_empty() {
            return Err(CompositeError::invalid_image("Image buffer is empty"));
        }

        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CompositeError::invalid_image(format!("Unable to read image: {}", e)))?;

        if reader.format().is_none() {
            return Err(CompositeError::invalid_image(
                "Unrecognized image format. Supported formats: PNG, JPEG, WebP",
            ));
        }

        let (width, height) = reader.into_dimensions().map_err(|e| {
            CompositeError::invalid_image(format!("Unable to read image dimensions: {}", e))
        })?;

        if width == 0 || height == 0 {
            return Err(CompositeError::invalid_image(format!(
                "Image has empty dimensions ({}x{})",
                width, height
            )));
        }

        Ok((width, height))
    }

    /// Validate a buffer, returning its dimensions on success
    ///
    /// # Errors
    ///
    /// - `InvalidImage` when the dimensions cannot be determined
    /// - `TooSmall` when the longest side is below the configured minimum
    pub fn validate(&self, bytes: &[u8]) -> Result<(u32, u32)> {
        let (width, height) = Self::read_dimensions(bytes)?;
        self.check_dimensions(width, height)?;
        log::debug!("Validated input image {}x{}", width, height);
        Ok((width, height))
    }

    /// Enforce the minimum longest-side rule on known dimensions
    pub fn check_dimensions(&self, width: u32, height: u32) -> Result<()> {
        if width.max(height) < self.min_dimension {
            return Err(CompositeError::TooSmall {
                width,
                height,
                minimum: self.min_dimension,
            });
        }
        Ok(())
    }
}
