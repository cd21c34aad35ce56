//! Color-space normalization
//!
//! Decodes an input buffer into a canonical 8-bit sRGB RGBA raster. Embedded
//! metadata (EXIF orientation, ICC profile) is read for logging and then
//! dropped so that later stages see channel-consistent pixel data only.

use crate::{
    error::{CompositeError, Result},
    types::{ColorSpace, ImageMetadata, RawImage},
};
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;

/// Converts decoded buffers to the canonical color space
pub struct Normalizer;

impl Normalizer {
    /// Decode and normalize an encoded image buffer
    ///
    /// # Errors
    ///
    /// Returns `InvalidImage` when the buffer cannot be decoded
    pub fn normalize(bytes: &[u8]) -> Result<RawImage> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CompositeError::invalid_image(format!("Unable to read image: {}", e)))?;

        let mut decoder = reader
            .into_decoder()
            .map_err(|e| CompositeError::invalid_image(format!("Unsupported image data: {}", e)))?;

        let source_channels = decoder.color_type().channel_count();
        let had_icc_profile = match decoder.icc_profile() {
            Ok(Some(profile)) => {
                log::debug!("Stripping embedded ICC profile ({} bytes)", profile.len());
                true
            },
            Ok(None) => false,
            Err(e) => {
                log::warn!("Ignoring unreadable ICC profile: {}", e);
                false
            },
        };

        let decoded = DynamicImage::from_decoder(decoder)
            .map_err(|e| CompositeError::invalid_image(format!("Failed to decode image: {}", e)))?;

        Ok(Self::from_dynamic(
            &decoded,
            source_channels,
            had_icc_profile,
        ))
    }

    /// Normalize an already-decoded image
    #[must_use]
    pub fn normalize_image(image: &DynamicImage) -> RawImage {
        Self::from_dynamic(image, image.color().channel_count(), false)
    }

    fn from_dynamic(image: &DynamicImage, source_channels: u8, had_icc_profile: bool) -> RawImage {
        let pixels = image.to_rgba8();
        let (width, height) = pixels.dimensions();

        RawImage {
            pixels,
            metadata: ImageMetadata {
                width,
                height,
                source_channels,
                channels: 4,
                color_space: ColorSpace::Srgb,
                had_icc_profile,
            },
        }
    }
}
