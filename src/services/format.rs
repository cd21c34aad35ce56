//! Output format encoding service
//!
//! Keeps codec details out of the export stage: callers hand over an RGBA
//! raster and get encoded bytes back.

use crate::{
    config::OutputFormat,
    error::{CompositeError, Result},
};
use image::{
    codecs::{jpeg::JpegEncoder, webp::WebPEncoder},
    DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage,
};

/// Service for encoding rasters into output formats
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Encode an RGBA image
    ///
    /// # Arguments
    /// * `image` - Source raster
    /// * `format` - Target format
    /// * `quality` - JPEG quality (1-100); ignored for lossless WebP
    ///
    /// # Returns
    /// * `Ok(Vec<u8>)` - Encoded bytes
    /// * `Err(CompositeError::Composition)` - Encoder rejected the raster
    ///
    /// # Examples
    /// ```rust
    /// use storefront_compose::{config::OutputFormat, services::OutputFormatHandler};
    /// use image::{Rgba, RgbaImage};
    ///
    /// let image = RgbaImage::from_pixel(8, 8, Rgba([200, 10, 10, 255]));
    /// let bytes = OutputFormatHandler::encode(&image, OutputFormat::Jpeg, 88)?;
    /// assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn encode(image: &RgbaImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let (width, height) = image.dimensions();

        let result = match format {
            OutputFormat::WebP => WebPEncoder::new_lossless(&mut buffer).write_image(
                image.as_raw(),
                width,
                height,
                ExtendedColorType::Rgba8,
            ),
            OutputFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
                JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).write_image(
                    rgb.as_raw(),
                    width,
                    height,
                    ExtendedColorType::Rgb8,
                )
            },
        };

        result.map_err(|e| {
            CompositeError::composition_stage_error(
                "encoding",
                &format!("{} encoder failed: {}", format.extension(), e),
                Some(&format!("{}x{}", width, height)),
            )
        })?;

        log::debug!(
            "Encoded {}x{} {} ({} bytes)",
            width,
            height,
            format.mime_type(),
            buffer.len()
        );
        Ok(buffer)
    }
}
