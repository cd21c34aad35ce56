//! Multi-size export
//!
//! Fits the flattened composite inside each output spec with a uniform inset,
//! centers it on the background color and encodes JPEG and lossless WebP.

use crate::{
    compositor::{centered_offset, fit_within, RESIZE_FILTER},
    config::{OutputFormat, PipelineConfig},
    error::{CompositeError, Result},
    services::OutputFormatHandler,
    types::{Category, OutputSpec, ProcessedImage, VariantFilenames, OUTPUT_SPECS},
};
use futures::future::try_join_all;
use image::{imageops, Rgba, RgbaImage};
use std::sync::Arc;
use tracing::Instrument;

/// Deterministic filename for one encoded variant
#[must_use]
pub fn variant_filename(
    category: Category,
    timestamp: i64,
    spec: &OutputSpec,
    format: OutputFormat,
) -> String {
    format!(
        "{}-{}-{}x{}.{}",
        category.slug(),
        timestamp,
        spec.width,
        spec.height,
        format.extension()
    )
}

/// Exports a composite into every entry of [`OUTPUT_SPECS`]
#[derive(Debug, Clone)]
pub struct MultiSizeExporter {
    background: [u8; 3],
    padding_ratio: f64,
    jpeg_quality: u8,
    parallel: bool,
}

impl MultiSizeExporter {
    #[must_use]
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            background: config.background,
            padding_ratio: config.padding_ratio,
            jpeg_quality: config.jpeg_quality,
            parallel: config.parallel_exports,
        }
    }

    /// Resize and center the composite on an exact-size canvas
    ///
    /// # Errors
    ///
    /// Returns `Composition` when the source is empty or the inset leaves no room
    pub fn render_variant(&self, image: &RgbaImage, spec: &OutputSpec) -> Result<RgbaImage> {
        let pad = spec.padding(self.padding_ratio);
        let inner_width = spec.width.saturating_sub(2 * pad);
        let inner_height = spec.height.saturating_sub(2 * pad);
        if image.width() == 0 || image.height() == 0 || inner_width == 0 || inner_height == 0 {
            return Err(CompositeError::composition_stage_error(
                "export",
                "no drawable area",
                Some(&format!(
                    "{} source {}x{}, inset {}",
                    spec.size_key,
                    image.width(),
                    image.height(),
                    pad
                )),
            ));
        }

        let (width, height) = fit_within(image.dimensions(), (inner_width, inner_height));
        let resized = imageops::resize(image, width, height, RESIZE_FILTER);

        let [r, g, b] = self.background;
        let mut canvas = RgbaImage::from_pixel(spec.width, spec.height, Rgba([r, g, b, 255]));
        let x = i64::from(centered_offset(spec.width, width));
        let y = i64::from(centered_offset(spec.height, height));
        imageops::overlay(&mut canvas, &resized, x, y);
        Ok(canvas)
    }

    /// Render and encode one variant in both formats
    pub fn export_variant(
        &self,
        image: &RgbaImage,
        spec: &OutputSpec,
        category: Category,
        timestamp: i64,
        alt_text: &str,
    ) -> Result<ProcessedImage> {
        let canvas = self.render_variant(image, spec)?;
        let jpeg = OutputFormatHandler::encode(&canvas, OutputFormat::Jpeg, self.jpeg_quality)?;
        let webp = OutputFormatHandler::encode(&canvas, OutputFormat::WebP, self.jpeg_quality)?;

        Ok(ProcessedImage {
            size_key: spec.size_key.to_string(),
            dimensions: spec.dimensions(),
            jpeg,
            webp,
            filenames: VariantFilenames {
                jpeg: variant_filename(category, timestamp, spec, OutputFormat::Jpeg),
                webp: variant_filename(category, timestamp, spec, OutputFormat::WebP),
            },
            alt_text: alt_text.to_string(),
        })
    }

    /// Export every output spec, in table order
    ///
    /// Variants are rendered on the blocking pool concurrently when parallel
    /// export is enabled. The first failure aborts the whole export.
    pub async fn export_all(
        &self,
        image: Arc<RgbaImage>,
        category: Category,
        timestamp: i64,
        alt_text: &str,
    ) -> Result<Vec<ProcessedImage>> {
        if !self.parallel {
            return OUTPUT_SPECS
                .iter()
                .map(|spec| {
                    let _span = crate::tracing_config::spans::export_variant(spec.size_key).entered();
                    self.export_variant(&image, spec, category, timestamp, alt_text)
                })
                .collect();
        }

        let tasks = OUTPUT_SPECS.iter().map(|spec| {
            let exporter = self.clone();
            let image = Arc::clone(&image);
            let alt_text = alt_text.to_string();
            let spec = *spec;
            let span = crate::tracing_config::spans::export_variant(spec.size_key);

            async move {
                tokio::task::spawn_blocking(move || {
                    exporter.export_variant(&image, &spec, category, timestamp, &alt_text)
                })
                .await
                .map_err(|e| {
                    CompositeError::composition(format!(
                        "Export task for {} did not complete: {}",
                        spec.size_key, e
                    ))
                })?
            }
            .instrument(span)
        });

        try_join_all(tasks).await
    }
}
