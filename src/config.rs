//! Configuration types for compositing pipeline runs

use crate::error::{CompositeError, Result};
use serde::{Deserialize, Serialize};

/// Encoded output formats produced for every variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Lossless WebP with alpha support
    WebP,
    /// Lossy JPEG for universal compatibility
    Jpeg,
}

impl OutputFormat {
    /// Both formats in archive order
    pub const ALL: [OutputFormat; 2] = [OutputFormat::Jpeg, OutputFormat::WebP];

    /// File extension without the dot
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::WebP => "webp",
            Self::Jpeg => "jpg",
        }
    }

    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::WebP => "image/webp",
            Self::Jpeg => "image/jpeg",
        }
    }

    #[must_use]
    pub fn is_lossless(self) -> bool {
        matches!(self, Self::WebP)
    }
}

/// Parameters for the luma-threshold subject isolator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskConfig {
    /// Gamma applied to the luma channel before contrast normalization
    pub gamma: f32,
    /// Noise-suppression blur before thresholding
    pub blur_sigma: f32,
    /// Luma level separating subject from studio background
    pub threshold: u8,
    /// Softening blur applied to the binarized mask
    pub edge_blur_sigma: f32,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            gamma: 2.2,
            blur_sigma: 12.0,
            threshold: 170,
            edge_blur_sigma: 4.0,
        }
    }
}

/// Geometry and softness of the synthesized contact shadow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowConfig {
    pub width_ratio: f32,
    pub height_ratio: f32,
    /// Peak opacity of the ellipse (0-1)
    pub opacity: f32,
    pub blur_sigma: f32,
    /// Vertical position of the ellipse inside its canvas, as a fraction of height
    pub vertical_position: f32,
    /// Offset of the shadow canvas below the placement top, as a fraction of placement height
    pub offset_ratio: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            width_ratio: 0.85,
            height_ratio: 0.18,
            opacity: 0.35,
            blur_sigma: 18.0,
            vertical_position: 0.78,
            offset_ratio: 0.75,
        }
    }
}

/// Parameters for the tone and contrast grade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingConfig {
    /// Edge length in pixels of each local-contrast tile
    pub tile_size: u32,
    /// Histogram clip limit relative to a flat distribution
    pub max_slope: f32,
    /// Final midtone gamma
    pub gamma: f32,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            tile_size: 32,
            max_slope: 10.0,
            gamma: 1.1,
        }
    }
}

/// Configuration for a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Minimum accepted longest side in pixels
    pub min_dimension: u32,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Background color behind composites and around exported variants
    pub background: [u8; 3],
    /// Inset around each exported variant, as a fraction of its shorter side
    pub padding_ratio: f64,
    pub mask: MaskConfig,
    pub shadow: ShadowConfig,
    pub grading: GradingConfig,
    /// Abort the run when the shadow cannot be synthesized (default: degrade to no shadow)
    pub shadow_required: bool,
    /// Export the size variants concurrently
    pub parallel_exports: bool,
    /// Deflate level for the archive (0-9)
    pub archive_compression_level: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_dimension: 800,
            jpeg_quality: 88,
            background: [0xf7, 0xf7, 0xf7],
            padding_ratio: 0.05,
            mask: MaskConfig::default(),
            shadow: ShadowConfig::default(),
            grading: GradingConfig::default(),
            shadow_required: false,
            parallel_exports: true,
            archive_compression_level: 9,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }

    /// Validate every numeric parameter
    pub fn validate(&self) -> Result<()> {
        if self.min_dimension == 0 {
            return Err(CompositeError::config_value_error(
                "min_dimension",
                0,
                "1 or greater",
                Some(800),
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(CompositeError::config_value_error(
                "JPEG quality",
                self.jpeg_quality,
                "1-100",
                Some(88),
            ));
        }
        if !(0.0..0.5).contains(&self.padding_ratio) {
            return Err(CompositeError::config_value_error(
                "padding ratio",
                self.padding_ratio,
                "0.0-0.5 (exclusive)",
                Some(0.05),
            ));
        }
        if !(0..=9).contains(&self.archive_compression_level) {
            return Err(CompositeError::config_value_error(
                "archive compression level",
                self.archive_compression_level,
                "0-9",
                Some(9),
            ));
        }
        if self.mask.gamma <= 0.0 || self.grading.gamma <= 0.0 {
            return Err(CompositeError::invalid_config("Gamma values must be positive"));
        }
        let sigmas = [
            self.mask.blur_sigma,
            self.mask.edge_blur_sigma,
            self.shadow.blur_sigma,
        ];
        if sigmas.iter().any(|sigma| !sigma.is_finite() || *sigma < 0.0) {
            return Err(CompositeError::invalid_config(
                "Blur sigmas must be finite and not negative",
            ));
        }
        if !(0.0..=1.0).contains(&self.shadow.opacity) {
            return Err(CompositeError::config_value_error(
                "shadow opacity",
                self.shadow.opacity,
                "0.0-1.0",
                Some(0.35),
            ));
        }
        if !(self.shadow.width_ratio > 0.0 && self.shadow.height_ratio > 0.0) {
            return Err(CompositeError::invalid_config("Shadow ratios must be positive"));
        }
        for (parameter, value, recommended) in [
            ("shadow vertical position", self.shadow.vertical_position, 0.78),
            ("shadow offset ratio", self.shadow.offset_ratio, 0.75),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CompositeError::config_value_error(
                    parameter,
                    value,
                    "0.0-1.0",
                    Some(recommended),
                ));
            }
        }
        if self.grading.tile_size < 2 {
            return Err(CompositeError::config_value_error(
                "grading tile size",
                self.grading.tile_size,
                "2 or greater",
                Some(32),
            ));
        }
        if self.grading.max_slope < 1.0 {
            return Err(CompositeError::config_value_error(
                "grading max slope",
                self.grading.max_slope,
                "1.0 or greater",
                Some(10.0),
            ));
        }
        Ok(())
    }
}

/// Builder for `PipelineConfig`
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    #[must_use]
    pub fn min_dimension(mut self, min_dimension: u32) -> Self {
        self.config.min_dimension = min_dimension;
        self
    }

    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    #[must_use]
    pub fn background(mut self, rgb: [u8; 3]) -> Self {
        self.config.background = rgb;
        self
    }

    #[must_use]
    pub fn padding_ratio(mut self, ratio: f64) -> Self {
        self.config.padding_ratio = ratio;
        self
    }

    #[must_use]
    pub fn mask(mut self, mask: MaskConfig) -> Self {
        self.config.mask = mask;
        self
    }

    #[must_use]
    pub fn shadow(mut self, shadow: ShadowConfig) -> Self {
        self.config.shadow = shadow;
        self
    }

    #[must_use]
    pub fn grading(mut self, grading: GradingConfig) -> Self {
        self.config.grading = grading;
        self
    }

    #[must_use]
    pub fn shadow_required(mut self, required: bool) -> Self {
        self.config.shadow_required = required;
        self
    }

    #[must_use]
    pub fn parallel_exports(mut self, parallel: bool) -> Self {
        self.config.parallel_exports = parallel;
        self
    }

    #[must_use]
    pub fn archive_compression_level(mut self, level: i64) -> Self {
        self.config.archive_compression_level = level;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns `CompositeError::InvalidConfig` when any parameter is out of range
    pub fn build(self) -> Result<PipelineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_storefront_settings() {
        let config = PipelineConfig::default();
        assert_eq!(config.min_dimension, 800);
        assert_eq!(config.jpeg_quality, 88);
        assert_eq!(config.background, [0xf7, 0xf7, 0xf7]);
        assert_eq!(config.mask.threshold, 170);
        assert!(!config.shadow_required);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let config = PipelineConfig::builder()
            .jpeg_quality(95)
            .parallel_exports(false)
            .shadow_required(true)
            .build()
            .unwrap();

        assert_eq!(config.jpeg_quality, 95);
        assert!(!config.parallel_exports);
        assert!(config.shadow_required);
    }

    #[test]
    fn test_builder_clamps_quality() {
        let config = PipelineConfig::builder().jpeg_quality(0).build().unwrap();
        assert_eq!(config.jpeg_quality, 1);
    }

    #[test]
    fn test_validation_failures() {
        let err = PipelineConfig::builder()
            .padding_ratio(0.5)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("padding ratio"));

        let err = PipelineConfig::builder()
            .archive_compression_level(12)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("0-9"));

        let mut config = PipelineConfig::default();
        config.jpeg_quality = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.grading.tile_size = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_finite_shadow_geometry_is_rejected() {
        let mut config = PipelineConfig::default();
        config.shadow.vertical_position = f32::NAN;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("shadow vertical position"));

        let mut config = PipelineConfig::default();
        config.shadow.offset_ratio = f32::INFINITY;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("shadow offset ratio"));

        let mut config = PipelineConfig::default();
        config.shadow.height_ratio = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.mask.edge_blur_sigma = f32::NAN;
        assert!(config.validate().is_err());
    }
}
