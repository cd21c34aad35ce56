//! Core types shared across the compositing pipeline

use crate::{
    config::OutputFormat,
    error::{CompositeError, Result},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Product category; drives placement ratios and the grading branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Jewelry,
    Clothing,
}

impl Category {
    /// Lowercase form used in generated filenames
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::Jewelry => "jewelry",
            Self::Clothing => "clothing",
        }
    }

    /// Fixed descriptive words used in alt text
    #[must_use]
    pub fn descriptors(self) -> &'static [&'static str] {
        match self {
            Self::Jewelry => &["elegant", "refined"],
            Self::Clothing => &["tailored", "modern"],
        }
    }

    /// Noun describing the product in alt text
    #[must_use]
    pub fn subject(self) -> &'static str {
        match self {
            Self::Jewelry => "accessory",
            Self::Clothing => "garment",
        }
    }

    /// Noun describing the display surface in alt text
    #[must_use]
    pub fn surface(self) -> &'static str {
        match self {
            Self::Jewelry => "display bust",
            Self::Clothing => "tailored mannequin",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jewelry => write!(f, "Jewelry"),
            Self::Clothing => write!(f, "Clothing"),
        }
    }
}

impl FromStr for Category {
    type Err = CompositeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jewelry" => Ok(Self::Jewelry),
            "clothing" => Ok(Self::Clothing),
            other => Err(CompositeError::invalid_config(format!(
                "Unknown category '{}'. Expected Jewelry or Clothing",
                other
            ))),
        }
    }
}

/// Bounded multiplier applied to the product placement width
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct ScaleFactor(f32);

impl ScaleFactor {
    /// Range accepted at the API boundary
    pub const MIN: f32 = 0.5;
    pub const MAX: f32 = 1.5;
    /// Narrower range offered by the interactive control
    pub const UI_RANGE: (f32, f32) = (0.8, 1.2);

    /// Create a scale factor, rejecting values outside the boundary range
    pub fn new(value: f32) -> Result<Self> {
        if !value.is_finite() || !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(CompositeError::config_value_error(
                "scale factor",
                value,
                "0.5-1.5",
                Some(1.0),
            ));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn value(self) -> f32 {
        self.0
    }
}

impl Default for ScaleFactor {
    fn default() -> Self {
        Self(1.0)
    }
}

impl TryFrom<f32> for ScaleFactor {
    type Error = CompositeError;

    fn try_from(value: f32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ScaleFactor> for f32 {
    fn from(scale: ScaleFactor) -> Self {
        scale.0
    }
}

/// Canonical color space every normalized buffer is converted into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorSpace {
    Srgb,
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Srgb => write!(f, "sRGB"),
        }
    }
}

/// Metadata describing a decoded raster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    /// Channel count of the source encoding (1-4)
    pub source_channels: u8,
    /// Channel count of the canonical buffer
    pub channels: u8,
    pub color_space: ColorSpace,
    /// Whether the source carried an ICC profile before it was stripped
    pub had_icc_profile: bool,
}

impl ImageMetadata {
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Decoded canonical RGBA buffer plus its metadata
///
/// Stages never mutate a `RawImage` they were handed; each produces a new one.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub pixels: RgbaImage,
    pub metadata: ImageMetadata,
}

impl RawImage {
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// Target rectangle for the product layer on the model canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub width: u32,
    pub height: u32,
    pub left: u32,
    pub top: u32,
}

/// Pixel dimensions of an output variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Fixed output size table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSpec {
    pub size_key: &'static str,
    pub width: u32,
    pub height: u32,
}

impl OutputSpec {
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Inset applied on every side before the composite is centered
    #[must_use]
    pub fn padding(&self, ratio: f64) -> u32 {
        (f64::from(self.width.min(self.height)) * ratio).round() as u32
    }
}

/// Storefront output sizes
pub const OUTPUT_SPECS: [OutputSpec; 3] = [
    OutputSpec {
        size_key: "1x1",
        width: 2048,
        height: 2048,
    },
    OutputSpec {
        size_key: "4x5",
        width: 2000,
        height: 2500,
    },
    OutputSpec {
        size_key: "3x4",
        width: 1800,
        height: 2400,
    },
];

/// Generated names for both encodings of a variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantFilenames {
    pub jpeg: String,
    pub webp: String,
}

/// One exported size with both encodings
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub size_key: String,
    pub dimensions: Dimensions,
    pub jpeg: Vec<u8>,
    pub webp: Vec<u8>,
    pub filenames: VariantFilenames,
    pub alt_text: String,
}

impl ProcessedImage {
    /// Filename and bytes of one encoding
    #[must_use]
    pub fn encoded(&self, format: OutputFormat) -> (&str, &[u8]) {
        match format {
            OutputFormat::Jpeg => (&self.filenames.jpeg, &self.jpeg),
            OutputFormat::WebP => (&self.filenames.webp, &self.webp),
        }
    }
}

/// Per-stage timing breakdown in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineTimings {
    pub validation_ms: u64,
    pub normalization_ms: u64,
    pub isolation_ms: u64,
    pub composition_ms: u64,
    pub grading_ms: u64,
    pub analysis_ms: u64,
    pub export_ms: u64,
    pub packaging_ms: u64,
    pub total_ms: u64,
}

/// Terminal artifact of one pipeline run
#[derive(Debug, Clone)]
pub struct ProcessResponse {
    pub results: Vec<ProcessedImage>,
    pub archive: Vec<u8>,
    pub category: Category,
    /// Millisecond timestamp embedded in every filename
    pub timestamp: i64,
    pub timings: PipelineTimings,
}

/// Base64 wire shape of a single variant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedImagePayload {
    pub size_key: String,
    pub dimensions: Dimensions,
    pub jpeg: String,
    pub webp: String,
    pub filenames: VariantFilenames,
    pub alt_text: String,
}

/// Base64 wire shape of a full response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponsePayload {
    pub results: Vec<ProcessedImagePayload>,
    pub zip_base64: String,
}

impl ProcessResponse {
    /// Archive filename for this run
    #[must_use]
    pub fn archive_filename(&self) -> String {
        format!("{}-{}.zip", self.category.slug(), self.timestamp)
    }

    /// Look up a variant by its size key
    #[must_use]
    pub fn result(&self, size_key: &str) -> Option<&ProcessedImage> {
        self.results.iter().find(|r| r.size_key == size_key)
    }

    /// Convert to the base64 JSON shape returned over HTTP
    #[must_use]
    pub fn to_json_payload(&self) -> ProcessResponsePayload {
        ProcessResponsePayload {
            results: self
                .results
                .iter()
                .map(|r| ProcessedImagePayload {
                    size_key: r.size_key.clone(),
                    dimensions: r.dimensions,
                    jpeg: STANDARD.encode(&r.jpeg),
                    webp: STANDARD.encode(&r.webp),
                    filenames: r.filenames.clone(),
                    alt_text: r.alt_text.clone(),
                })
                .collect(),
            zip_base64: STANDARD.encode(&self.archive),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parsing() {
        assert_eq!("Jewelry".parse::<Category>().unwrap(), Category::Jewelry);
        assert_eq!(" clothing ".parse::<Category>().unwrap(), Category::Clothing);
        assert!("shoes".parse::<Category>().is_err());
        assert_eq!(Category::Clothing.slug(), "clothing");
        assert_eq!(Category::Jewelry.to_string(), "Jewelry");
    }

    #[test]
    fn test_scale_factor_bounds() {
        assert!(ScaleFactor::new(0.5).is_ok());
        assert!(ScaleFactor::new(1.5).is_ok());
        assert!(ScaleFactor::new(0.49).is_err());
        assert!(ScaleFactor::new(1.51).is_err());
        assert!(ScaleFactor::new(f32::NAN).is_err());
        assert!((ScaleFactor::default().value() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_scale_factor_deserialization_is_bounded() {
        let scale: ScaleFactor = serde_json::from_str("1.2").unwrap();
        assert!((scale.value() - 1.2).abs() < f32::EPSILON);
        assert_eq!(serde_json::to_string(&scale).unwrap(), "1.2");

        let err = serde_json::from_str::<ScaleFactor>("2.0").unwrap_err();
        assert!(err.to_string().contains("scale factor"));
        assert!(serde_json::from_str::<ScaleFactor>("0.1").is_err());
    }

    #[test]
    fn test_output_spec_padding() {
        let [square, portrait, tall] = OUTPUT_SPECS;
        assert_eq!(square.padding(0.05), 102);
        assert_eq!(portrait.padding(0.05), 100);
        assert_eq!(tall.padding(0.05), 90);
    }

    #[test]
    fn test_json_payload_shape() {
        let response = ProcessResponse {
            results: vec![ProcessedImage {
                size_key: "1x1".to_string(),
                dimensions: Dimensions {
                    width: 2048,
                    height: 2048,
                },
                jpeg: vec![1, 2, 3],
                webp: vec![4, 5],
                filenames: VariantFilenames {
                    jpeg: "jewelry-1-2048x2048.jpg".to_string(),
                    webp: "jewelry-1-2048x2048.webp".to_string(),
                },
                alt_text: "Gold elegant refined accessory".to_string(),
            }],
            archive: vec![9, 9, 9],
            category: Category::Jewelry,
            timestamp: 1,
            timings: PipelineTimings::default(),
        };

        let json = serde_json::to_value(response.to_json_payload()).unwrap();
        assert_eq!(json["results"][0]["sizeKey"], "1x1");
        assert_eq!(json["results"][0]["jpeg"], "AQID");
        assert_eq!(json["zipBase64"], "CQkJ");
        assert_eq!(response.archive_filename(), "jewelry-1.zip");

        let square = response.result("1x1").unwrap();
        assert_eq!(
            square.encoded(OutputFormat::WebP),
            ("jewelry-1-2048x2048.webp", [4u8, 5].as_slice())
        );
        assert!(response.result("3x4").is_none());
    }
}
