#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Storefront Compose
//!
//! Turns a photograph of a display surface (a bust or a mannequin) and a
//! photograph of a product into storefront-ready composites.
//!
//! A run validates both inputs, normalizes them to sRGB, isolates each subject
//! from its studio background, places the product on the display with a soft
//! contact shadow, grades the result and exports it at three fixed aspect
//! ratios (1x1, 4x5, 3x4), each as JPEG and lossless WebP. The six files are
//! also packaged into a single zip archive and every variant carries generated
//! alt text built from the dominant colors of the composite.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use storefront_compose::{compose_from_bytes, Category, ScaleFactor};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let model = std::fs::read("bust.jpg")?;
//! let product = std::fs::read("necklace.png")?;
//!
//! let response =
//!     compose_from_bytes(&model, &product, Category::Jewelry, ScaleFactor::new(1.1)?).await?;
//! for result in &response.results {
//!     println!("{} -> {}", result.size_key, result.filenames.jpeg);
//! }
//! std::fs::write(response.archive_filename(), &response.archive)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom configuration
//!
//! ```rust,no_run
//! use storefront_compose::{
//!     Category, CompositionPipeline, ConsoleProgressReporter, PipelineConfig, ScaleFactor,
//! };
//!
//! # async fn example(model: Vec<u8>, product: Vec<u8>) -> anyhow::Result<()> {
//! let config = PipelineConfig::builder()
//!     .jpeg_quality(92)
//!     .background([0xff, 0xff, 0xff])
//!     .build()?;
//! let mut pipeline = CompositionPipeline::new(config)?
//!     .with_progress_reporter(Box::new(ConsoleProgressReporter::new(true)));
//! let response = pipeline
//!     .run(&model, &product, Category::Clothing, ScaleFactor::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface and subscriber setup
//! - `external-compositor` (default): AI-backed compositor client
//! - `tracing-json`: JSON log output for the CLI

pub mod archive;
#[cfg(feature = "cli")]
pub mod cli;
pub mod color_analysis;
pub mod compositor;
pub mod config;
pub mod description;
pub mod error;
pub mod export;
pub mod external;
pub mod grading;
pub mod isolation;
pub mod pipeline;
pub mod placement;
pub mod services;
pub mod shadow;
pub mod tracing_config;
pub mod types;
pub mod utils;

// Public API exports
pub use archive::ArchivePackager;
pub use color_analysis::{dominant_colors, ColorName};
pub use compositor::Compositor;
pub use config::{
    GradingConfig, MaskConfig, OutputFormat, PipelineConfig, PipelineConfigBuilder, ShadowConfig,
};
pub use description::build_alt_text;
pub use error::{CompositeError, Result};
pub use export::MultiSizeExporter;
#[cfg(feature = "external-compositor")]
pub use external::OpenAiCompositor;
pub use external::{build_composite_prompt, ExternalCompositor};
pub use grading::ColorGrader;
pub use isolation::{LumaThresholdMask, MaskStrategy, SegmentationMask};
pub use pipeline::CompositionPipeline;
pub use placement::calculate_placement;
pub use services::{
    ConsoleProgressReporter, ImageIOService, NoOpProgressReporter, OutputFormatHandler,
    PipelineStage, ProgressReporter, ProgressTracker, ProgressUpdate,
};
pub use shadow::ShadowSynthesizer;
pub use types::{
    Category, Dimensions, Placement, PipelineTimings, ProcessResponse, ProcessedImage, RawImage,
    ScaleFactor, VariantFilenames, OUTPUT_SPECS,
};
pub use utils::{ImageValidator, Normalizer};

pub use tracing_config::{events, spans, TracingConfig, TracingFormat};
#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, init_library_tracing};

/// Composite a product onto a display photograph with the default configuration
///
/// # Arguments
///
/// * `model` - Encoded photograph of the bust or mannequin (PNG, JPEG, WebP)
/// * `product` - Encoded photograph of the product
/// * `category` - Product category, which drives placement and grading
/// * `scale` - Multiplier on the product width, within 0.5-1.5
///
/// # Returns
///
/// A `ProcessResponse` with three size variants in two encodings each and the
/// zip archive holding all six files
///
/// # Examples
///
/// ```rust,no_run
/// use storefront_compose::{compose_from_bytes, Category, ScaleFactor};
///
/// # async fn example(upload_model: Vec<u8>, upload_product: Vec<u8>) -> anyhow::Result<()> {
/// let response = compose_from_bytes(
///     &upload_model,
///     &upload_product,
///     Category::Clothing,
///     ScaleFactor::default(),
/// )
/// .await?;
/// let body = serde_json::to_string(&response.to_json_payload())?;
/// # Ok(())
/// # }
/// ```
pub async fn compose_from_bytes(
    model: &[u8],
    product: &[u8],
    category: Category,
    scale: ScaleFactor,
) -> Result<ProcessResponse> {
    let mut pipeline = CompositionPipeline::new(PipelineConfig::default())?;
    pipeline.run(model, product, category, scale).await
}
