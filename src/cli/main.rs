//! Storefront Compose CLI Tool
//!
//! Reads a model photograph and a product photograph, runs the compositing
//! pipeline (locally or through the external compositor) and writes the six
//! variants, the archive and a manifest into the output directory.

use super::config::CliConfigBuilder;
use crate::{
    pipeline::CompositionPipeline,
    services::{ImageIOService, PipelineStage, ProgressReporter, ProgressUpdate},
    tracing_config::{init_cli_tracing, TracingFormat},
    types::{Category, PipelineTimings, ProcessResponse},
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::PathBuf;
use std::time::Duration;

/// Storefront image compositing tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "storefront-compose")]
pub struct Cli {
    /// Photograph of the display bust or mannequin
    #[arg(long, value_name = "PATH")]
    pub model: PathBuf,

    /// Photograph of the product
    #[arg(long, value_name = "PATH")]
    pub product: PathBuf,

    /// Product category
    #[arg(short, long, value_enum)]
    pub category: CliCategory,

    /// Multiplier on the product width (0.5-1.5)
    #[arg(short, long, default_value_t = 1.0)]
    pub scale: f32,

    /// Directory receiving the variants, archive and manifest
    #[arg(short, long, value_name = "DIR", default_value = "storefront-output")]
    pub output: PathBuf,

    /// JPEG quality (1-100)
    #[arg(long, default_value_t = 88)]
    pub jpeg_quality: u8,

    /// Blend through the external compositor instead of the local pipeline
    #[arg(long)]
    pub external: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = CliLogFormat::Console)]
    pub log_format: CliLogFormat,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliCategory {
    Jewelry,
    Clothing,
}

impl From<CliCategory> for Category {
    fn from(category: CliCategory) -> Self {
        match category {
            CliCategory::Jewelry => Category::Jewelry,
            CliCategory::Clothing => Category::Clothing,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliLogFormat {
    Console,
    Compact,
    Json,
}

impl CliLogFormat {
    fn tracing_format(self) -> Result<TracingFormat> {
        match self {
            Self::Console => Ok(TracingFormat::Console),
            Self::Compact => Ok(TracingFormat::Compact),
            #[cfg(feature = "tracing-json")]
            Self::Json => Ok(TracingFormat::Json),
            #[cfg(not(feature = "tracing-json"))]
            Self::Json => {
                anyhow::bail!("JSON log output requires the 'tracing-json' feature")
            },
        }
    }
}

/// Progress reporter rendering pipeline stages on an indicatif bar
pub struct IndicatifProgressReporter {
    bar: ProgressBar,
}

impl IndicatifProgressReporter {
    #[must_use]
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .map_or_else(|_| ProgressStyle::default_bar(), |s| s.progress_chars("#>-"));
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    /// Reporter with a hidden bar, for non-interactive output
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl Default for IndicatifProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for IndicatifProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        self.bar.set_position(u64::from(update.progress));
        self.bar.set_message(update.description);
    }

    fn report_completion(&self, timings: &PipelineTimings) {
        self.bar
            .finish_with_message(format!("Done in {}ms", timings.total_ms));
    }

    fn report_error(&self, stage: PipelineStage, error: &str) {
        self.bar.abandon_with_message(format!(
            "Failed during {}: {}",
            stage.description().to_lowercase(),
            error
        ));
    }
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_cli_tracing(cli.verbose, cli.log_format.tracing_format()?)
        .context("Failed to initialize tracing")?;

    let config = CliConfigBuilder::from_cli(&cli).context("Invalid arguments")?;
    let scale = CliConfigBuilder::scale(&cli).context("Invalid arguments")?;
    let category = Category::from(cli.category);

    let model = ImageIOService::read_bytes(&cli.model).context("Failed to read model image")?;
    let product =
        ImageIOService::read_bytes(&cli.product).context("Failed to read product image")?;
    for path in [&cli.model, &cli.product] {
        if !ImageIOService::is_supported_format(path) {
            warn!(
                "{} does not have a PNG, JPEG or WebP extension; relying on content sniffing",
                path.display()
            );
        }
    }

    info!(
        "Compositing {} onto {} as {} (scale {:.2})",
        cli.product.display(),
        cli.model.display(),
        category,
        scale.value()
    );

    let reporter: Box<dyn ProgressReporter> = if cli.no_progress || cli.verbose > 0 {
        Box::new(IndicatifProgressReporter::hidden())
    } else {
        Box::new(IndicatifProgressReporter::new())
    };
    let mut pipeline = CompositionPipeline::new(config)
        .context("Invalid pipeline configuration")?
        .with_progress_reporter(reporter);

    let response = if cli.external {
        run_external(&mut pipeline, &model, &product, category, scale).await?
    } else {
        pipeline
            .run(&model, &product, category, scale)
            .await
            .context("Compositing failed")?
    };

    let written = ImageIOService::write_response(&response, &cli.output)
        .with_context(|| format!("Failed to write outputs to {}", cli.output.display()))?;
    print_summary(&response, written.len(), &cli.output);
    Ok(())
}

#[cfg(feature = "external-compositor")]
async fn run_external(
    pipeline: &mut CompositionPipeline,
    model: &[u8],
    product: &[u8],
    category: Category,
    scale: crate::types::ScaleFactor,
) -> Result<ProcessResponse> {
    let compositor = crate::external::OpenAiCompositor::from_env()
        .context("External compositor is not configured")?;
    info!("Using external compositor model {}", compositor.model());

    pipeline
        .run_with_external(&compositor, model, product, category, scale)
        .await
        .context("External compositing failed; retry or run without --external")
}

#[cfg(not(feature = "external-compositor"))]
async fn run_external(
    _pipeline: &mut CompositionPipeline,
    _model: &[u8],
    _product: &[u8],
    _category: Category,
    _scale: crate::types::ScaleFactor,
) -> Result<ProcessResponse> {
    anyhow::bail!("--external requires the 'external-compositor' feature")
}

fn print_summary(response: &ProcessResponse, file_count: usize, output: &std::path::Path) {
    println!(
        "Composited {} ({} variants, {} files) into {}",
        response.category,
        response.results.len(),
        file_count,
        output.display()
    );
    for result in &response.results {
        println!(
            "  {:<4} {}x{}  {} ({} bytes), {} ({} bytes)",
            result.size_key,
            result.dimensions.width,
            result.dimensions.height,
            result.filenames.jpeg,
            result.jpeg.len(),
            result.filenames.webp,
            result.webp.len()
        );
    }
    if let Some(square) = response.result("1x1") {
        println!("  Alt text: {}", square.alt_text);
    }
    println!(
        "  Archive: {} ({} bytes) in {}ms",
        response.archive_filename(),
        response.archive.len(),
        response.timings.total_ms
    );
}
