//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::{
    config::PipelineConfig,
    types::ScaleFactor,
};
use anyhow::{Context, Result};

/// Convert CLI arguments to a `PipelineConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the pipeline configuration from CLI arguments
    pub(crate) fn from_cli(cli: &Cli) -> Result<PipelineConfig> {
        Self::validate_cli(cli)?;

        PipelineConfig::builder()
            .jpeg_quality(cli.jpeg_quality)
            .build()
            .context("Invalid configuration")
    }

    /// Parse the scale argument into its bounded type
    pub(crate) fn scale(cli: &Cli) -> Result<ScaleFactor> {
        ScaleFactor::new(cli.scale).context("Invalid --scale")
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if !(1..=100).contains(&cli.jpeg_quality) {
            anyhow::bail!(
                "JPEG quality must be between 1 and 100, got {}",
                cli.jpeg_quality
            );
        }

        Self::scale(cli)?;

        if cli.model == cli.product {
            anyhow::bail!(
                "Model and product must be different files: {}",
                cli.model.display()
            );
        }

        if cli.output.is_file() {
            anyhow::bail!(
                "Output path exists and is a file, not a directory: {}",
                cli.output.display()
            );
        }

        Ok(())
    }
}
