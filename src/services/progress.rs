//! Progress reporting service
//!
//! Separates progress reporting from the pipeline so each frontend can render
//! stage updates its own way.

use crate::types::PipelineTimings;
use instant::Instant;

/// Stages of a compositing run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Reading and checking input dimensions
    Validation,
    /// Decoding into the canonical color space
    Normalization,
    /// Building and applying subject masks
    Isolation,
    /// Computing the product rectangle
    Placement,
    /// Rendering the contact shadow
    ShadowSynthesis,
    /// Layering shadow and product onto the model
    Composition,
    /// Tone and contrast adjustment
    Grading,
    /// Extracting dominant colors for alt text
    ColorAnalysis,
    /// Rendering and encoding the size variants
    Export,
    /// Building the zip archive
    Packaging,
    Completed,
}

impl PipelineStage {
    /// Human-readable description of the stage
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Validation => "Validating input images",
            Self::Normalization => "Normalizing color space",
            Self::Isolation => "Isolating subjects",
            Self::Placement => "Computing product placement",
            Self::ShadowSynthesis => "Synthesizing shadow",
            Self::Composition => "Compositing layers",
            Self::Grading => "Grading colors",
            Self::ColorAnalysis => "Analyzing dominant colors",
            Self::Export => "Exporting size variants",
            Self::Packaging => "Packaging archive",
            Self::Completed => "Compositing completed",
        }
    }

    /// Typical overall progress when the stage starts
    #[must_use]
    pub fn progress_percentage(self) -> u8 {
        match self {
            Self::Validation => 2,
            Self::Normalization => 8,
            Self::Isolation => 15,
            Self::Placement => 30,
            Self::ShadowSynthesis => 32,
            Self::Composition => 38,
            Self::Grading => 45,
            Self::ColorAnalysis => 55,
            Self::Export => 60,
            Self::Packaging => 92,
            Self::Completed => 100,
        }
    }
}

/// Progress update containing stage and timing information
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub stage: PipelineStage,
    /// Progress percentage (0-100)
    pub progress: u8,
    pub description: String,
    /// Elapsed time since the run started (milliseconds)
    pub elapsed_ms: u64,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(stage: PipelineStage, start_time: Instant) -> Self {
        Self::with_description(stage, stage.description().to_string(), start_time)
    }

    /// Create a progress update with a custom description
    #[must_use]
    pub fn with_description(stage: PipelineStage, description: String, start_time: Instant) -> Self {
        Self {
            stage,
            progress: stage.progress_percentage(),
            description,
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        }
    }
}

/// Receives progress notifications from a pipeline run
pub trait ProgressReporter: Send + Sync {
    /// Report a progress update
    fn report_progress(&self, update: ProgressUpdate);

    /// Report completion with final timings
    fn report_completion(&self, timings: &PipelineTimings);

    /// Report a failure during `stage`
    fn report_error(&self, stage: PipelineStage, error: &str);
}

/// Reporter that discards everything
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _update: ProgressUpdate) {}

    fn report_completion(&self, _timings: &PipelineTimings) {}

    fn report_error(&self, _stage: PipelineStage, _error: &str) {}
}

/// Reporter that logs progress through the `log` facade
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if self.verbose {
            log::info!(
                "[{}%] {} ({}ms elapsed)",
                update.progress,
                update.description,
                update.elapsed_ms
            );
        } else {
            log::info!("[{}%] {}", update.progress, update.description);
        }
    }

    fn report_completion(&self, timings: &PipelineTimings) {
        log::info!("Compositing completed in {}ms", timings.total_ms);

        if self.verbose {
            log::info!("  Detailed timings:");
            log::info!("    validation: {}ms", timings.validation_ms);
            log::info!("    normalization: {}ms", timings.normalization_ms);
            log::info!("    isolation: {}ms", timings.isolation_ms);
            log::info!("    composition: {}ms", timings.composition_ms);
            log::info!("    grading: {}ms", timings.grading_ms);
            log::info!("    color analysis: {}ms", timings.analysis_ms);
            log::info!("    export: {}ms", timings.export_ms);
            log::info!("    packaging: {}ms", timings.packaging_ms);
        }
    }

    fn report_error(&self, stage: PipelineStage, error: &str) {
        log::error!("Error during {}: {}", stage.description(), error);
    }
}

/// Tracks the current stage and elapsed time for one run
pub struct ProgressTracker {
    reporter: Box<dyn ProgressReporter>,
    start_time: Instant,
    current_stage: Option<PipelineStage>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(reporter: Box<dyn ProgressReporter>) -> Self {
        Self {
            reporter,
            start_time: Instant::now(),
            current_stage: None,
        }
    }

    /// Tracker with a no-op reporter
    #[must_use]
    pub fn no_op() -> Self {
        Self::new(Box::new(NoOpProgressReporter))
    }

    #[must_use]
    pub fn console(verbose: bool) -> Self {
        Self::new(Box::new(ConsoleProgressReporter::new(verbose)))
    }

    /// Restart the clock and forget the current stage
    pub fn reset(&mut self) {
        self.start_time = Instant::now();
        self.current_stage = None;
    }

    pub fn report_stage(&mut self, stage: PipelineStage) {
        self.current_stage = Some(stage);
        self.reporter
            .report_progress(ProgressUpdate::new(stage, self.start_time));
    }

    pub fn report_stage_with_description(&mut self, stage: PipelineStage, description: String) {
        self.current_stage = Some(stage);
        self.reporter.report_progress(ProgressUpdate::with_description(
            stage,
            description,
            self.start_time,
        ));
    }

    pub fn report_completion(&self, timings: &PipelineTimings) {
        self.reporter.report_completion(timings);
    }

    /// Report an error against the current stage
    pub fn report_error(&self, error: &str) {
        let stage = self.current_stage.unwrap_or(PipelineStage::Validation);
        self.reporter.report_error(stage, error);
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    #[must_use]
    pub fn current_stage(&self) -> Option<PipelineStage> {
        self.current_stage
    }
}
