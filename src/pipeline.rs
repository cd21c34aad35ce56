//! Pipeline orchestration
//!
//! Per-image stages (validation, normalization, isolation) run for both inputs
//! concurrently on the blocking pool and must both succeed. Everything after
//! placement is a strict chain: each stage takes ownership of the previous
//! stage's buffer and hands a new one forward.

use crate::{
    archive::ArchivePackager,
    color_analysis::dominant_colors,
    compositor::{resize_contain_rows, Compositor},
    config::PipelineConfig,
    description::build_alt_text,
    error::{CompositeError, Result},
    export::MultiSizeExporter,
    external::ExternalCompositor,
    grading::ColorGrader,
    isolation::{isolate, LumaThresholdMask, MaskStrategy},
    placement::calculate_placement,
    services::{PipelineStage, ProgressReporter, ProgressTracker},
    shadow::ShadowSynthesizer,
    tracing_config::{events, spans},
    types::{Category, PipelineTimings, ProcessResponse, RawImage, ScaleFactor},
    utils::{ImageValidator, Normalizer},
};
use image::RgbaImage;
use instant::Instant;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn, Instrument};

/// Current wall-clock time in milliseconds, used for filenames
#[must_use]
pub fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Run CPU-bound work on the blocking pool inside a stage span
async fn blocking<T, F>(stage: &'static str, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let span = spans::stage(stage);
    tokio::task::spawn_blocking(move || span.in_scope(work))
        .await
        .map_err(|e| {
            CompositeError::composition(format!("Stage '{}' did not complete: {}", stage, e))
        })?
}

async fn join_stage<T>(stage: &'static str, handle: JoinHandle<Result<T>>) -> Result<T> {
    handle.await.map_err(|e| {
        CompositeError::composition(format!("Stage '{}' did not complete: {}", stage, e))
    })?
}

/// Apply `work` to both inputs concurrently, failing on the first error
async fn both<I, T, F>(stage: &'static str, first: I, second: I, work: F) -> Result<(T, T)>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Result<T> + Clone + Send + 'static,
{
    let span = spans::stage(stage);
    let first_work = work.clone();
    let first_span = span.clone();
    let first = tokio::task::spawn_blocking(move || first_span.in_scope(|| first_work(first)));
    let second = tokio::task::spawn_blocking(move || span.in_scope(|| work(second)));

    tokio::try_join!(join_stage(stage, first), join_stage(stage, second))
}

/// Orchestrates a full compositing run
pub struct CompositionPipeline {
    config: PipelineConfig,
    validator: ImageValidator,
    mask_strategy: Arc<dyn MaskStrategy>,
    progress_tracker: Option<ProgressTracker>,
}

impl CompositionPipeline {
    /// Create a pipeline with the luma-threshold isolator
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` when the configuration does not validate
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let strategy = Box::new(LumaThresholdMask::new(config.mask.clone()));
        Self::with_mask_strategy(config, strategy)
    }

    /// Create a pipeline with a custom isolation strategy
    pub fn with_mask_strategy(
        config: PipelineConfig,
        mask_strategy: Box<dyn MaskStrategy>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            validator: ImageValidator::new(config.min_dimension),
            mask_strategy: Arc::from(mask_strategy),
            config,
            progress_tracker: None,
        })
    }

    /// Attach a progress reporter
    #[must_use]
    pub fn with_progress_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.progress_tracker = Some(ProgressTracker::new(reporter));
        self
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn report_stage(&mut self, stage: PipelineStage) {
        if let Some(ref mut tracker) = self.progress_tracker {
            tracker.report_stage(stage);
        }
    }

    fn report_stage_described(&mut self, stage: PipelineStage, description: String) {
        if let Some(ref mut tracker) = self.progress_tracker {
            tracker.report_stage_with_description(stage, description);
        }
    }

    fn begin_run(&mut self) {
        if let Some(ref mut tracker) = self.progress_tracker {
            tracker.reset();
        }
    }

    /// Report a failed run against the stage it stopped in
    fn fail(&self, error: CompositeError) -> CompositeError {
        events::error_with_context(&error, "compositing run");
        if let Some(ref tracker) = self.progress_tracker {
            tracker.report_error(&error.to_string());
        }
        error
    }

    /// Run the full pipeline stamped with the current time
    pub async fn run(
        &mut self,
        model: &[u8],
        product: &[u8],
        category: Category,
        scale: ScaleFactor,
    ) -> Result<ProcessResponse> {
        self.run_at(model, product, category, scale, current_timestamp())
            .await
    }

    /// Run the full pipeline with an explicit filename timestamp
    #[instrument(
        skip(self, model, product),
        fields(category = %category, scale = scale.value(), model_bytes = model.len(), product_bytes = product.len())
    )]
    pub async fn run_at(
        &mut self,
        model: &[u8],
        product: &[u8],
        category: Category,
        scale: ScaleFactor,
        timestamp: i64,
    ) -> Result<ProcessResponse> {
        self.begin_run();
        let span = spans::pipeline_run(category, timestamp);
        let result = self
            .execute(model, product, category, scale, timestamp)
            .instrument(span)
            .await;
        result.map_err(|e| self.fail(e))
    }

    async fn execute(
        &mut self,
        model: &[u8],
        product: &[u8],
        category: Category,
        scale: ScaleFactor,
        timestamp: i64,
    ) -> Result<ProcessResponse> {
        let total_start = Instant::now();
        let mut timings = PipelineTimings::default();
        info!(category = %category, scale = scale.value(), "Starting compositing run");

        let model: Arc<[u8]> = Arc::from(model);
        let product: Arc<[u8]> = Arc::from(product);

        // (a) validation: both inputs must pass before any pixel work
        self.report_stage(PipelineStage::Validation);
        let start = Instant::now();
        let validator = self.validator;
        both(
            "validation",
            Arc::clone(&model),
            Arc::clone(&product),
            move |bytes: Arc<[u8]>| validator.validate(&bytes),
        )
        .await?;
        timings.validation_ms = elapsed_ms(start);

        // (b) normalization
        self.report_stage(PipelineStage::Normalization);
        let start = Instant::now();
        let (model_raw, product_raw) = both("normalization", model, product, |bytes: Arc<[u8]>| {
            Normalizer::normalize(&bytes)
        })
        .await?;
        timings.normalization_ms = elapsed_ms(start);

        // (c) subject isolation
        let strategy = Arc::clone(&self.mask_strategy);
        self.report_stage_described(
            PipelineStage::Isolation,
            format!("Isolating subjects ({})", strategy.name()),
        );
        let start = Instant::now();
        let (model_isolated, product_isolated) =
            both("isolation", model_raw, product_raw, move |raw: RawImage| {
                isolate(strategy.as_ref(), &raw)
            })
            .await?;
        timings.isolation_ms = elapsed_ms(start);

        // (d)-(f) placement, shadow, composition
        let start = Instant::now();
        let composite = self
            .compose_layers(model_isolated, product_isolated, category, scale)
            .await?;
        timings.composition_ms = elapsed_ms(start);

        // (g) grading
        self.report_stage(PipelineStage::Grading);
        let start = Instant::now();
        let grader = ColorGrader::new(self.config.grading.clone());
        let graded = blocking("grading", move || grader.grade(&composite, category)).await?;
        timings.grading_ms = elapsed_ms(start);
        events::stage_completed("grading", timings.grading_ms);

        self.finish(graded, category, timestamp, timings, total_start)
            .await
    }

    async fn compose_layers(
        &mut self,
        model: RawImage,
        product: RawImage,
        category: Category,
        scale: ScaleFactor,
    ) -> Result<RgbaImage> {
        self.report_stage(PipelineStage::Placement);
        let placement = calculate_placement(
            category,
            model.metadata.dimensions(),
            product.metadata.dimensions(),
            scale,
        )?;

        self.report_stage(PipelineStage::ShadowSynthesis);
        let synthesizer = ShadowSynthesizer::new(self.config.shadow.clone());
        let shadow_offset = synthesizer.vertical_offset(placement.height);
        let (width, height) = (placement.width, placement.height);
        // Layers are only rendered down to the bottom edge of the model canvas
        let canvas_height = model.pixels.height();
        let product_rows = canvas_height.saturating_sub(placement.top);
        let shadow_rows =
            canvas_height.saturating_sub(placement.top.saturating_add(shadow_offset));
        let shadow_required = self.config.shadow_required;
        let (product_layer, shadow) = blocking("shadow_synthesis", move || {
            let product_layer = resize_contain_rows(&product.pixels, width, height, product_rows)?;
            let shadow = match synthesizer.synthesize(width, height, shadow_rows) {
                Ok(shadow) => Some(shadow),
                Err(e) if !shadow_required => {
                    warn!(error = %e, "Shadow synthesis failed; continuing without shadow");
                    None
                },
                Err(e) => return Err(e),
            };
            Ok((product_layer, shadow))
        })
        .await?;

        self.report_stage(PipelineStage::Composition);
        blocking("composition", move || {
            Compositor::compose(
                model.pixels,
                &product_layer,
                shadow.as_ref(),
                &placement,
                shadow_offset,
            )
        })
        .await
    }

    /// Run stages (h)-(k) on an already finished composite
    ///
    /// Used for composites produced outside the local pipeline; grading and
    /// isolation are skipped.
    pub async fn finish_from_composite(
        &mut self,
        composite: RgbaImage,
        category: Category,
        timestamp: i64,
    ) -> Result<ProcessResponse> {
        self.begin_run();
        let span = spans::pipeline_run(category, timestamp);
        let result = self
            .finish(
                composite,
                category,
                timestamp,
                PipelineTimings::default(),
                Instant::now(),
            )
            .instrument(span)
            .await;
        result.map_err(|e| self.fail(e))
    }

    async fn finish(
        &mut self,
        graded: RgbaImage,
        category: Category,
        timestamp: i64,
        mut timings: PipelineTimings,
        total_start: Instant,
    ) -> Result<ProcessResponse> {
        // (h) flatten onto the background; (i) analyze the graded layer
        self.report_stage(PipelineStage::ColorAnalysis);
        let start = Instant::now();
        let background = self.config.background;
        let (flattened, alt_text) = blocking("color_analysis", move || {
            let flattened = Compositor::flatten_onto(&graded, background);
            let colors = dominant_colors(&graded);
            Ok((flattened, build_alt_text(&colors, category)))
        })
        .await?;
        timings.analysis_ms = elapsed_ms(start);

        // (j) export
        self.report_stage(PipelineStage::Export);
        let start = Instant::now();
        let exporter = MultiSizeExporter::new(&self.config);
        let results = exporter
            .export_all(Arc::new(flattened), category, timestamp, &alt_text)
            .await?;
        timings.export_ms = elapsed_ms(start);
        events::stage_completed("export", timings.export_ms);

        // (k) packaging
        self.report_stage(PipelineStage::Packaging);
        let start = Instant::now();
        let packager = ArchivePackager::new(self.config.archive_compression_level);
        let (results, archive) = blocking("packaging", move || {
            let archive = packager.package(&results)?;
            Ok((results, archive))
        })
        .await?;
        timings.packaging_ms = elapsed_ms(start);

        timings.total_ms = elapsed_ms(total_start);
        self.report_stage(PipelineStage::Completed);
        if let Some(ref tracker) = self.progress_tracker {
            tracker.report_completion(&timings);
        }
        info!(
            total_ms = timings.total_ms,
            archive_bytes = archive.len(),
            alt_text = %alt_text,
            "Compositing run completed"
        );

        Ok(ProcessResponse {
            results,
            archive,
            category,
            timestamp,
            timings,
        })
    }

    /// Delegate blending to an external compositor, then export and package locally
    pub async fn run_with_external(
        &mut self,
        compositor: &dyn ExternalCompositor,
        model: &[u8],
        product: &[u8],
        category: Category,
        scale: ScaleFactor,
    ) -> Result<ProcessResponse> {
        self.run_with_external_at(compositor, model, product, category, scale, current_timestamp())
            .await
    }

    /// [`Self::run_with_external`] with an explicit filename timestamp
    #[instrument(skip(self, compositor, model, product), fields(compositor = compositor.name(), category = %category))]
    pub async fn run_with_external_at(
        &mut self,
        compositor: &dyn ExternalCompositor,
        model: &[u8],
        product: &[u8],
        category: Category,
        scale: ScaleFactor,
        timestamp: i64,
    ) -> Result<ProcessResponse> {
        self.begin_run();
        let span = spans::pipeline_run(category, timestamp);
        let result = self
            .execute_external(compositor, model, product, category, scale, timestamp)
            .instrument(span)
            .await;
        result.map_err(|e| self.fail(e))
    }

    async fn execute_external(
        &mut self,
        compositor: &dyn ExternalCompositor,
        model: &[u8],
        product: &[u8],
        category: Category,
        scale: ScaleFactor,
        timestamp: i64,
    ) -> Result<ProcessResponse> {
        let total_start = Instant::now();
        let mut timings = PipelineTimings::default();

        self.report_stage(PipelineStage::Validation);
        let start = Instant::now();
        let validator = self.validator;
        both(
            "validation",
            Arc::<[u8]>::from(model),
            Arc::<[u8]>::from(product),
            move |bytes: Arc<[u8]>| validator.validate(&bytes),
        )
        .await?;
        timings.validation_ms = elapsed_ms(start);

        self.report_stage(PipelineStage::Composition);
        let start = Instant::now();
        let encoded = compositor
            .composite(model, product, category, scale)
            .await
            .map_err(|e| match e {
                CompositeError::ExternalCompositor(_) => e,
                other => CompositeError::external(other.to_string()),
            })?;
        if encoded.is_empty() {
            return Err(CompositeError::external("Received an empty composite image"));
        }

        let composite = blocking("normalization", move || {
            validator
                .validate(&encoded)
                .and_then(|_| Normalizer::normalize(&encoded))
                .map_err(|e| CompositeError::external(format!("Composite was rejected: {}", e)))
        })
        .await?;
        timings.composition_ms = elapsed_ms(start);
        info!(
            compositor = compositor.name(),
            width = composite.metadata.width,
            height = composite.metadata.height,
            "Received external composite"
        );

        self.finish(composite.pixels, category, timestamp, timings, total_start)
            .await
    }
}
