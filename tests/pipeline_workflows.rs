//! End-to-end compositing workflows on synthetic studio photographs

mod common;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{encode, fast_config, gold_product, model_png, product_png, studio_model};
use image::ImageFormat;
use std::collections::HashSet;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use storefront_compose::{
    services::ProgressUpdate, Category, CompositeError, CompositionPipeline, ExternalCompositor,
    ImageIOService, PipelineStage, PipelineTimings, ProcessResponse, ProgressReporter, Result,
    ScaleFactor, OUTPUT_SPECS,
};
use tempfile::TempDir;
use zip::ZipArchive;

#[derive(Default, Clone)]
struct StageRecorder {
    stages: Arc<Mutex<Vec<PipelineStage>>>,
    completions: Arc<AtomicUsize>,
}

impl ProgressReporter for StageRecorder {
    fn report_progress(&self, update: ProgressUpdate) {
        self.stages.lock().unwrap().push(update.stage);
    }

    fn report_completion(&self, _timings: &PipelineTimings) {
        self.completions.fetch_add(1, Ordering::SeqCst);
    }

    fn report_error(&self, _stage: PipelineStage, _error: &str) {}
}

fn archive_entries(archive: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut zip = ZipArchive::new(Cursor::new(archive)).unwrap();
    (0..zip.len())
        .map(|i| {
            let mut file = zip.by_index(i).unwrap();
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes).unwrap();
            (file.name().to_string(), bytes)
        })
        .collect()
}

fn assert_contract(response: &ProcessResponse, category: Category, timestamp: i64) {
    let keys: HashSet<&str> = response.results.iter().map(|r| r.size_key.as_str()).collect();
    assert_eq!(keys, HashSet::from(["1x1", "4x5", "3x4"]));
    assert_eq!(response.results.len(), 3);

    for (result, spec) in response.results.iter().zip(OUTPUT_SPECS.iter()) {
        assert_eq!(result.size_key, spec.size_key);
        assert!(!result.jpeg.is_empty());
        assert!(!result.webp.is_empty());
        assert!(result.alt_text.len() > 10);

        let jpeg = image::load_from_memory_with_format(&result.jpeg, ImageFormat::Jpeg).unwrap();
        let webp = image::load_from_memory_with_format(&result.webp, ImageFormat::WebP).unwrap();
        assert_eq!((jpeg.width(), jpeg.height()), (spec.width, spec.height));
        assert_eq!((webp.width(), webp.height()), (spec.width, spec.height));

        let stem = format!(
            "{}-{}-{}x{}",
            category.slug(),
            timestamp,
            spec.width,
            spec.height
        );
        assert_eq!(result.filenames.jpeg, format!("{}.jpg", stem));
        assert_eq!(result.filenames.webp, format!("{}.webp", stem));
    }

    let entries = archive_entries(&response.archive);
    assert_eq!(entries.len(), 6);
    let expected: Vec<(&str, &[u8])> = response
        .results
        .iter()
        .flat_map(|r| {
            [
                (r.filenames.jpeg.as_str(), r.jpeg.as_slice()),
                (r.filenames.webp.as_str(), r.webp.as_slice()),
            ]
        })
        .collect();
    for ((name, bytes), (expected_name, expected_bytes)) in entries.iter().zip(expected) {
        assert_eq!(name, expected_name);
        assert_eq!(bytes.as_slice(), expected_bytes);
    }
    assert_eq!(
        response.archive_filename(),
        format!("{}-{}.zip", category.slug(), timestamp)
    );
}

#[tokio::test]
async fn test_jewelry_run_produces_full_contract() {
    let recorder = StageRecorder::default();
    let stages = Arc::clone(&recorder.stages);
    let completions = Arc::clone(&recorder.completions);
    let mut pipeline = CompositionPipeline::new(fast_config())
        .unwrap()
        .with_progress_reporter(Box::new(recorder));

    // The 800x800 product sits exactly on the minimum-dimension boundary
    let response = pipeline
        .run_at(
            &model_png(),
            &product_png(),
            Category::Jewelry,
            ScaleFactor::default(),
            1_700_000_000_000,
        )
        .await
        .unwrap();

    assert_contract(&response, Category::Jewelry, 1_700_000_000_000);
    let alt_text = &response.results[0].alt_text;
    assert!(alt_text.ends_with("accessory showcased on a display bust"));
    assert!(response.results.iter().all(|r| &r.alt_text == alt_text));

    assert_eq!(
        *stages.lock().unwrap(),
        vec![
            PipelineStage::Validation,
            PipelineStage::Normalization,
            PipelineStage::Isolation,
            PipelineStage::Placement,
            PipelineStage::ShadowSynthesis,
            PipelineStage::Composition,
            PipelineStage::Grading,
            PipelineStage::ColorAnalysis,
            PipelineStage::Export,
            PipelineStage::Packaging,
            PipelineStage::Completed,
        ]
    );
    assert_eq!(completions.load(Ordering::SeqCst), 1);
    assert!(response.timings.total_ms >= response.timings.export_ms);
}

#[tokio::test]
async fn test_clothing_run_accepts_jpeg_inputs() {
    let model = encode(&studio_model(1000, 1200), ImageFormat::Jpeg);
    let product = encode(&gold_product(900, 820), ImageFormat::Jpeg);
    let mut pipeline = CompositionPipeline::new(fast_config()).unwrap();

    let response = pipeline
        .run_at(
            &model,
            &product,
            Category::Clothing,
            ScaleFactor::new(0.8).unwrap(),
            42,
        )
        .await
        .unwrap();

    assert_contract(&response, Category::Clothing, 42);
    assert!(response.results[0]
        .alt_text
        .ends_with("garment showcased on a tailored mannequin"));
}

#[tokio::test]
async fn test_identical_inputs_yield_identical_outputs() {
    let (model, product) = (model_png(), product_png());
    let mut pipeline = CompositionPipeline::new(fast_config()).unwrap();

    let first = pipeline
        .run_at(&model, &product, Category::Jewelry, ScaleFactor::default(), 7)
        .await
        .unwrap();
    let second = pipeline
        .run_at(&model, &product, Category::Jewelry, ScaleFactor::default(), 7)
        .await
        .unwrap();

    for (a, b) in first.results.iter().zip(second.results.iter()) {
        assert_eq!(a.jpeg, b.jpeg);
        assert_eq!(a.webp, b.webp);
        assert_eq!(a.alt_text, b.alt_text);
    }
    assert_eq!(first.archive, second.archive);
}

#[tokio::test]
async fn test_subject_interior_does_not_show_the_backdrop() {
    let (model, product) = (model_png(), product_png());
    let render = |background: [u8; 3]| {
        let (model, product) = (model.clone(), product.clone());
        async move {
            let mut config = fast_config();
            config.background = background;
            let response = CompositionPipeline::new(config)
                .unwrap()
                .run_at(&model, &product, Category::Jewelry, ScaleFactor::default(), 3)
                .await
                .unwrap();
            image::load_from_memory_with_format(&response.results[0].webp, ImageFormat::WebP)
                .unwrap()
                .to_rgba8()
        }
    };

    let light = render([0xf7, 0xf7, 0xf7]).await;
    let dark = render([0x10, 0x10, 0x10]).await;

    // Torso interior of the 2048x2048 variant, well inside the mask edge
    for (x, y) in [(1024, 1778), (706, 1611)] {
        assert_eq!(light.get_pixel(x, y), dark.get_pixel(x, y), "at ({x}, {y})");
    }
    assert_eq!(light.get_pixel(10, 10).0, [0xf7, 0xf7, 0xf7, 255]);
    assert_eq!(dark.get_pixel(10, 10).0, [0x10, 0x10, 0x10, 255]);
}

#[tokio::test]
async fn test_input_one_pixel_under_minimum_is_rejected() {
    let small = encode(&studio_model(799, 640), ImageFormat::Png);
    let mut pipeline = CompositionPipeline::new(fast_config()).unwrap();

    let err = pipeline
        .run(&model_png(), &small, Category::Jewelry, ScaleFactor::default())
        .await
        .unwrap_err();

    match err {
        CompositeError::TooSmall {
            width,
            height,
            minimum,
        } => assert_eq!((width, height, minimum), (799, 640, 800)),
        other => panic!("expected TooSmall, got {other:?}"),
    }
}

#[tokio::test]
async fn test_undecodable_inputs_are_rejected() {
    let mut pipeline = CompositionPipeline::new(fast_config()).unwrap();

    let err = pipeline
        .run(b"", &product_png(), Category::Jewelry, ScaleFactor::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CompositeError::InvalidImage(_)));

    let err = pipeline
        .run(&model_png(), b"not an image", Category::Clothing, ScaleFactor::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CompositeError::InvalidImage(_)));
    assert!(!err.is_retryable());
}

/// Compositor double returning a canned result
struct CannedCompositor {
    output: Result<Vec<u8>>,
    calls: AtomicUsize,
}

impl CannedCompositor {
    fn returning(output: Result<Vec<u8>>) -> Self {
        Self {
            output,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ExternalCompositor for CannedCompositor {
    fn name(&self) -> &'static str {
        "canned"
    }

    async fn composite(
        &self,
        _model: &[u8],
        _product: &[u8],
        _category: Category,
        _scale: ScaleFactor,
    ) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.output {
            Ok(bytes) => Ok(bytes.clone()),
            Err(e) => Err(CompositeError::composition(e.to_string())),
        }
    }
}

#[tokio::test]
async fn test_external_composite_is_exported_and_packaged() {
    let composite = encode(&studio_model(900, 1100), ImageFormat::Png);
    let compositor = CannedCompositor::returning(Ok(composite));
    let mut pipeline = CompositionPipeline::new(fast_config()).unwrap();

    let response = pipeline
        .run_with_external_at(
            &compositor,
            &model_png(),
            &product_png(),
            Category::Clothing,
            ScaleFactor::default(),
            99,
        )
        .await
        .unwrap();

    assert_eq!(compositor.calls.load(Ordering::SeqCst), 1);
    assert_contract(&response, Category::Clothing, 99);
}

#[tokio::test]
async fn test_external_failures_surface_as_external_errors() {
    let cases = [
        Ok(Vec::new()),
        Ok(b"garbage".to_vec()),
        Ok(encode(&studio_model(400, 400), ImageFormat::Png)),
        Err(CompositeError::composition("upstream exploded")),
    ];

    for output in cases {
        let compositor = CannedCompositor::returning(output);
        let mut pipeline = CompositionPipeline::new(fast_config()).unwrap();
        let err = pipeline
            .run_with_external(
                &compositor,
                &model_png(),
                &product_png(),
                Category::Jewelry,
                ScaleFactor::default(),
            )
            .await
            .unwrap_err();

        assert!(
            matches!(err, CompositeError::ExternalCompositor(_)),
            "unexpected error: {err:?}"
        );
        assert!(err.is_retryable());
    }
}

#[tokio::test]
async fn test_external_inputs_are_validated_before_the_call() {
    let compositor = CannedCompositor::returning(Ok(model_png()));
    let mut pipeline = CompositionPipeline::new(fast_config()).unwrap();
    let small = encode(&studio_model(300, 300), ImageFormat::Png);

    let err = pipeline
        .run_with_external(
            &compositor,
            &small,
            &product_png(),
            Category::Jewelry,
            ScaleFactor::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CompositeError::TooSmall { .. }));
    assert_eq!(compositor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_response_payload_and_written_outputs() {
    let mut pipeline = CompositionPipeline::new(fast_config()).unwrap();
    let response = pipeline
        .run_at(
            &model_png(),
            &product_png(),
            Category::Jewelry,
            ScaleFactor::new(1.2).unwrap(),
            5,
        )
        .await
        .unwrap();

    let payload = serde_json::to_value(response.to_json_payload()).unwrap();
    let zip_base64 = payload["zipBase64"].as_str().unwrap();
    assert_eq!(STANDARD.decode(zip_base64).unwrap(), response.archive);
    let first = &payload["results"][0];
    assert_eq!(first["sizeKey"], "1x1");
    assert_eq!(first["dimensions"]["width"], 2048);
    assert_eq!(
        STANDARD.decode(first["webp"].as_str().unwrap()).unwrap(),
        response.results[0].webp
    );
    assert_eq!(first["altText"], response.results[0].alt_text.as_str());

    let dir = TempDir::new().unwrap();
    let written = ImageIOService::write_response(&response, dir.path()).unwrap();
    assert_eq!(written.len(), 8);
    for result in &response.results {
        assert_eq!(
            std::fs::read(dir.path().join(&result.filenames.jpeg)).unwrap(),
            result.jpeg
        );
        assert!(dir.path().join(&result.filenames.webp).exists());
    }
    assert!(dir.path().join("jewelry-5.zip").exists());
    assert!(dir.path().join("manifest.json").exists());
}
