use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{Rgba, RgbaImage};
use std::sync::Arc;
use storefront_compose::{
    calculate_placement, Category, ColorGrader, GradingConfig, MultiSizeExporter, PipelineConfig,
    ScaleFactor,
};
use tokio::runtime::Runtime;

/// Grey torso on a transparent canvas with a gold block where the product sits
fn composite(width: u32, height: u32) -> RgbaImage {
    let mut image = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        if x > width / 4 && x < width - width / 4 && y > height / 6 {
            *pixel = Rgba([140, 140, 140, 255]);
        }
        if x > width * 2 / 5 && x < width * 3 / 5 && y > height / 4 && y < height / 3 {
            *pixel = Rgba([210, 160, 60, 255]);
        }
    }
    image
}

fn bench_placement(c: &mut Criterion) {
    let mut group = c.benchmark_group("placement");
    for category in [Category::Jewelry, Category::Clothing] {
        group.bench_function(category.slug(), |b| {
            b.iter(|| {
                calculate_placement(
                    black_box(category),
                    black_box((1200, 1600)),
                    black_box((800, 900)),
                    ScaleFactor::default(),
                )
            });
        });
    }
    group.finish();
}

fn bench_grading(c: &mut Criterion) {
    let mut group = c.benchmark_group("grading");
    group.sample_size(10);
    let grader = ColorGrader::new(GradingConfig::default());

    for (width, height) in [(600, 800), (1200, 1600)] {
        let image = composite(width, height);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", width, height)),
            &image,
            |b, image| {
                b.iter(|| grader.grade(black_box(image), Category::Jewelry).unwrap());
            },
        );
    }
    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("export");
    group.sample_size(10);
    let image = Arc::new(composite(1200, 1600));

    for parallel in [false, true] {
        let config = PipelineConfig::builder()
            .parallel_exports(parallel)
            .build()
            .unwrap();
        let exporter = MultiSizeExporter::new(&config);
        let name = if parallel { "parallel" } else { "sequential" };

        group.bench_function(name, |b| {
            b.iter(|| {
                rt.block_on(exporter.export_all(
                    Arc::clone(&image),
                    Category::Clothing,
                    0,
                    "Charcoal tailored modern garment",
                ))
                .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_placement, bench_grading, bench_export);
criterion_main!(benches);
