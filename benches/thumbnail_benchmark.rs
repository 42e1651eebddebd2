use std::io::Cursor;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{ImageOutputFormat, Rgb, RgbImage};
use tempfile::TempDir;
use thumbfan::{BatchOrchestrator, FilterType, ThumbnailTransform, Transform};

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    gradient(width, height)
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .unwrap();
    bytes
}

fn benchmark_transform(c: &mut Criterion) {
    let input = png_bytes(1024, 768);
    let mut group = c.benchmark_group("transform");

    for filter in [FilterType::Nearest, FilterType::Triangle, FilterType::Lanczos3] {
        let transform = ThumbnailTransform::new().filter(filter);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{filter:?}")),
            &input,
            |b, input| b.iter(|| transform.transform(black_box(input)).unwrap()),
        );
    }

    group.finish();
}

fn benchmark_batch(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let items: Vec<_> = (0..16)
        .map(|i| {
            let path = dir.path().join(format!("bench-{i}.png"));
            gradient(320, 240).save(&path).unwrap();
            path
        })
        .collect();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();

    let mut group = c.benchmark_group("batch");
    group.sample_size(20);

    for cap in [Some(1), Some(4), None] {
        let orchestrator = BatchOrchestrator::new(Arc::new(ThumbnailTransform::new()))
            .with_max_concurrency(cap);
        let label = cap.map_or_else(|| "unbounded".to_string(), |n| n.to_string());
        group.bench_function(BenchmarkId::new("16_images", label), |b| {
            b.iter(|| runtime.block_on(orchestrator.run(items.clone())).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_transform, benchmark_batch);
criterion_main!(benches);
