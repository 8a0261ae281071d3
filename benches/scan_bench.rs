use std::io::Cursor;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dexmatch::{
    BusinessRef, Catalog, DexConfig, ExtractionBatch, MatchPipeline, MemoryPixelSource,
    SimilarityConfig, SimilarityEngine,
};
use image::{DynamicImage, ImageFormat, Luma, GrayImage};

fn page(variant: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(320, 420, |x, y| {
        Luma([((x * (2 + variant % 7) + y * (3 + variant % 5)) % 256) as u8])
    }))
}

fn png(img: &DynamicImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .expect("encode bench page");
    buf.into_inner()
}

/// Catalog of `pages` synthetic pages held in memory.
fn setup_pipeline(pages: u32, parallel: bool) -> MatchPipeline {
    let catalog = Arc::new(Catalog::in_memory());
    let pixels = Arc::new(MemoryPixelSource::new());
    let mut batch = ExtractionBatch::new("bench.pdf");
    for n in 1..=pages {
        let locator = format!("bench/page_{n}.png");
        pixels.insert(locator.clone(), png(&page(n)));
        batch = batch.with_page(n, locator);
    }
    catalog
        .register_extracted(&BusinessRef::new("biz-bench", "Bench"), batch)
        .expect("register bench pages");

    let mut cfg = DexConfig::default();
    cfg.scan.parallel = parallel;
    MatchPipeline::new(&cfg, catalog, pixels).expect("bench pipeline")
}

fn bench_prepare(c: &mut Criterion) {
    let engine = SimilarityEngine::new(SimilarityConfig::default()).expect("engine");
    let bytes = png(&page(3));
    let decoded = SimilarityEngine::decode(&bytes).expect("decode");

    let mut group = c.benchmark_group("prepare");
    group.bench_function("decoded", |b| b.iter(|| engine.prepare(black_box(&decoded))));
    group.bench_function("encoded_png", |b| {
        b.iter(|| engine.prepare_bytes(black_box(&bytes)))
    });
    group.finish();
}

fn bench_compare(c: &mut Criterion) {
    let engine = SimilarityEngine::new(SimilarityConfig::default()).expect("engine");
    let a = engine.prepare(&page(1));
    let b = engine.prepare(&page(2));
    c.bench_function("compare_prepared", |bench| {
        bench.iter(|| engine.compare(black_box(&a), black_box(&b)))
    });
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_image");
    group.sample_size(20);
    let probe = png(&page(17));

    for &size in &[25u32, 100] {
        group.throughput(Throughput::Elements(u64::from(size)));
        for parallel in [false, true] {
            let pipeline = setup_pipeline(size, parallel);
            let label = if parallel { "parallel" } else { "sequential" };
            group.bench_with_input(BenchmarkId::new(label, size), &probe, |b, probe| {
                b.iter(|| pipeline.match_image(black_box(probe)))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_prepare, bench_compare, bench_scan);
criterion_main!(benches);
