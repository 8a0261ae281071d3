use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, GrayImage, Luma};
use similarity::{EdgeOperatorKind, SimilarityConfig, SimilarityEngine};

fn sample(w: u32, h: u32, phase: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(w, h, |x, y| {
        Luma([(((x + phase) * 5 + y * 11) % 256) as u8])
    }))
}

fn bench_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("similarity_compare");
    for kind in [EdgeOperatorKind::Sobel, EdgeOperatorKind::CentralDifference] {
        let engine = SimilarityEngine::new(SimilarityConfig::default().with_edge_operator(kind))
            .expect("engine");
        let probe = engine.prepare(&sample(640, 480, 0));
        let reference = engine.prepare(&sample(1024, 768, 3));
        group.bench_function(engine.edge_operator_name(), |b| {
            b.iter(|| engine.compare(black_box(&probe), black_box(&reference)))
        });
    }
    group.finish();
}

fn bench_prepare(c: &mut Criterion) {
    let engine = SimilarityEngine::new(SimilarityConfig::default()).expect("engine");
    let img = sample(1600, 1200, 0);
    c.bench_function("similarity_prepare_1600x1200", |b| {
        b.iter(|| engine.prepare(black_box(&img)))
    });
}

criterion_group!(benches, bench_compare, bench_prepare);
criterion_main!(benches);
