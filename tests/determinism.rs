//! Repeated and reconfigured scans must agree with each other.

use std::sync::Arc;

use dexmatch::{BusinessRef, Catalog, DexConfig};
use tempfile::tempdir;

mod common;
use common::{brochure_page, checkerboard, pipeline_with, png, register_pages};

fn seeded_catalog(root: &std::path::Path) -> Arc<Catalog> {
    let catalog = Arc::new(Catalog::in_memory());
    let pages: Vec<_> = (0..6)
        .map(|v| {
            if v % 2 == 0 {
                brochure_page(180, 240, v)
            } else {
                checkerboard(180, 6 + v * 3)
            }
        })
        .collect();
    register_pages(
        &catalog,
        root,
        &BusinessRef::new("biz-det", "Determinism"),
        "mixed.pdf",
        &pages,
    );
    catalog
}

#[test]
fn same_probe_same_response() {
    let dir = tempdir().unwrap();
    let pipeline = pipeline_with(&DexConfig::default(), seeded_catalog(dir.path()), dir.path());
    let probe = png(&brochure_page(180, 240, 2));

    let first = pipeline.match_image(&probe).unwrap();
    for _ in 0..5 {
        assert_eq!(pipeline.match_image(&probe).unwrap(), first);
    }
}

#[test]
fn seeded_noise_is_reproducible_across_pipelines() {
    let dir = tempdir().unwrap();
    let catalog = seeded_catalog(dir.path());
    let mut cfg = DexConfig::default();
    cfg.scan.noise = dexmatch::NoiseConfig::seeded(7, 0.02);

    let probe = png(&brochure_page(150, 200, 4));
    let a = pipeline_with(&cfg, Arc::clone(&catalog), dir.path())
        .match_image(&probe)
        .unwrap();
    let b = pipeline_with(&cfg, catalog, dir.path())
        .match_image(&probe)
        .unwrap();
    assert_eq!(a.similarity_score, b.similarity_score);
    assert_eq!(a.reference, b.reference);
}

#[test]
fn parallel_and_sequential_scans_pick_the_same_page() {
    let dir = tempdir().unwrap();
    let catalog = seeded_catalog(dir.path());
    let probe = png(&brochure_page(180, 240, 4));

    let mut sequential = DexConfig::default();
    sequential.scan.parallel = false;
    let mut parallel = sequential.clone();
    parallel.scan.parallel = true;

    let seq = pipeline_with(&sequential, Arc::clone(&catalog), dir.path())
        .match_image(&probe)
        .unwrap();
    let par = pipeline_with(&parallel, catalog, dir.path())
        .match_image(&probe)
        .unwrap();

    assert!(seq.match_found);
    assert_eq!(seq.reference, par.reference);
    assert_eq!(seq.similarity_score, par.similarity_score);
}

#[test]
fn noise_never_pushes_scores_outside_unit_range() {
    let dir = tempdir().unwrap();
    let mut cfg = DexConfig::default();
    cfg.scan.noise = dexmatch::NoiseConfig::seeded(99, 0.5);
    cfg.scan.threshold = 0.01;
    let pipeline = pipeline_with(&cfg, seeded_catalog(dir.path()), dir.path());

    for v in 0..4 {
        let response = pipeline.match_image(&png(&brochure_page(90, 90, v))).unwrap();
        if let Some(score) = response.similarity_score {
            assert!((0.0..=1.0).contains(&score), "score = {score}");
        }
    }
}
