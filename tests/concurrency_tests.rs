//! Matching and catalog writes from many threads at once.

use std::sync::Arc;
use std::thread;

use dexmatch::{BusinessRef, Catalog, CatalogError, ContentDraft, ContentKind};
use tempfile::tempdir;

mod common;
use common::{brochure_page, checkerboard, pipeline, png, register_pages};

#[test]
fn concurrent_matches_share_one_pipeline() {
    let dir = tempdir().unwrap();
    let catalog = Arc::new(Catalog::in_memory());
    let images = register_pages(
        &catalog,
        dir.path(),
        &BusinessRef::new("biz-c", "Concurrent"),
        "shared.pdf",
        &[brochure_page(160, 200, 1), checkerboard(160, 10)],
    );
    let pipeline = Arc::new(pipeline(catalog, dir.path()));
    let probe = Arc::new(png(&brochure_page(160, 200, 1)));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pipeline = Arc::clone(&pipeline);
            let probe = Arc::clone(&probe);
            thread::spawn(move || pipeline.match_image(&probe).expect("match should succeed"))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let first = &results[0];
    assert_eq!(first.reference.as_ref().unwrap().id, images[0].id);
    for (i, result) in results.iter().enumerate().skip(1) {
        assert_eq!(result, first, "thread {i} disagreed");
    }
}

#[test]
fn racing_content_creates_leave_exactly_one_record() {
    let dir = tempdir().unwrap();
    let catalog = Arc::new(Catalog::in_memory());
    let business = BusinessRef::new("biz-race", "Race");
    let images = register_pages(
        &catalog,
        dir.path(),
        &business,
        "race.pdf",
        &[brochure_page(64, 64, 0)],
    );
    let image_id = images[0].id;

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let catalog = Arc::clone(&catalog);
            let business = business.reference.clone();
            thread::spawn(move || {
                catalog.create_content(
                    &business,
                    image_id,
                    ContentDraft::new(format!("attempt {i}"), ContentKind::Link)
                        .with_url(format!("https://example.com/{i}")),
                )
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let created = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(CatalogError::Conflict { .. })))
        .count();
    assert_eq!(created, 1);
    assert_eq!(conflicts, 9);
}

#[test]
fn registrations_from_many_threads_get_distinct_ids() {
    let dir = tempdir().unwrap();
    let catalog = Arc::new(Catalog::in_memory());
    let root = Arc::new(dir.path().to_path_buf());

    let handles: Vec<_> = (0..6)
        .map(|t| {
            let catalog = Arc::clone(&catalog);
            let root = Arc::clone(&root);
            thread::spawn(move || {
                let business = BusinessRef::new(format!("biz-{t}"), format!("Business {t}"));
                register_pages(
                    &catalog,
                    &root,
                    &business,
                    "flyer.pdf",
                    &[brochure_page(32, 32, t), checkerboard(32, 4)],
                )
            })
        })
        .collect();

    let mut ids: Vec<u64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .map(|image| image.id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 12);
    assert_eq!(catalog.list_images().unwrap().len(), 12);
}
