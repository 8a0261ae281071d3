use std::sync::Arc;

use dexmatch::{
    BusinessRef, Catalog, ContentDraft, ContentKind, ImagePatch, MatchQuality, MatchResponse,
};
use tempfile::tempdir;

mod common;
use common::{brochure_page, checkerboard, pipeline, png, register_pages, solid};

#[test]
fn duplicate_page_matches_with_attached_video() {
    let dir = tempdir().unwrap();
    let catalog = Arc::new(Catalog::in_memory());
    let bakery = BusinessRef::new("biz-bakery", "Corner Bakery");
    let images = register_pages(
        &catalog,
        dir.path(),
        &bakery,
        "menu.pdf",
        &[brochure_page(300, 400, 1), checkerboard(300, 25)],
    );
    catalog
        .create_content(
            &bakery.reference,
            images[0].id,
            ContentDraft::new("Bread tour", ContentKind::Video)
                .with_url("https://cdn.example.com/tour.mp4"),
        )
        .unwrap();

    let pipeline = pipeline(Arc::clone(&catalog), dir.path());
    let response = pipeline
        .match_image(&png(&brochure_page(300, 400, 1)))
        .unwrap();

    assert!(response.match_found);
    let score = response.similarity_score.unwrap();
    assert!(score > 0.95, "score = {score}");
    assert_eq!(response.match_quality, Some(MatchQuality::High));
    assert_eq!(response.possible_duplicate, Some(true));

    let reference = response.reference.unwrap();
    assert_eq!(reference.id, images[0].id);
    assert_eq!(reference.business_name, "Corner Bakery");
    assert_eq!(reference.pdf_filename, "menu.pdf");
    assert_eq!(reference.page_number, 1);
    assert_eq!(reference.image_type, "brochure");

    let envelope = response.dex_content.unwrap();
    assert_eq!(envelope.content_type, ContentKind::Video);
    assert!(envelope.delivery_options.video_available);
    assert!(envelope.delivery_options.autoplay);
    assert!(!envelope.delivery_options.ar_enabled);
    assert_eq!(
        envelope.delivery_options.direct_link,
        format!("/dex/deliver/{}", envelope.id.unwrap())
    );
}

#[test]
fn resized_photo_still_matches_the_right_page() {
    let dir = tempdir().unwrap();
    let catalog = Arc::new(Catalog::in_memory());
    let shop = BusinessRef::new("biz-shop", "Shop");
    let images = register_pages(
        &catalog,
        dir.path(),
        &shop,
        "catalog.pdf",
        &[checkerboard(240, 12), brochure_page(600, 800, 2)],
    );

    let photo = brochure_page(600, 800, 2).resize_exact(
        330,
        450,
        image::imageops::FilterType::Triangle,
    );
    let response = pipeline(catalog, dir.path())
        .match_image(&png(&photo))
        .unwrap();

    assert!(response.match_found);
    assert!(response.similarity_score.unwrap() > 0.8);
    assert_eq!(response.reference.unwrap().id, images[1].id);
}

#[test]
fn empty_catalog_reports_no_match() {
    let dir = tempdir().unwrap();
    let catalog = Arc::new(Catalog::in_memory());
    let response = pipeline(catalog, dir.path())
        .match_image(&png(&brochure_page(100, 100, 0)))
        .unwrap();

    assert_eq!(response, MatchResponse::no_match());
    assert_eq!(
        serde_json::to_string(&response).unwrap(),
        r#"{"match_found":false}"#
    );
}

#[test]
fn nothing_above_threshold_reports_no_match() {
    let dir = tempdir().unwrap();
    let catalog = Arc::new(Catalog::in_memory());
    register_pages(
        &catalog,
        dir.path(),
        &BusinessRef::new("biz-1", "One"),
        "white.pdf",
        &[solid(64, 255)],
    );

    let response = pipeline(catalog, dir.path())
        .match_image(&png(&solid(64, 0)))
        .unwrap();
    assert!(!response.match_found);
}

#[test]
fn page_without_content_gets_landing_fallback() {
    let dir = tempdir().unwrap();
    let catalog = Arc::new(Catalog::in_memory());
    let gallery = BusinessRef::new("biz-gallery", "City Gallery");
    register_pages(
        &catalog,
        dir.path(),
        &gallery,
        "poster.pdf",
        &[brochure_page(200, 280, 4)],
    );

    let response = pipeline(catalog, dir.path())
        .match_image(&png(&brochure_page(200, 280, 4)))
        .unwrap();

    let envelope = response.dex_content.unwrap();
    assert!(envelope.is_fallback());
    assert_eq!(envelope.content_type, ContentKind::Webpage);
    assert_eq!(envelope.title, "Learn more about City Gallery");
    assert_eq!(envelope.content_url.as_deref(), Some("/business/biz-gallery"));
    assert!(envelope.delivery_options.webpage_available);
    assert_eq!(envelope.delivery_options.direct_link, "/business/biz-gallery");
}

#[test]
fn inactive_content_falls_back_until_reactivated() {
    let dir = tempdir().unwrap();
    let catalog = Arc::new(Catalog::in_memory());
    let studio = BusinessRef::new("biz-studio", "Studio");
    let images = register_pages(
        &catalog,
        dir.path(),
        &studio,
        "lookbook.pdf",
        &[brochure_page(200, 200, 3)],
    );
    catalog
        .create_content(
            &studio.reference,
            images[0].id,
            ContentDraft::new("Chair in AR", ContentKind::Model3d)
                .with_url("https://cdn.example.com/chair.glb"),
        )
        .unwrap();
    catalog.toggle_content(&studio.reference, images[0].id).unwrap();

    let pipeline = pipeline(Arc::clone(&catalog), dir.path());
    let probe = png(&brochure_page(200, 200, 3));

    let inactive = pipeline.match_image(&probe).unwrap();
    assert!(inactive.dex_content.unwrap().is_fallback());

    catalog.toggle_content(&studio.reference, images[0].id).unwrap();
    let active = pipeline.match_image(&probe).unwrap().dex_content.unwrap();
    assert_eq!(active.content_type, ContentKind::Model3d);
    assert!(active.delivery_options.ar_enabled);
    assert!(active.delivery_options.ar_link.is_some());
}

#[test]
fn private_pages_are_not_matched_by_default() {
    let dir = tempdir().unwrap();
    let catalog = Arc::new(Catalog::in_memory());
    let owner = BusinessRef::new("biz-private", "Private");
    let images = register_pages(
        &catalog,
        dir.path(),
        &owner,
        "draft.pdf",
        &[brochure_page(160, 160, 5)],
    );
    catalog
        .update_image(
            &owner.reference,
            images[0].id,
            ImagePatch {
                tags: None,
                is_public: Some(false),
            },
        )
        .unwrap();

    let response = pipeline(catalog, dir.path())
        .match_image(&png(&brochure_page(160, 160, 5)))
        .unwrap();
    assert!(!response.match_found);
}

#[test]
fn compare_reports_every_metric() {
    let dir = tempdir().unwrap();
    let pipeline = pipeline(Arc::new(Catalog::in_memory()), dir.path());
    let a = png(&brochure_page(128, 128, 1));
    let b = png(&checkerboard(128, 8));

    let same = pipeline.compare(&a, &a).unwrap();
    assert!((same.composite - 1.0).abs() < 1e-5);

    let different = pipeline.compare(&a, &b).unwrap();
    assert!(different.composite < same.composite);
    for sub in [
        different.pixel_error,
        different.structural,
        different.distribution,
        different.edge_pattern,
    ] {
        assert!((0.0..=1.0).contains(&sub));
    }
}
