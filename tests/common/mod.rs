//! Shared fixtures for the pipeline integration tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use dexmatch::{
    BusinessRef, Catalog, DexConfig, ExtractionBatch, FsPixelSource, MatchPipeline,
    ReferenceImage,
};
use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};

/// Smooth two-axis gradient with a few soft bands; survives resampling well.
pub fn brochure_page(width: u32, height: u32, variant: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        let fx = x as f32 / width as f32;
        let fy = y as f32 / height as f32;
        let band = ((fy * (3 + variant) as f32 * std::f32::consts::PI).sin() * 0.5 + 0.5) * 80.0;
        let v = (fx * 150.0 + band) as u8;
        Rgb([v, v / 2 + 60, 255 - v])
    }))
}

pub fn checkerboard(side: u32, cell: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(side, side, |x, y| {
        Luma([if (x / cell + y / cell) % 2 == 0 { 0 } else { 255 }])
    }))
}

pub fn solid(side: u32, value: u8) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(side, side, Luma([value])))
}

pub fn png(img: &DynamicImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Write `pages` under `root` as PNG files and register them as one PDF.
pub fn register_pages(
    catalog: &Catalog,
    root: &Path,
    business: &BusinessRef,
    pdf: &str,
    pages: &[DynamicImage],
) -> Vec<ReferenceImage> {
    let mut batch = ExtractionBatch::new(pdf).with_image_type("brochure");
    for (i, page) in pages.iter().enumerate() {
        let number = i as u32 + 1;
        let locator = format!("{}/{}_page_{number}.png", business.reference, pdf.trim_end_matches(".pdf"));
        let path = root.join(&locator);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, png(page)).unwrap();
        batch = batch.with_page(number, locator);
    }
    catalog.register_extracted(business, batch).unwrap()
}

pub fn pipeline(catalog: Arc<Catalog>, root: &Path) -> MatchPipeline {
    pipeline_with(&DexConfig::default(), catalog, root)
}

pub fn pipeline_with(cfg: &DexConfig, catalog: Arc<Catalog>, root: &Path) -> MatchPipeline {
    MatchPipeline::new(cfg, catalog, Arc::new(FsPixelSource::new(root))).unwrap()
}
