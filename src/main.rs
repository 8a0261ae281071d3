use std::io::Cursor;
use std::sync::Arc;

use anyhow::{Context, Result};
use dexmatch::{
    BusinessRef, Catalog, ContentDraft, ContentKind, DexConfig, ExtractionBatch, MatchPipeline,
    MemoryPixelSource,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

fn page(seed: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(240, 320, |x, y| {
        let v = ((x * (3 + seed) + y * (5 + 2 * seed)) % 256) as u8;
        Rgb([v, v.wrapping_add(40), 255 - v])
    }))
}

fn png(img: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .context("encoding demo page")?;
    Ok(buf.into_inner())
}

fn main() -> Result<()> {
    let catalog = Arc::new(Catalog::in_memory());
    let pixels = Arc::new(MemoryPixelSource::new());

    let business = BusinessRef::new("biz-demo", "Demo Bakery");
    let mut batch = ExtractionBatch::new("menu.pdf").with_tags(["menu", "demo"]);
    for n in 1..=3 {
        let locator = format!("demo/menu_page_{n}.png");
        pixels.insert(locator.clone(), png(&page(n))?);
        batch = batch.with_page(n, locator);
    }
    let images = catalog.register_extracted(&business, batch)?;

    catalog.create_content(
        &business.reference,
        images[1].id,
        ContentDraft::new("Seasonal specials", ContentKind::Video)
            .with_description("Thirty seconds of fresh bread")
            .with_url("https://cdn.example.com/specials.mp4"),
    )?;

    let pipeline = MatchPipeline::new(&DexConfig::default(), catalog, pixels)?;

    // A photo of page 2, slightly smaller than the original scan.
    let photo = page(2).resize_exact(200, 266, image::imageops::FilterType::Triangle);
    let response = pipeline.match_image(&png(&photo)?)?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
