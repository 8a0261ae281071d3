//! QR codes for delivery links, rendered as PNG data URLs.

use crate::error::{ServerError, ServerResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;
use std::io::Cursor;

/// Edge length of one QR module in the rendered PNG.
const MODULE_PIXELS: u32 = 10;

/// Encode `url` as a QR code and return it as `data:image/png;base64,...`.
pub fn png_data_url(url: &str) -> ServerResult<String> {
    let code = QrCode::new(url.as_bytes())?;
    let rendered = code
        .render::<Luma<u8>>()
        .module_dimensions(MODULE_PIXELS, MODULE_PIXELS)
        .quiet_zone(true)
        .build();

    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(rendered)
        .write_to(&mut png, ImageFormat::Png)
        .map_err(|e| ServerError::Internal(format!("QR rendering failed: {e}")))?;
    Ok(format!(
        "data:image/png;base64,{}",
        STANDARD.encode(png.into_inner())
    ))
}
