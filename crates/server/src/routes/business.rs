use crate::error::{ServerError, ServerResult};
use crate::middleware::Caller;
use crate::state::ServerState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use catalog::{
    parse_tags, BusinessStats, DeliveryContent, ExtractionBatch, ImageId, ImagePatch,
    PixelSource, ReferenceImage,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub business_reference: String,
    pub business_name: String,
    pub stats: BusinessStats,
}

/// One reference image with whatever content is attached to it.
#[derive(Debug, Serialize, Deserialize)]
pub struct ImageListing {
    #[serde(flatten)]
    pub image: ReferenceImage,
    pub dex_content: Option<DeliveryContent>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageListResponse {
    pub total: usize,
    pub images: Vec<ImageListing>,
}

/// Pages of one PDF, already rasterized by the client.
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub pdf_filename: String,
    pub pages: Vec<UploadPage>,
    /// Comma separated.
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub image_type: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UploadPage {
    /// 1-based; defaults to the page's position in the request.
    #[serde(default)]
    pub page_number: Option<u32>,
    /// Base64 encoded raster.
    pub image: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub pdf_filename: String,
    pub total_images: usize,
    pub images: Vec<ReferenceImage>,
}

pub async fn profile(
    State(state): State<Arc<ServerState>>,
    Extension(Caller(business)): Extension<Caller>,
) -> ServerResult<impl IntoResponse> {
    let stats = state.catalog.business_stats(&business.reference)?;
    Ok(Json(ProfileResponse {
        business_reference: business.reference,
        business_name: business.name,
        stats,
    }))
}

pub async fn stats(
    State(state): State<Arc<ServerState>>,
    Extension(Caller(business)): Extension<Caller>,
) -> ServerResult<impl IntoResponse> {
    Ok(Json(state.catalog.business_stats(&business.reference)?))
}

pub async fn list_images(
    State(state): State<Arc<ServerState>>,
    Extension(Caller(business)): Extension<Caller>,
) -> ServerResult<impl IntoResponse> {
    let images = state.catalog.images_for_business(&business.reference)?;
    let mut listings = Vec::with_capacity(images.len());
    for image in images {
        let dex_content = state.catalog.content_for_image(image.id)?;
        listings.push(ImageListing { image, dex_content });
    }
    Ok(Json(ImageListResponse {
        total: listings.len(),
        images: listings,
    }))
}

/// Store uploaded page rasters and register them as reference images.
///
/// Every page must be a raster the engine can decode; nothing is stored
/// unless all pages pass.
pub async fn upload_images(
    State(state): State<Arc<ServerState>>,
    Extension(Caller(business)): Extension<Caller>,
    Json(request): Json<UploadRequest>,
) -> ServerResult<impl IntoResponse> {
    if request.pages.is_empty() {
        return Err(ServerError::BadRequest("no pages supplied".to_string()));
    }

    let stem = pdf_stem(&request.pdf_filename);
    let mut decoded = Vec::with_capacity(request.pages.len());
    for (index, page) in request.pages.iter().enumerate() {
        let bytes = STANDARD.decode(page.image.trim())?;
        let format = image::guess_format(&bytes).map_err(|e| {
            ServerError::InvalidImage(format!("page {}: {e}", index + 1))
        })?;
        similarity::SimilarityEngine::decode(&bytes).map_err(|e| {
            ServerError::InvalidImage(format!("page {}: {e}", index + 1))
        })?;
        let extension = format.extensions_str().first().copied().unwrap_or("img");
        let number = page.page_number.unwrap_or(index as u32 + 1);
        let locator = format!(
            "{}/{stem}_page_{number}_{}.{extension}",
            business.reference,
            uuid::Uuid::new_v4().simple()
        );
        decoded.push((number, locator, bytes));
    }

    let mut batch = ExtractionBatch::new(request.pdf_filename.clone());
    if let Some(tags) = &request.tags {
        batch = batch.with_tags(parse_tags(tags));
    }
    if let Some(image_type) = request.image_type {
        batch = batch.with_image_type(image_type);
    }
    if let Some(is_public) = request.is_public {
        batch = batch.with_public(is_public);
    }
    for (number, locator, _) in &decoded {
        batch = batch.with_page(*number, locator.clone());
    }
    batch.validate()?;

    let mut stored = Vec::with_capacity(decoded.len());
    for (_, locator, bytes) in &decoded {
        if let Err(err) = state.pixels.store(locator, bytes) {
            discard_rasters(state.pixels.as_ref(), &stored);
            return Err(err.into());
        }
        stored.push(locator.as_str());
    }

    let images = match state.catalog.register_extracted(&business, batch) {
        Ok(images) => images,
        Err(err) => {
            discard_rasters(state.pixels.as_ref(), &stored);
            return Err(err.into());
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            pdf_filename: request.pdf_filename,
            total_images: images.len(),
            images,
        }),
    ))
}

/// Patch body; tags arrive comma separated like on upload.
#[derive(Debug, Deserialize)]
pub struct UpdateImageRequest {
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

pub async fn update_image(
    State(state): State<Arc<ServerState>>,
    Extension(Caller(business)): Extension<Caller>,
    Path(image_id): Path<ImageId>,
    Json(request): Json<UpdateImageRequest>,
) -> ServerResult<impl IntoResponse> {
    let patch = ImagePatch {
        tags: request.tags.as_deref().map(parse_tags),
        is_public: request.is_public,
    };
    if patch.is_empty() {
        return Err(ServerError::BadRequest("nothing to update".to_string()));
    }
    Ok(Json(state.catalog.update_image(&business.reference, image_id, patch)?))
}

/// Delete an image, its content and its stored raster.
pub async fn delete_image(
    State(state): State<Arc<ServerState>>,
    Extension(Caller(business)): Extension<Caller>,
    Path(image_id): Path<ImageId>,
) -> ServerResult<impl IntoResponse> {
    let deleted = state.catalog.delete_image(&business.reference, image_id)?;
    if let Err(err) = state.pixels.remove(&deleted.image.locator) {
        tracing::warn!(image_id, locator = %deleted.image.locator, error = %err, "raster not removed");
    }
    Ok(Json(serde_json::json!({
        "deleted": true,
        "image_id": image_id,
        "content_deleted": deleted.content.is_some(),
    })))
}

/// Best-effort removal of rasters written for an upload that did not land.
fn discard_rasters(pixels: &dyn PixelSource, locators: &[&str]) {
    for locator in locators {
        if let Err(err) = pixels.remove(locator) {
            tracing::warn!(locator = %locator, error = %err, "orphaned raster left behind");
        }
    }
}

fn pdf_stem(filename: &str) -> String {
    let stem = std::path::Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("upload");
    stem.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::pdf_stem;

    #[test]
    fn pdf_stem_is_locator_safe() {
        assert_eq!(pdf_stem("menu.pdf"), "menu");
        assert_eq!(pdf_stem("../../etc/passwd"), "passwd");
        assert_eq!(pdf_stem("Spring Menu (v2).pdf"), "Spring_Menu__v2_");
    }
}
