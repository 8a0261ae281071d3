use crate::error::{ServerError, ServerResult};
use crate::middleware::Caller;
use crate::state::ServerState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use catalog::{ContentDraft, ContentId, ImageId};
use delivery::{ArLaunch, Delivery};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// QR helper for a delivery link.
#[derive(Debug, Serialize, Deserialize)]
pub struct QrResponse {
    pub qr_code_url: String,
    /// `data:image/png;base64,...`
    pub qr_code_image: String,
    pub instructions: String,
}

impl QrResponse {
    fn for_link(url: String, what: &str) -> ServerResult<Self> {
        Ok(Self {
            qr_code_image: crate::qr::png_data_url(&url)?,
            qr_code_url: url,
            instructions: format!("Scan this QR code to open {what}"),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub image_id: ImageId,
    pub content_id: ContentId,
    pub is_active: bool,
}

/// Attach content to one of the caller's images. 409 if it already has some.
pub async fn create_content(
    State(state): State<Arc<ServerState>>,
    Extension(Caller(business)): Extension<Caller>,
    Path(image_id): Path<ImageId>,
    Json(draft): Json<ContentDraft>,
) -> ServerResult<impl IntoResponse> {
    let content = state
        .catalog
        .create_content(&business.reference, image_id, draft)?;
    Ok((StatusCode::CREATED, Json(content)))
}

pub async fn update_content(
    State(state): State<Arc<ServerState>>,
    Extension(Caller(business)): Extension<Caller>,
    Path(image_id): Path<ImageId>,
    Json(draft): Json<ContentDraft>,
) -> ServerResult<impl IntoResponse> {
    Ok(Json(state.catalog.update_content(
        &business.reference,
        image_id,
        draft,
    )?))
}

pub async fn delete_content(
    State(state): State<Arc<ServerState>>,
    Extension(Caller(business)): Extension<Caller>,
    Path(image_id): Path<ImageId>,
) -> ServerResult<impl IntoResponse> {
    let removed = state
        .catalog
        .delete_content(&business.reference, image_id)?;
    Ok(Json(serde_json::json!({
        "deleted": true,
        "image_id": image_id,
        "content_id": removed.id,
    })))
}

pub async fn toggle_content(
    State(state): State<Arc<ServerState>>,
    Extension(Caller(business)): Extension<Caller>,
    Path(image_id): Path<ImageId>,
) -> ServerResult<impl IntoResponse> {
    let content = state
        .catalog
        .toggle_content(&business.reference, image_id)?;
    Ok(Json(ToggleResponse {
        image_id,
        content_id: content.id,
        is_active: content.is_active,
    }))
}

/// Public direct link behind `delivery_options.direct_link`.
pub async fn deliver(
    State(state): State<Arc<ServerState>>,
    Path(content_id): Path<ContentId>,
) -> ServerResult<Json<Delivery>> {
    let delivery = state
        .resolver
        .deliver(content_id, state.catalog.as_ref(), chrono::Utc::now())?;
    Ok(Json(delivery))
}

/// Public AR link behind `delivery_options.ar_link`.
pub async fn ar_launch(
    State(state): State<Arc<ServerState>>,
    Path(content_id): Path<ContentId>,
) -> ServerResult<Json<ArLaunch>> {
    Ok(Json(
        state
            .resolver
            .ar_launch(content_id, state.catalog.as_ref())?,
    ))
}

/// QR code for the direct link of existing content.
pub async fn content_qr(
    State(state): State<Arc<ServerState>>,
    Path(content_id): Path<ContentId>,
) -> ServerResult<Json<QrResponse>> {
    if state.catalog.get_content(content_id)?.is_none() {
        return Err(ServerError::NotFound(format!(
            "delivery content {content_id} not found"
        )));
    }
    let url = state.resolver.links().direct(content_id);
    Ok(Json(QrResponse::for_link(url, "the DEX content")?))
}

/// QR code for a business landing page, used by fallback envelopes.
pub async fn business_qr(
    State(state): State<Arc<ServerState>>,
    Path(reference): Path<String>,
) -> ServerResult<Json<QrResponse>> {
    let business = state
        .find_business(&reference)?
        .ok_or_else(|| ServerError::NotFound(format!("business '{reference}' not found")))?;
    let url = state.resolver.links().business_landing(&business.reference);
    Ok(Json(QrResponse::for_link(
        url,
        &format!("the {} page", business.name),
    )?))
}
