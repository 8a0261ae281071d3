use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use dexmatch::MatchResponse;
use serde::{Deserialize, Serialize};
use similarity::SimilarityBreakdown;
use std::sync::Arc;

/// Compare request: two base64-encoded images.
#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub image_a: String,
    pub image_b: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompareResponse {
    pub similarity_score: f32,
    pub breakdown: SimilarityBreakdown,
}

/// Match a photograph against the catalog.
///
/// The body is the raw encoded image. The scan is CPU-bound and runs on
/// the blocking pool. A miss is a 200 with `{"match_found": false}`.
pub async fn match_image(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> ServerResult<Json<MatchResponse>> {
    if body.is_empty() {
        return Err(ServerError::BadRequest("image body is empty".to_string()));
    }

    let pipeline = Arc::clone(&state.pipeline);
    let response = tokio::task::spawn_blocking(move || pipeline.match_image(&body)).await??;

    if let Some(reference) = &response.reference {
        tracing::info!(
            image_id = reference.id,
            business = %reference.business_reference,
            score = response.similarity_score.unwrap_or_default(),
            "photo matched"
        );
    }
    Ok(Json(response))
}

/// Score two images against each other and report every sub-metric.
pub async fn compare_images(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<CompareRequest>,
) -> ServerResult<impl IntoResponse> {
    let a = STANDARD.decode(request.image_a.trim())?;
    let b = STANDARD.decode(request.image_b.trim())?;

    let pipeline = Arc::clone(&state.pipeline);
    let breakdown = tokio::task::spawn_blocking(move || pipeline.compare(&a, &b)).await??;

    Ok(Json(CompareResponse {
        similarity_score: breakdown.composite,
        breakdown,
    }))
}
