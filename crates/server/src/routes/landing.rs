use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Public page of a business, behind fallback envelopes.
#[derive(Debug, Serialize, Deserialize)]
pub struct BusinessLanding {
    pub business_reference: String,
    pub business_name: String,
    pub public_pages: usize,
    pub active_dex_content: usize,
    pub qr_code: String,
}

pub async fn business_page(
    State(state): State<Arc<ServerState>>,
    Path(reference): Path<String>,
) -> ServerResult<Json<BusinessLanding>> {
    let business = state
        .find_business(&reference)?
        .ok_or_else(|| ServerError::NotFound(format!("business '{reference}' not found")))?;
    let public_pages = state
        .catalog
        .images_for_business(&business.reference)?
        .iter()
        .filter(|image| image.is_public)
        .count();
    let stats = state.catalog.business_stats(&business.reference)?;
    let qr_code = state.resolver.links().business_qr(&business.reference);

    Ok(Json(BusinessLanding {
        business_reference: business.reference,
        business_name: business.name,
        public_pages,
        active_dex_content: stats.active_dex_content,
        qr_code,
    }))
}
