//! API route handlers
//!
//! - `health`: liveness, readiness and Prometheus metrics
//! - `matching`: photo matching and pairwise comparison
//! - `business`: the caller's profile, stats and reference images
//! - `dex`: content attached to images, plus the public delivery, AR and QR
//!   links
//! - `landing`: public business page behind fallback envelopes

pub mod business;
pub mod dex;
pub mod health;
pub mod landing;
pub mod matching;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info
///
/// ```json
/// {
///   "name": "DEX Server",
///   "version": "0.1.0",
///   "api_version": "v1",
///   "endpoints": ["..."]
/// }
/// ```
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "DEX Server",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "endpoints": [
            "/api/v1/match",
            "/api/v1/compare",
            "/api/v1/business/profile",
            "/api/v1/business/stats",
            "/api/v1/business/images",
            "/dex/deliver/{id}",
            "/dex/ar/{id}",
            "/dex/qr/{id}",
            "/dex/qr/business/{reference}",
            "/business/{reference}",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound("no such route".to_string())
}
