//! DEX Server - HTTP REST API for photo-to-content matching
//!
//! A consumer photographs a printed page and posts the photo; the server
//! finds the cataloged page it shows and returns the content the owning
//! business attached to it. Businesses manage their pages and content
//! through API-key protected endpoints.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! ## Public Endpoints (No Authentication)
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics
//! - `POST /api/v1/match` - Match a photo (raw image body)
//! - `GET /dex/deliver/{id}` - Direct delivery link for active content
//! - `GET /dex/ar/{id}` - AR launch payload for active `ar` / `3d_model` content
//! - `GET /dex/qr/{id}` - QR code for a direct delivery link
//! - `GET /dex/qr/business/{reference}` - QR code for a business landing page
//! - `GET /business/{reference}` - Business landing page used by fallbacks
//!
//! ## Protected Endpoints (API Key Required)
//!
//! - `POST /api/v1/compare` - Compare two base64 images
//! - `GET /api/v1/business/profile` - Caller's business and counters
//! - `GET /api/v1/business/stats` - Image and content counters
//! - `GET /api/v1/business/images` - List images with their content
//! - `POST /api/v1/business/images` - Upload extracted PDF pages
//! - `PATCH /api/v1/business/images/{id}` - Update tags or visibility
//! - `DELETE /api/v1/business/images/{id}` - Delete image and its content
//! - `POST|PUT|DELETE /api/v1/business/images/{id}/dex` - Manage content
//! - `PATCH /api/v1/business/images/{id}/dex/toggle` - Flip active flag

pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod qr;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{ApiKeyEntry, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
