use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use catalog::{CatalogError, PixelError};
use delivery::DeliveryError;
use dexmatch::PipelineError;
use matcher::MatchError;
use serde::{Deserialize, Serialize};

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Request timeout")]
    Timeout,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Payload too large: max {0}MB allowed")]
    PayloadTooLarge(usize),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ServerError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ServerError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ServerError::BadRequest(_) | ServerError::InvalidImage(_) => StatusCode::BAD_REQUEST,
            ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Internal(_) | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::Authentication(_) => "AUTH_FAILED",
            ServerError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ServerError::Timeout => "REQUEST_TIMEOUT",
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::InvalidImage(_) => "INVALID_IMAGE",
            ServerError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ServerError::Forbidden(_) => "FORBIDDEN",
            ServerError::Conflict(_) => "CONFLICT",
            ServerError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Config(_) => "CONFIG_ERROR",
            ServerError::NotFound(_) => "NOT_FOUND",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                details: None,
            },
        });

        (status, body).into_response()
    }
}

impl From<CatalogError> for ServerError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::ImageNotFound { .. } | CatalogError::ContentNotFound { .. } => {
                ServerError::NotFound(err.to_string())
            }
            CatalogError::Forbidden { .. } => ServerError::Forbidden(err.to_string()),
            CatalogError::Conflict { .. } => ServerError::Conflict(err.to_string()),
            CatalogError::InvalidRecord(reason) => ServerError::BadRequest(reason),
            CatalogError::Backend(_) => ServerError::StorageUnavailable(err.to_string()),
            CatalogError::Encode(_) | CatalogError::Decode(_) => {
                ServerError::Internal(err.to_string())
            }
        }
    }
}

impl From<MatchError> for ServerError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::Catalog(inner) => inner.into(),
            MatchError::InvalidConfig(reason) => ServerError::Config(reason),
        }
    }
}

impl From<DeliveryError> for ServerError {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::ContentNotFound { .. }
            | DeliveryError::Inactive { .. }
            | DeliveryError::NotImmersive { .. } => ServerError::NotFound(err.to_string()),
            DeliveryError::InvalidConfig(reason) => ServerError::Config(reason),
            DeliveryError::Catalog(inner) => inner.into(),
        }
    }
}

impl From<PipelineError> for ServerError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidProbe(inner) => ServerError::InvalidImage(inner.to_string()),
            PipelineError::Config(reason) => ServerError::Config(reason),
            PipelineError::Match(inner) => inner.into(),
            PipelineError::Delivery(inner) => inner.into(),
            PipelineError::Catalog(inner) => inner.into(),
        }
    }
}

impl From<PixelError> for ServerError {
    fn from(err: PixelError) -> Self {
        match err {
            PixelError::NotFound { .. } => ServerError::NotFound(err.to_string()),
            PixelError::InvalidLocator { .. } => ServerError::BadRequest(err.to_string()),
            PixelError::Io { .. } => ServerError::StorageUnavailable(err.to_string()),
        }
    }
}

impl From<qrcode::types::QrError> for ServerError {
    fn from(err: qrcode::types::QrError) -> Self {
        ServerError::Internal(format!("QR encoding failed: {err}"))
    }
}

impl From<base64::DecodeError> for ServerError {
    fn from(err: base64::DecodeError) -> Self {
        ServerError::BadRequest(format!("invalid base64 image: {err}"))
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("worker task failed: {err}"))
    }
}

impl From<std::net::AddrParseError> for ServerError {
    fn from(err: std::net::AddrParseError) -> Self {
        ServerError::Config(format!("Invalid address: {err}"))
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(format!("IO error: {err}"))
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::BadRequest(format!("JSON parse error: {err}"))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_errors_map_to_http_statuses() {
        let cases = [
            (CatalogError::ImageNotFound { image_id: 1 }, StatusCode::NOT_FOUND),
            (CatalogError::ContentNotFound { image_id: 1 }, StatusCode::NOT_FOUND),
            (
                CatalogError::Forbidden {
                    image_id: 1,
                    business: "biz".into(),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                CatalogError::Conflict {
                    image_id: 1,
                    existing: 2,
                },
                StatusCode::CONFLICT,
            ),
            (CatalogError::invalid("no title"), StatusCode::BAD_REQUEST),
            (CatalogError::backend("disk gone"), StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status_code(), status);
        }
    }

    #[test]
    fn storage_failure_inside_a_scan_is_not_a_client_error() {
        let err = PipelineError::Match(MatchError::Catalog(CatalogError::backend("down")));
        assert_eq!(
            ServerError::from(err).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn inactive_content_is_not_found() {
        let err = ServerError::from(DeliveryError::Inactive { id: 4 });
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), "NOT_FOUND");
    }
}
