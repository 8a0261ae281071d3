//! Wire shapes handed to clients.

use catalog::{ContentId, ContentKind, ImageId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Client directives attached to an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOptions {
    pub ar_enabled: bool,
    pub video_available: bool,
    pub autoplay: bool,
    pub webpage_available: bool,
    pub direct_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ar_link: Option<String>,
    pub qr_code: String,
}

/// Content returned alongside a match. Always present on a match: when the
/// business attached nothing, a fallback envelope points at its landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DexEnvelope {
    /// `None` for a synthesized fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ContentId>,
    pub title: String,
    pub description: String,
    pub content_type: ContentKind,
    pub content_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_data: Option<String>,
    pub delivery_options: DeliveryOptions,
}

impl DexEnvelope {
    pub fn is_fallback(&self) -> bool {
        self.id.is_none()
    }
}

/// What a client should do with delivered content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeliveryAction {
    PlayVideo {
        url: Option<String>,
        autoplay: bool,
    },
    LaunchAr {
        ar_url: String,
        model_url: Option<String>,
    },
    OpenWebpage {
        url: Option<String>,
        target: String,
    },
    DownloadPdf {
        url: Option<String>,
        filename: String,
    },
}

/// Payload of the direct delivery link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: ContentId,
    pub title: String,
    pub description: String,
    pub content_type: ContentKind,
    pub content_url: Option<String>,
    pub content_data: Option<String>,
    pub delivery_timestamp: DateTime<Utc>,
    pub actions: Vec<DeliveryAction>,
}

/// Payload of the AR link: the model to place and the printed page that
/// anchors it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArLaunch {
    pub id: ContentId,
    pub title: String,
    pub description: String,
    pub content_type: ContentKind,
    pub model_url: Option<String>,
    pub marker_image_id: ImageId,
    pub direct_link: String,
}
