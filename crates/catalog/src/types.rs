//! Records held by the catalog and the inputs that create or change them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CatalogError;

pub type ImageId = u64;
pub type ContentId = u64;

/// The business an image or content record belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessRef {
    /// Stable, unique reference used in URLs and ownership checks.
    pub reference: String,
    /// Display name.
    pub name: String,
}

impl BusinessRef {
    pub fn new(reference: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            name: name.into(),
        }
    }
}

/// One cataloged page raster that probes are matched against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceImage {
    pub id: ImageId,
    /// Opaque handle a [`crate::PixelSource`] resolves to encoded bytes.
    pub locator: String,
    pub business_reference: String,
    pub business_name: String,
    pub pdf_filename: String,
    /// 1-based page index inside `pdf_filename`.
    pub page_number: u32,
    pub tags: Vec<String>,
    pub image_type: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

/// Output of the external extraction step for one uploaded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionBatch {
    pub pdf_filename: String,
    pub pages: Vec<ExtractedPage>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_image_type")]
    pub image_type: String,
    #[serde(default = "default_public")]
    pub is_public: bool,
}

fn default_image_type() -> String {
    "general".to_string()
}

fn default_public() -> bool {
    true
}

impl ExtractionBatch {
    pub fn new(pdf_filename: impl Into<String>) -> Self {
        Self {
            pdf_filename: pdf_filename.into(),
            pages: Vec::new(),
            tags: Vec::new(),
            image_type: default_image_type(),
            is_public: true,
        }
    }

    pub fn with_page(mut self, page_number: u32, locator: impl Into<String>) -> Self {
        self.pages.push(ExtractedPage {
            page_number,
            locator: locator.into(),
        });
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_image_type(mut self, image_type: impl Into<String>) -> Self {
        self.image_type = image_type.into();
        self
    }

    pub fn with_public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.pdf_filename.trim().is_empty() {
            return Err(CatalogError::invalid("pdf filename must not be empty"));
        }
        if self.pages.is_empty() {
            return Err(CatalogError::invalid("extraction produced no pages"));
        }
        for page in &self.pages {
            if page.page_number == 0 {
                return Err(CatalogError::invalid("page numbers are 1-based"));
            }
            if page.locator.trim().is_empty() {
                return Err(CatalogError::invalid(format!(
                    "page {} has an empty locator",
                    page.page_number
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedPage {
    pub page_number: u32,
    pub locator: String,
}

/// Mutable fields of a [`ReferenceImage`]. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePatch {
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

impl ImagePatch {
    pub fn is_empty(&self) -> bool {
        self.tags.is_none() && self.is_public.is_none()
    }
}

/// What a piece of delivery content is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Webpage,
    Video,
    Ar,
    #[serde(rename = "3d_model")]
    Model3d,
    Pdf,
    Link,
}

impl ContentKind {
    pub const ALL: [ContentKind; 6] = [
        ContentKind::Webpage,
        ContentKind::Video,
        ContentKind::Ar,
        ContentKind::Model3d,
        ContentKind::Pdf,
        ContentKind::Link,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Webpage => "webpage",
            ContentKind::Video => "video",
            ContentKind::Ar => "ar",
            ContentKind::Model3d => "3d_model",
            ContentKind::Pdf => "pdf",
            ContentKind::Link => "link",
        }
    }

    /// Kinds that get an AR launch directive.
    pub fn is_immersive(self) -> bool {
        matches!(self, ContentKind::Ar | ContentKind::Model3d)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CatalogError::invalid(format!("unknown content type '{s}'")))
    }
}

/// Lifecycle state of a content record that still exists.
///
/// Deletion removes the record, so "deleted" is represented by absence and
/// is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentState {
    Active,
    Inactive,
}

impl ContentState {
    pub fn toggled(self) -> Self {
        match self {
            ContentState::Active => ContentState::Inactive,
            ContentState::Inactive => ContentState::Active,
        }
    }
}

/// Content a business attaches to one of its images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryContent {
    pub id: ContentId,
    pub image_id: ImageId,
    pub business_reference: String,
    pub title: String,
    pub description: String,
    pub kind: ContentKind,
    pub url: Option<String>,
    /// Opaque payload, passed through to callers untouched.
    pub payload: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryContent {
    pub fn state(&self) -> ContentState {
        if self.is_active {
            ContentState::Active
        } else {
            ContentState::Inactive
        }
    }
}

/// Fields a business supplies when creating or replacing content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "content_type")]
    pub kind: ContentKind,
    #[serde(default, rename = "content_url")]
    pub url: Option<String>,
    #[serde(default, rename = "content_data")]
    pub payload: Option<String>,
}

impl ContentDraft {
    pub fn new(title: impl Into<String>, kind: ContentKind) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            kind,
            url: None,
            payload: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.title.trim().is_empty() {
            return Err(CatalogError::invalid("content title must not be empty"));
        }
        let has_url = self.url.as_deref().is_some_and(|u| !u.trim().is_empty());
        let has_payload = self.payload.as_deref().is_some_and(|p| !p.is_empty());
        if !has_url && !has_payload {
            return Err(CatalogError::invalid(
                "content needs a url or a payload",
            ));
        }
        Ok(())
    }
}

/// Per-business counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessStats {
    pub total_images: usize,
    pub total_dex_content: usize,
    pub active_dex_content: usize,
}

/// What [`crate::Catalog::delete_image`] removed.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletedImage {
    pub image: ReferenceImage,
    pub content: Option<DeliveryContent>,
}

/// Split a comma-separated tag string, trimming blanks away.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_kind_names_round_trip() {
        for kind in ContentKind::ALL {
            assert_eq!(kind.as_str().parse::<ContentKind>().unwrap(), kind);
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        assert!("hologram".parse::<ContentKind>().is_err());
    }

    #[test]
    fn only_ar_and_models_are_immersive() {
        let immersive: Vec<_> = ContentKind::ALL
            .into_iter()
            .filter(|k| k.is_immersive())
            .collect();
        assert_eq!(immersive, vec![ContentKind::Ar, ContentKind::Model3d]);
    }

    #[test]
    fn double_toggle_is_a_round_trip() {
        for state in [ContentState::Active, ContentState::Inactive] {
            assert_ne!(state.toggled(), state);
            assert_eq!(state.toggled().toggled(), state);
        }
    }

    #[test]
    fn draft_needs_title_and_target() {
        assert!(ContentDraft::new("", ContentKind::Video)
            .with_url("https://v")
            .validate()
            .is_err());
        assert!(ContentDraft::new("Promo", ContentKind::Video).validate().is_err());
        assert!(ContentDraft::new("Promo", ContentKind::Video)
            .with_url("https://v")
            .validate()
            .is_ok());
        assert!(ContentDraft::new("Model", ContentKind::Model3d)
            .with_payload("{\"model\":\"x.glb\"}")
            .validate()
            .is_ok());
    }

    #[test]
    fn draft_uses_wire_field_names() {
        let draft: ContentDraft = serde_json::from_str(
            r#"{"title":"Menu","content_type":"3d_model","content_url":"https://m"}"#,
        )
        .unwrap();
        assert_eq!(draft.kind, ContentKind::Model3d);
        assert_eq!(draft.url.as_deref(), Some("https://m"));
        assert_eq!(draft.description, "");
    }

    #[test]
    fn extraction_batch_validation() {
        assert!(ExtractionBatch::new("menu.pdf").validate().is_err());
        assert!(ExtractionBatch::new("menu.pdf")
            .with_page(0, "a.png")
            .validate()
            .is_err());
        assert!(ExtractionBatch::new("menu.pdf")
            .with_page(1, " ")
            .validate()
            .is_err());
        let batch = ExtractionBatch::new("menu.pdf").with_page(1, "a.png");
        assert!(batch.validate().is_ok());
        assert!(batch.is_public);
    }

    #[test]
    fn tags_are_split_and_trimmed() {
        assert_eq!(parse_tags(" logo, menu ,,brand "), vec!["logo", "menu", "brand"]);
        assert!(parse_tags("").is_empty());
    }
}
