//! # DEX Catalog
//!
//! Reference images extracted from business documents, the delivery content
//! attached to them, and the storage they live in.
//!
//! - [`Catalog`] owns the record rules: one content record per image,
//!   ownership checks on every business-scoped operation, cascading deletes
//!   and ids that are never reused.
//! - [`CatalogStore`] is the read-only view the matcher and resolver need.
//! - [`CatalogBackend`] abstracts the key-value store underneath
//!   ([`InMemoryBackend`], and `RedbBackend` behind the default
//!   `backend-redb` feature). Records are encoded with `bincode`.
//! - [`PixelSource`] turns an image locator into encoded raster bytes.
//!
//! ## Example Usage
//!
//! ```
//! use catalog::{BusinessRef, Catalog, CatalogStore, ContentDraft, ContentKind, ExtractionBatch};
//!
//! let catalog = Catalog::in_memory();
//! let acme = BusinessRef::new("acme", "Acme Coffee");
//! let images = catalog
//!     .register_extracted(&acme, ExtractionBatch::new("menu.pdf").with_page(1, "acme/p1.png"))
//!     .unwrap();
//!
//! let draft = ContentDraft::new("Latte art", ContentKind::Video).with_url("https://cdn/latte.mp4");
//! catalog.create_content("acme", images[0].id, draft).unwrap();
//! assert!(catalog.active_content(images[0].id).unwrap().is_some());
//! ```

mod backend;
mod pixels;
mod store;
mod types;

use bincode::error::{DecodeError, EncodeError};
use std::path::PathBuf;
use thiserror::Error;

pub use crate::backend::{BackendConfig, CatalogBackend, InMemoryBackend};
#[cfg(feature = "backend-redb")]
pub use crate::backend::RedbBackend;
pub use crate::pixels::{FsPixelSource, MemoryPixelSource, PixelError, PixelSource};
pub use crate::store::{Catalog, CatalogStore};
pub use crate::types::{
    parse_tags, BusinessRef, BusinessStats, ContentDraft, ContentId, ContentKind, ContentState,
    DeletedImage, DeliveryContent, ExtractedPage, ExtractionBatch, ImageId, ImagePatch,
    ReferenceImage,
};

/// Where the catalog keeps its records and rasters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub backend: BackendConfig,
    /// Root directory for [`FsPixelSource`].
    pub image_root: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::InMemory,
            image_root: PathBuf::from("extracted_images"),
        }
    }
}

impl CatalogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_image_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.image_root = root.into();
        self
    }

    pub fn open(&self) -> Result<Catalog, CatalogError> {
        Catalog::open(&self.backend)
    }

    pub fn pixel_source(&self) -> FsPixelSource {
        FsPixelSource::new(self.image_root.clone())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("image {image_id} not found")]
    ImageNotFound { image_id: ImageId },
    #[error("no delivery content for image {image_id}")]
    ContentNotFound { image_id: ImageId },
    #[error("image {image_id} does not belong to business '{business}'")]
    Forbidden { image_id: ImageId, business: String },
    #[error("image {image_id} already has delivery content {existing}")]
    Conflict { image_id: ImageId, existing: ContentId },
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("record encode error: {0}")]
    Encode(String),
    #[error("record decode error: {0}")]
    Decode(String),
}

impl From<EncodeError> for CatalogError {
    fn from(e: EncodeError) -> Self {
        CatalogError::Encode(e.to_string())
    }
}

impl From<DecodeError> for CatalogError {
    fn from(e: DecodeError) -> Self {
        CatalogError::Decode(e.to_string())
    }
}

impl CatalogError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRecord(reason.into())
    }

    /// Whether the failure is the storage layer rather than the request.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            CatalogError::Backend(_) | CatalogError::Encode(_) | CatalogError::Decode(_)
        )
    }
}
