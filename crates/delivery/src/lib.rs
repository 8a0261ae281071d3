//! # DEX Delivery
//!
//! Resolves a matched reference image to the content its business attached
//! and shapes it for clients.
//!
//! - [`ContentResolver::resolve`] returns the envelope for active content, or
//!   synthesizes a `webpage` fallback pointing at the business landing page.
//!   A match never carries an empty content field.
//! - AR launch links are only attached to `ar` and `3d_model` content;
//!   `video` gets autoplay; every envelope carries a QR helper link.
//! - [`ContentResolver::deliver`] builds the payload behind the direct link,
//!   with one typed [`DeliveryAction`] per content kind.
//! - [`ContentResolver::ar_launch`] builds the payload behind the AR link.

mod config;
mod envelope;
mod resolver;

use catalog::{CatalogError, ContentId};
use thiserror::Error;

pub use crate::config::{DeliveryConfig, LinkBuilder};
pub use crate::envelope::{ArLaunch, Delivery, DeliveryAction, DeliveryOptions, DexEnvelope};
pub use crate::resolver::ContentResolver;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("delivery content {id} not found")]
    ContentNotFound { id: ContentId },
    #[error("delivery content {id} is not active")]
    Inactive { id: ContentId },
    #[error("delivery content {id} has no AR experience")]
    NotImmersive { id: ContentId },
    #[error("invalid delivery config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
