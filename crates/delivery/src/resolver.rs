use catalog::{CatalogStore, ContentId, ContentKind, DeliveryContent, ReferenceImage};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::{DeliveryConfig, LinkBuilder};
use crate::envelope::{ArLaunch, Delivery, DeliveryAction, DeliveryOptions, DexEnvelope};
use crate::DeliveryError;

/// Turns a matched reference image into the content a client receives.
#[derive(Debug, Clone)]
pub struct ContentResolver {
    links: LinkBuilder,
}

impl Default for ContentResolver {
    fn default() -> Self {
        Self {
            links: LinkBuilder::new(DeliveryConfig::default()),
        }
    }
}

impl ContentResolver {
    pub fn new(cfg: DeliveryConfig) -> Result<Self, DeliveryError> {
        cfg.validate()?;
        Ok(Self {
            links: LinkBuilder::new(cfg),
        })
    }

    pub fn links(&self) -> &LinkBuilder {
        &self.links
    }

    /// Envelope for the active content of `image`, or a fallback when there
    /// is none. A store failure is returned, never papered over.
    pub fn resolve(
        &self,
        image: &ReferenceImage,
        store: &dyn CatalogStore,
    ) -> Result<DexEnvelope, DeliveryError> {
        match store.active_content(image.id)? {
            Some(content) => Ok(self.envelope(&content)),
            None => {
                debug!(image_id = image.id, business = %image.business_reference, "no active content; using fallback");
                Ok(self.fallback(image))
            }
        }
    }

    pub fn envelope(&self, content: &DeliveryContent) -> DexEnvelope {
        let immersive = content.kind.is_immersive();
        let video = content.kind == ContentKind::Video;
        DexEnvelope {
            id: Some(content.id),
            title: content.title.clone(),
            description: content.description.clone(),
            content_type: content.kind,
            content_url: content.url.clone(),
            content_data: content.payload.clone(),
            delivery_options: DeliveryOptions {
                ar_enabled: immersive,
                video_available: video,
                autoplay: video,
                webpage_available: content.url.is_some(),
                direct_link: self.links.direct(content.id),
                ar_link: immersive.then(|| self.links.ar(content.id)),
                qr_code: self.links.qr(content.id),
            },
        }
    }

    /// Landing-page envelope synthesized from the image's business.
    pub fn fallback(&self, image: &ReferenceImage) -> DexEnvelope {
        let landing = self.links.business_landing(&image.business_reference);
        DexEnvelope {
            id: None,
            title: format!("Learn more about {}", image.business_name),
            description: format!(
                "Discover more about this {} from {}",
                image.image_type, image.business_name
            ),
            content_type: ContentKind::Webpage,
            content_url: Some(landing.clone()),
            content_data: None,
            delivery_options: DeliveryOptions {
                ar_enabled: false,
                video_available: false,
                autoplay: false,
                webpage_available: true,
                direct_link: landing,
                ar_link: None,
                qr_code: self.links.business_qr(&image.business_reference),
            },
        }
    }

    /// Payload for the direct delivery link of content `id`. Inactive content
    /// is not delivered.
    pub fn deliver(
        &self,
        id: ContentId,
        store: &dyn CatalogStore,
        now: DateTime<Utc>,
    ) -> Result<Delivery, DeliveryError> {
        let content = Self::active(id, store)?;
        let actions = self.actions(&content);
        Ok(Delivery {
            id: content.id,
            title: content.title,
            description: content.description,
            content_type: content.kind,
            content_url: content.url,
            content_data: content.payload,
            delivery_timestamp: now,
            actions,
        })
    }

    /// Payload for the AR link of content `id`. Only active `ar` and
    /// `3d_model` content has one.
    pub fn ar_launch(&self, id: ContentId, store: &dyn CatalogStore) -> Result<ArLaunch, DeliveryError> {
        let content = Self::active(id, store)?;
        if !content.kind.is_immersive() {
            return Err(DeliveryError::NotImmersive { id });
        }
        Ok(ArLaunch {
            id: content.id,
            direct_link: self.links.direct(content.id),
            title: content.title,
            description: content.description,
            content_type: content.kind,
            model_url: content.url,
            marker_image_id: content.image_id,
        })
    }

    fn active(id: ContentId, store: &dyn CatalogStore) -> Result<DeliveryContent, DeliveryError> {
        let content = store
            .content(id)?
            .ok_or(DeliveryError::ContentNotFound { id })?;
        if !content.is_active {
            return Err(DeliveryError::Inactive { id });
        }
        Ok(content)
    }

    pub fn actions(&self, content: &DeliveryContent) -> Vec<DeliveryAction> {
        let url = content.url.clone();
        let action = match content.kind {
            ContentKind::Video => DeliveryAction::PlayVideo {
                url,
                autoplay: true,
            },
            ContentKind::Ar | ContentKind::Model3d => DeliveryAction::LaunchAr {
                ar_url: self.links.ar(content.id),
                model_url: url,
            },
            ContentKind::Webpage | ContentKind::Link => DeliveryAction::OpenWebpage {
                url,
                target: "_blank".into(),
            },
            ContentKind::Pdf => DeliveryAction::DownloadPdf {
                url,
                filename: format!("{}.pdf", content.title),
            },
        };
        vec![action]
    }
}
