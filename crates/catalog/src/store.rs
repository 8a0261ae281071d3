use std::sync::{Mutex, MutexGuard};

use bincode::config::standard;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::types::{
    BusinessRef, BusinessStats, ContentDraft, ContentId, DeletedImage, DeliveryContent,
    ExtractionBatch, ImageId, ImagePatch, ReferenceImage,
};
use crate::{BackendConfig, CatalogBackend, CatalogError};

const IMAGE_PREFIX: &str = "image/";
const CONTENT_PREFIX: &str = "content/";
const CONTENT_ID_PREFIX: &str = "content_id/";
const NEXT_IMAGE_ID: &str = "meta/next_image_id";
const NEXT_CONTENT_ID: &str = "meta/next_content_id";

// Zero-padded so key order equals id order.
fn image_key(id: ImageId) -> String {
    format!("{IMAGE_PREFIX}{id:020}")
}

// Content is keyed by its image: one slot per image.
fn content_key(image_id: ImageId) -> String {
    format!("{CONTENT_PREFIX}{image_id:020}")
}

// Secondary index: content id -> owning image id.
fn content_id_key(id: ContentId) -> String {
    format!("{CONTENT_ID_PREFIX}{id:020}")
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CatalogError> {
    Ok(bincode::serde::encode_to_vec(value, standard())?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CatalogError> {
    let (value, _) = bincode::serde::decode_from_slice(bytes, standard())?;
    Ok(value)
}

/// Read side of the catalog used by the scanner and the resolver.
pub trait CatalogStore: Send + Sync {
    /// Snapshot of every reference image, in id order.
    fn reference_images(&self) -> Result<Vec<ReferenceImage>, CatalogError>;

    /// Content for `image_id` if it exists and is active.
    fn active_content(&self, image_id: ImageId) -> Result<Option<DeliveryContent>, CatalogError>;

    /// Content by its own id, active or not.
    fn content(&self, id: ContentId) -> Result<Option<DeliveryContent>, CatalogError>;
}

/// Reference images and their delivery content over a [`CatalogBackend`].
///
/// Reads go straight to the backend. Writes that check before they change
/// (content creation, cascading deletes, id allocation) are serialized by an
/// internal mutex so the one-content-per-image rule holds under concurrent
/// requests.
pub struct Catalog {
    backend: Box<dyn CatalogBackend>,
    writes: Mutex<()>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog").finish_non_exhaustive()
    }
}

impl Catalog {
    pub fn open(cfg: &BackendConfig) -> Result<Self, CatalogError> {
        Ok(Self::with_backend(cfg.build()?))
    }

    pub fn in_memory() -> Self {
        Self::with_backend(Box::new(crate::InMemoryBackend::new()))
    }

    pub fn with_backend(backend: Box<dyn CatalogBackend>) -> Self {
        Self {
            backend,
            writes: Mutex::new(()),
        }
    }

    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>, CatalogError> {
        self.writes
            .lock()
            .map_err(|_| CatalogError::backend("poisoned lock"))
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CatalogError> {
        self.backend
            .get(key)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    fn scan<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>, CatalogError> {
        let mut out = Vec::new();
        self.backend.scan_prefix(prefix, &mut |_, bytes| {
            out.push(decode(bytes)?);
            Ok(())
        })?;
        Ok(out)
    }

    /// Reserve `count` consecutive ids from the counter at `key`. Returns the
    /// first id and the encoded new counter value; ids are never reused.
    fn reserve_ids(&self, key: &str, count: u64) -> Result<(u64, Vec<u8>), CatalogError> {
        let next: u64 = self.load(key)?.unwrap_or(1);
        Ok((next, encode(&(next + count))?))
    }

    /// Record one reference image per extracted page, all in one batch.
    pub fn register_extracted(
        &self,
        business: &BusinessRef,
        batch: ExtractionBatch,
    ) -> Result<Vec<ReferenceImage>, CatalogError> {
        batch.validate()?;
        let _guard = self.lock_writes()?;
        let (first, counter) = self.reserve_ids(NEXT_IMAGE_ID, batch.pages.len() as u64)?;
        let now = Utc::now();

        let images: Vec<ReferenceImage> = batch
            .pages
            .iter()
            .zip(first..)
            .map(|(page, id)| ReferenceImage {
                id,
                locator: page.locator.clone(),
                business_reference: business.reference.clone(),
                business_name: business.name.clone(),
                pdf_filename: batch.pdf_filename.clone(),
                page_number: page.page_number,
                tags: batch.tags.clone(),
                image_type: batch.image_type.clone(),
                is_public: batch.is_public,
                created_at: now,
            })
            .collect();

        let mut puts = Vec::with_capacity(images.len() + 1);
        for image in &images {
            puts.push((image_key(image.id), encode(image)?));
        }
        puts.push((NEXT_IMAGE_ID.to_string(), counter));
        self.backend.batch(puts, Vec::new())?;

        info!(
            business = %business.reference,
            pdf = %batch.pdf_filename,
            pages = images.len(),
            first_id = first,
            "registered extracted pages"
        );
        Ok(images)
    }

    /// Every reference image, in id order.
    pub fn list_images(&self) -> Result<Vec<ReferenceImage>, CatalogError> {
        self.scan(IMAGE_PREFIX)
    }

    pub fn images_for_business(&self, business: &str) -> Result<Vec<ReferenceImage>, CatalogError> {
        let mut images = self.list_images()?;
        images.retain(|img| img.business_reference == business);
        Ok(images)
    }

    pub fn get_image(&self, id: ImageId) -> Result<Option<ReferenceImage>, CatalogError> {
        self.load(&image_key(id))
    }

    /// The image `id`, provided it belongs to `business`.
    pub fn owned_image(&self, business: &str, id: ImageId) -> Result<ReferenceImage, CatalogError> {
        let image = self
            .get_image(id)?
            .ok_or(CatalogError::ImageNotFound { image_id: id })?;
        if image.business_reference != business {
            return Err(CatalogError::Forbidden {
                image_id: id,
                business: business.to_string(),
            });
        }
        Ok(image)
    }

    /// Change tags and/or visibility. Nothing else about an image is mutable.
    pub fn update_image(
        &self,
        business: &str,
        id: ImageId,
        patch: ImagePatch,
    ) -> Result<ReferenceImage, CatalogError> {
        let _guard = self.lock_writes()?;
        let mut image = self.owned_image(business, id)?;
        if let Some(tags) = patch.tags {
            image.tags = tags;
        }
        if let Some(is_public) = patch.is_public {
            image.is_public = is_public;
        }
        self.backend.put(&image_key(id), &encode(&image)?)?;
        debug!(image_id = id, is_public = image.is_public, "image updated");
        Ok(image)
    }

    /// Delete an image together with its content, if any.
    pub fn delete_image(&self, business: &str, id: ImageId) -> Result<DeletedImage, CatalogError> {
        let _guard = self.lock_writes()?;
        let image = self.owned_image(business, id)?;
        let content: Option<DeliveryContent> = self.load(&content_key(id))?;
        let mut deletes = vec![image_key(id), content_key(id)];
        if let Some(content) = &content {
            deletes.push(content_id_key(content.id));
        }
        self.backend.batch(Vec::new(), deletes)?;
        info!(
            image_id = id,
            cascaded_content = content.as_ref().map(|c| c.id),
            "image deleted"
        );
        Ok(DeletedImage { image, content })
    }

    /// Attach content to an image. An image carries at most one content
    /// record; a second create is a [`CatalogError::Conflict`].
    pub fn create_content(
        &self,
        business: &str,
        image_id: ImageId,
        draft: ContentDraft,
    ) -> Result<DeliveryContent, CatalogError> {
        draft.validate()?;
        let _guard = self.lock_writes()?;
        self.owned_image(business, image_id)?;
        if let Some(existing) = self.load::<DeliveryContent>(&content_key(image_id))? {
            return Err(CatalogError::Conflict {
                image_id,
                existing: existing.id,
            });
        }

        let (id, counter) = self.reserve_ids(NEXT_CONTENT_ID, 1)?;
        let now = Utc::now();
        let content = DeliveryContent {
            id,
            image_id,
            business_reference: business.to_string(),
            title: draft.title,
            description: draft.description,
            kind: draft.kind,
            url: draft.url,
            payload: draft.payload,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.backend.batch(
            vec![
                (content_key(image_id), encode(&content)?),
                (content_id_key(id), encode(&image_id)?),
                (NEXT_CONTENT_ID.to_string(), counter),
            ],
            Vec::new(),
        )?;
        info!(image_id, content_id = id, kind = %content.kind, "content created");
        Ok(content)
    }

    /// Replace the editable fields of existing content in place.
    pub fn update_content(
        &self,
        business: &str,
        image_id: ImageId,
        draft: ContentDraft,
    ) -> Result<DeliveryContent, CatalogError> {
        draft.validate()?;
        let _guard = self.lock_writes()?;
        let mut content = self.owned_content(business, image_id)?;
        content.title = draft.title;
        content.description = draft.description;
        content.kind = draft.kind;
        content.url = draft.url;
        content.payload = draft.payload;
        content.updated_at = Utc::now();
        self.backend.put(&content_key(image_id), &encode(&content)?)?;
        debug!(image_id, content_id = content.id, "content updated");
        Ok(content)
    }

    /// Flip the active flag and return the updated record.
    pub fn toggle_content(
        &self,
        business: &str,
        image_id: ImageId,
    ) -> Result<DeliveryContent, CatalogError> {
        let _guard = self.lock_writes()?;
        let mut content = self.owned_content(business, image_id)?;
        content.is_active = !content.is_active;
        content.updated_at = Utc::now();
        self.backend.put(&content_key(image_id), &encode(&content)?)?;
        debug!(image_id, is_active = content.is_active, "content toggled");
        Ok(content)
    }

    pub fn delete_content(
        &self,
        business: &str,
        image_id: ImageId,
    ) -> Result<DeliveryContent, CatalogError> {
        let _guard = self.lock_writes()?;
        let content = self.owned_content(business, image_id)?;
        self.backend.batch(
            Vec::new(),
            vec![content_key(image_id), content_id_key(content.id)],
        )?;
        info!(image_id, content_id = content.id, "content deleted");
        Ok(content)
    }

    /// Content attached to `image_id`, active or not.
    pub fn content_for_image(
        &self,
        image_id: ImageId,
    ) -> Result<Option<DeliveryContent>, CatalogError> {
        self.load(&content_key(image_id))
    }

    /// Content by its own id, looked up through the id index.
    pub fn get_content(&self, id: ContentId) -> Result<Option<DeliveryContent>, CatalogError> {
        let Some(image_id) = self.load::<ImageId>(&content_id_key(id))? else {
            return Ok(None);
        };
        let content: Option<DeliveryContent> = self.load(&content_key(image_id))?;
        Ok(content.filter(|c| c.id == id))
    }

    pub fn business_stats(&self, business: &str) -> Result<BusinessStats, CatalogError> {
        let total_images = self.images_for_business(business)?.len();
        let contents: Vec<DeliveryContent> = self.scan(CONTENT_PREFIX)?;
        let owned = contents
            .iter()
            .filter(|c| c.business_reference == business);
        let (total, active) = owned.fold((0, 0), |(t, a), c| (t + 1, a + usize::from(c.is_active)));
        Ok(BusinessStats {
            total_images,
            total_dex_content: total,
            active_dex_content: active,
        })
    }

    pub fn flush(&self) -> Result<(), CatalogError> {
        self.backend.flush()
    }

    fn owned_content(&self, business: &str, image_id: ImageId) -> Result<DeliveryContent, CatalogError> {
        self.owned_image(business, image_id)?;
        self.load(&content_key(image_id))?
            .ok_or(CatalogError::ContentNotFound { image_id })
    }
}

impl CatalogStore for Catalog {
    fn reference_images(&self) -> Result<Vec<ReferenceImage>, CatalogError> {
        self.list_images()
    }

    fn active_content(&self, image_id: ImageId) -> Result<Option<DeliveryContent>, CatalogError> {
        Ok(self.content_for_image(image_id)?.filter(|c| c.is_active))
    }

    fn content(&self, id: ContentId) -> Result<Option<DeliveryContent>, CatalogError> {
        self.get_content(id)
    }
}
