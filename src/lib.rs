//! Workspace umbrella crate for DEX photo-to-content matching.
//!
//! A caller submits a photograph; [`MatchPipeline::match_image`] scores it
//! against every eligible cataloged page, picks the best one at or above
//! the threshold, classifies the confidence and resolves the content the
//! owning business attached to that page (or a landing-page fallback).
//!
//! ```text
//! probe bytes -> SimilarityEngine (prepare once)
//!             -> Scanner over the catalog snapshot
//!             -> Classifier tier + duplicate flag
//!             -> ContentResolver envelope
//!             -> MatchResponse
//! ```
//!
//! The stage crates are re-exported so most callers only depend on this one.

pub mod config;

pub use catalog::{
    BackendConfig, BusinessRef, BusinessStats, Catalog, CatalogBackend, CatalogConfig,
    CatalogError, CatalogStore, ContentDraft, ContentId, ContentKind, DeliveryContent,
    ExtractionBatch, FsPixelSource, ImageId, ImagePatch, MemoryPixelSource, PixelSource,
    ReferenceImage,
};
pub use config::{CatalogYamlConfig, ConfigLoadError, DexConfig};
pub use delivery::{ContentResolver, Delivery, DeliveryConfig, DeliveryError, DexEnvelope};
pub use matcher::{
    set_scan_metrics, CandidateScorer, Classifier, ClassifierConfig, EngineScorer, MatchError,
    MatchQuality, NoiseConfig, ScanConfig, ScanMetrics, ScanOutcome, Scanner, Visibility,
};
pub use similarity::{SimilarityBreakdown, SimilarityConfig, SimilarityEngine, SimilarityError};

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Errors that stop a match request. "No match" is not one of them.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("probe image could not be decoded: {0}")]
    InvalidProbe(#[source] SimilarityError),
    #[error("invalid pipeline configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// The matched reference as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReference {
    pub id: ImageId,
    pub business_name: String,
    pub business_reference: String,
    pub pdf_filename: String,
    pub page_number: u32,
    pub tags: Vec<String>,
    pub image_type: String,
}

impl From<&ReferenceImage> for MatchReference {
    fn from(image: &ReferenceImage) -> Self {
        Self {
            id: image.id,
            business_name: image.business_name.clone(),
            business_reference: image.business_reference.clone(),
            pdf_filename: image.pdf_filename.clone(),
            page_number: image.page_number,
            tags: image.tags.clone(),
            image_type: image.image_type.clone(),
        }
    }
}

/// Result of one match request. A miss serializes as exactly
/// `{"match_found": false}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResponse {
    pub match_found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_quality: Option<MatchQuality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub possible_duplicate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<MatchReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dex_content: Option<DexEnvelope>,
}

impl MatchResponse {
    pub fn no_match() -> Self {
        Self {
            match_found: false,
            similarity_score: None,
            match_quality: None,
            possible_duplicate: None,
            reference: None,
            dex_content: None,
        }
    }
}

/// Engine, scan policy, classifier and resolver wired to one catalog.
pub struct MatchPipeline {
    engine: Arc<SimilarityEngine>,
    scanner: Scanner,
    classifier: Classifier,
    resolver: ContentResolver,
    catalog: Arc<dyn CatalogStore>,
    scorer: Arc<dyn CandidateScorer>,
}

impl std::fmt::Debug for MatchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchPipeline")
            .field("engine", &self.engine)
            .field("scanner", &self.scanner)
            .finish_non_exhaustive()
    }
}

impl MatchPipeline {
    /// Build every stage from `cfg`, scoring candidates with the engine over
    /// rasters from `pixels`.
    pub fn new(
        cfg: &DexConfig,
        catalog: Arc<dyn CatalogStore>,
        pixels: Arc<dyn PixelSource>,
    ) -> Result<Self, PipelineError> {
        cfg.validate()
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        let engine = Arc::new(
            SimilarityEngine::new(cfg.similarity.clone())
                .map_err(|e| PipelineError::Config(e.to_string()))?,
        );
        let scorer: Arc<dyn CandidateScorer> =
            Arc::new(EngineScorer::new(Arc::clone(&engine), pixels));
        Ok(Self {
            scanner: Scanner::new(cfg.scan)?,
            classifier: Classifier::new(cfg.classifier)?,
            resolver: ContentResolver::new(cfg.delivery.clone())?,
            engine,
            catalog,
            scorer,
        })
    }

    /// Assemble a pipeline from prebuilt stages, e.g. with an injected noise
    /// source or a custom scorer.
    pub fn from_parts(
        engine: Arc<SimilarityEngine>,
        scanner: Scanner,
        classifier: Classifier,
        resolver: ContentResolver,
        catalog: Arc<dyn CatalogStore>,
        scorer: Arc<dyn CandidateScorer>,
    ) -> Self {
        Self {
            engine,
            scanner,
            classifier,
            resolver,
            catalog,
            scorer,
        }
    }

    pub fn engine(&self) -> &SimilarityEngine {
        &self.engine
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    pub fn resolver(&self) -> &ContentResolver {
        &self.resolver
    }

    /// Match raw image bytes against the catalog.
    ///
    /// Returns `Ok(MatchResponse::no_match())` for an empty catalog or when
    /// nothing reaches the threshold. Errors are reserved for an undecodable
    /// probe and for storage failures.
    pub fn match_image(&self, probe: &[u8]) -> Result<MatchResponse, PipelineError> {
        let start = Instant::now();
        let prepared = self
            .engine
            .prepare_bytes(probe)
            .map_err(PipelineError::InvalidProbe)?;

        let outcome = self
            .scanner
            .scan_catalog(&prepared, self.catalog.as_ref(), self.scorer.as_ref())?;
        let Some(best) = outcome.best else {
            info!(
                scanned = outcome.scanned,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "no match above threshold"
            );
            return Ok(MatchResponse::no_match());
        };

        let classification = self.classifier.classify(best.score);
        if classification.possible_duplicate {
            warn!(
                image_id = best.image.id,
                score = best.score,
                "probe is a possible duplicate of a cataloged page"
            );
        }
        let envelope = self.resolver.resolve(&best.image, self.catalog.as_ref())?;

        info!(
            image_id = best.image.id,
            score = best.score,
            quality = classification.quality.as_str(),
            fallback = envelope.is_fallback(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "match found"
        );
        Ok(MatchResponse {
            match_found: true,
            similarity_score: Some(best.score),
            match_quality: Some(classification.quality),
            possible_duplicate: Some(classification.possible_duplicate),
            reference: Some(MatchReference::from(&best.image)),
            dex_content: Some(envelope),
        })
    }

    /// Per-metric breakdown for two encoded images.
    pub fn compare(&self, a: &[u8], b: &[u8]) -> Result<SimilarityBreakdown, PipelineError> {
        let a = self
            .engine
            .prepare_bytes(a)
            .map_err(PipelineError::InvalidProbe)?;
        let b = self
            .engine
            .prepare_bytes(b)
            .map_err(PipelineError::InvalidProbe)?;
        Ok(self.engine.compare(&a, &b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_match_serializes_minimally() {
        let json = serde_json::to_string(&MatchResponse::no_match()).unwrap();
        assert_eq!(json, r#"{"match_found":false}"#);
    }

    #[test]
    fn invalid_config_is_reported() {
        let mut cfg = DexConfig::default();
        cfg.scan.threshold = 0.0;
        let err = MatchPipeline::new(
            &cfg,
            Arc::new(Catalog::in_memory()),
            Arc::new(MemoryPixelSource::new()),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn garbage_probe_is_rejected() {
        let pipeline = MatchPipeline::new(
            &DexConfig::default(),
            Arc::new(Catalog::in_memory()),
            Arc::new(MemoryPixelSource::new()),
        )
        .unwrap();
        assert!(matches!(
            pipeline.match_image(b"\x00\x01garbage"),
            Err(PipelineError::InvalidProbe(_))
        ));
    }
}
