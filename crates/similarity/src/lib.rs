//! # DEX Similarity Engine
//!
//! Scores how visually alike two rasters are, as a single value in `[0, 1]`
//! where `1` means identical under this measure.
//!
//! ## Contract
//!
//! - Inputs may have any native resolution and color layout. Both are
//!   resampled to a fixed canonical square with a fixed filter and reduced to
//!   8-bit luminance before anything is measured.
//! - The score is a pure function of `(probe, reference, config)`: no I/O,
//!   no clocks, no global state. It is symmetric in its two inputs.
//! - Scoring never fails. A reference that cannot be decoded scores `0.0` and
//!   the failure is logged, so an enclosing catalog scan keeps going.
//!
//! ## Metrics
//!
//! | metric         | measure                                                |
//! |----------------|--------------------------------------------------------|
//! | `pixel_error`  | `1 - MSE / 255^2`                                      |
//! | `structural`   | global cross-correlation ratio, flat fields special-cased |
//! | `distribution` | intersection of normalized intensity histograms        |
//! | `edge_pattern` | `1 - mean gradient-magnitude difference / full scale`  |
//!
//! The composite is the weighted sum under [`MetricWeights`]
//! (default `0.3 / 0.3 / 0.2 / 0.2`), clamped to `[0, 1]`.
//!
//! ## Example Usage
//!
//! ```
//! use image::{DynamicImage, GrayImage, Luma};
//! use similarity::{SimilarityConfig, SimilarityEngine};
//!
//! let engine = SimilarityEngine::new(SimilarityConfig::default()).unwrap();
//! let img = DynamicImage::ImageLuma8(GrayImage::from_fn(120, 80, |x, y| Luma([((x + y) % 256) as u8])));
//!
//! let score = engine.score(&img, &img);
//! assert!((score - 1.0).abs() < 1e-5);
//! ```

pub mod config;
pub mod edge;
pub mod metric;
pub mod raster;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

pub use crate::config::{
    EdgeOperatorKind, MetricWeights, ResampleFilter, SimilarityConfig, SimilarityError,
};
pub use crate::edge::{CentralDifference, EdgeOperator, Sobel, EDGE_FULL_SCALE};
pub use crate::metric::Metric;
pub use crate::raster::{LumaField, PreparedImage};

use crate::metric::SCORERS;

/// Per-metric scores plus the weighted composite for one pair of rasters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SimilarityBreakdown {
    pub pixel_error: f32,
    pub structural: f32,
    pub distribution: f32,
    pub edge_pattern: f32,
    pub composite: f32,
}

impl SimilarityBreakdown {
    /// Breakdown reported when a pair could not be compared at all.
    pub const ZERO: SimilarityBreakdown = SimilarityBreakdown {
        pixel_error: 0.0,
        structural: 0.0,
        distribution: 0.0,
        edge_pattern: 0.0,
        composite: 0.0,
    };

    pub fn sub_score(&self, metric: Metric) -> f32 {
        match metric {
            Metric::PixelError => self.pixel_error,
            Metric::Structural => self.structural,
            Metric::Distribution => self.distribution,
            Metric::EdgePattern => self.edge_pattern,
        }
    }

    fn set(&mut self, metric: Metric, value: f32) {
        match metric {
            Metric::PixelError => self.pixel_error = value,
            Metric::Structural => self.structural = value,
            Metric::Distribution => self.distribution = value,
            Metric::EdgePattern => self.edge_pattern = value,
        }
    }
}

/// Configured similarity engine.
///
/// Holds the validated config and the edge operator picked for it. Cheap to
/// share behind an `Arc`; all methods take `&self`.
pub struct SimilarityEngine {
    cfg: SimilarityConfig,
    edges: Box<dyn EdgeOperator>,
}

impl std::fmt::Debug for SimilarityEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityEngine")
            .field("cfg", &self.cfg)
            .field("edges", &self.edges.name())
            .finish()
    }
}

impl SimilarityEngine {
    /// Validate `cfg` and select its edge operator.
    pub fn new(cfg: SimilarityConfig) -> Result<Self, SimilarityError> {
        cfg.validate()?;
        let edges = edge::operator_for(cfg.edge_operator);
        Ok(Self { cfg, edges })
    }

    /// Build an engine around a caller-supplied edge operator, ignoring
    /// `cfg.edge_operator`.
    pub fn with_edge_operator(
        cfg: SimilarityConfig,
        edges: Box<dyn EdgeOperator>,
    ) -> Result<Self, SimilarityError> {
        cfg.validate()?;
        Ok(Self { cfg, edges })
    }

    pub fn config(&self) -> &SimilarityConfig {
        &self.cfg
    }

    pub fn edge_operator_name(&self) -> &'static str {
        self.edges.name()
    }

    /// Decode any raster format enabled on the `image` crate.
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage, SimilarityError> {
        Ok(image::load_from_memory(bytes)?)
    }

    /// Normalize an image once so it can be compared many times.
    pub fn prepare(&self, img: &DynamicImage) -> PreparedImage {
        let luma = LumaField::from_image(img, &self.cfg);
        PreparedImage::build(luma, self.cfg.histogram_bins, self.edges.as_ref())
    }

    /// Decode and prepare encoded bytes.
    pub fn prepare_bytes(&self, bytes: &[u8]) -> Result<PreparedImage, SimilarityError> {
        let img = Self::decode(bytes)?;
        Ok(self.prepare(&img))
    }

    /// Compare two prepared images and report every sub-score.
    pub fn compare(&self, a: &PreparedImage, b: &PreparedImage) -> SimilarityBreakdown {
        if !a.compatible_with(b) {
            tracing::warn!(
                left_side = a.luma.side(),
                right_side = b.luma.side(),
                "prepared images come from different normalizations; scoring 0"
            );
            return SimilarityBreakdown::ZERO;
        }

        let mut breakdown = SimilarityBreakdown::ZERO;
        let mut composite = 0.0f64;
        for (metric, scorer) in SCORERS {
            let value = scorer(a, b);
            breakdown.set(metric, value as f32);
            composite += f64::from(metric.weight(&self.cfg.weights)) * value;
        }
        breakdown.composite = if composite.is_finite() {
            composite.clamp(0.0, 1.0) as f32
        } else {
            0.0
        };
        breakdown
    }

    /// Composite score for two decoded images.
    pub fn score(&self, a: &DynamicImage, b: &DynamicImage) -> f32 {
        self.compare(&self.prepare(a), &self.prepare(b)).composite
    }

    /// Score a prepared probe against encoded reference bytes.
    ///
    /// Undecodable references score `0.0`; the decode error is logged and not
    /// returned.
    pub fn score_encoded(&self, probe: &PreparedImage, reference: &[u8]) -> f32 {
        match self.prepare_bytes(reference) {
            Ok(prepared) => self.compare(probe, &prepared).composite,
            Err(err) => {
                tracing::warn!(error = %err, bytes = reference.len(), "reference decode failed; scoring 0");
                0.0
            }
        }
    }
}
