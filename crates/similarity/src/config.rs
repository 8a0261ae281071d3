//! Configuration and error types for the similarity engine.
//!
//! Everything here is plain data. The engine is a pure function of
//! `(probe, reference, config)`, so two engines built from equal configs
//! produce bit-identical scores for the same pair of rasters.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance used when checking that metric weights sum to one.
pub const WEIGHT_SUM_TOLERANCE: f32 = 1e-3;

/// Resampling filter used when normalizing rasters to the canonical square.
///
/// Scores are only comparable between rasters normalized with the same
/// filter, so the filter is part of the config rather than a call argument.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFilter {
    Nearest,
    /// Bilinear.
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl ResampleFilter {
    pub(crate) fn as_filter_type(self) -> FilterType {
        match self {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Gaussian => FilterType::Gaussian,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Gradient operator used by the edge-pattern metric.
///
/// Picked once when the [`crate::SimilarityEngine`] is built; the engine never
/// probes for capabilities while scoring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EdgeOperatorKind {
    /// 3x3 Sobel kernels with replicated borders.
    #[default]
    Sobel,
    /// Central differences, one-sided at the border.
    CentralDifference,
}

/// Weight vector applied to the four sub-scores.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MetricWeights {
    pub pixel_error: f32,
    pub structural: f32,
    pub distribution: f32,
    pub edge_pattern: f32,
}

impl MetricWeights {
    pub fn new(pixel_error: f32, structural: f32, distribution: f32, edge_pattern: f32) -> Self {
        Self {
            pixel_error,
            structural,
            distribution,
            edge_pattern,
        }
    }

    pub fn sum(&self) -> f32 {
        self.pixel_error + self.structural + self.distribution + self.edge_pattern
    }

    fn as_array(&self) -> [f32; 4] {
        [
            self.pixel_error,
            self.structural,
            self.distribution,
            self.edge_pattern,
        ]
    }

    pub fn validate(&self) -> Result<(), SimilarityError> {
        if self
            .as_array()
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
        {
            return Err(SimilarityError::InvalidWeights {
                reason: "weights must be finite and non-negative".into(),
            });
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(SimilarityError::InvalidWeights {
                reason: format!("weights must sum to 1.0 (got {sum})"),
            });
        }
        Ok(())
    }
}

impl Default for MetricWeights {
    fn default() -> Self {
        Self::new(0.3, 0.3, 0.2, 0.2)
    }
}

/// Configuration for the similarity engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Configuration schema version.
    ///
    /// Anything that changes scores for an unchanged pair of rasters must
    /// bump this.
    pub version: u32,
    /// Side length of the canonical square both rasters are resampled to.
    pub canonical_size: u32,
    /// Resampling filter used for normalization.
    pub filter: ResampleFilter,
    /// Number of equal-width intensity bins for the distribution metric.
    pub histogram_bins: usize,
    /// Weights for the composite score.
    pub weights: MetricWeights,
    /// Gradient operator for the edge-pattern metric.
    pub edge_operator: EdgeOperatorKind,
}

impl SimilarityConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the canonical side length. Larger sizes keep more detail and cost
    /// quadratically more per comparison.
    pub fn with_canonical_size(mut self, size: u32) -> Self {
        self.canonical_size = size;
        self
    }

    pub fn with_filter(mut self, filter: ResampleFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_histogram_bins(mut self, bins: usize) -> Self {
        self.histogram_bins = bins;
        self
    }

    pub fn with_weights(mut self, weights: MetricWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_edge_operator(mut self, edge_operator: EdgeOperatorKind) -> Self {
        self.edge_operator = edge_operator;
        self
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), SimilarityError> {
        if self.version < 1 {
            return Err(SimilarityError::InvalidConfigVersion {
                version: self.version,
            });
        }
        // The edge operators need a 3x3 neighbourhood.
        if self.canonical_size < 3 {
            return Err(SimilarityError::InvalidCanonicalSize {
                size: self.canonical_size,
            });
        }
        if self.histogram_bins == 0 || self.histogram_bins > 256 {
            return Err(SimilarityError::InvalidHistogramBins {
                bins: self.histogram_bins,
            });
        }
        self.weights.validate()
    }
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            version: 1,
            canonical_size: 64,
            filter: ResampleFilter::default(),
            histogram_bins: 32,
            weights: MetricWeights::default(),
            edge_operator: EdgeOperatorKind::default(),
        }
    }
}

/// Errors returned by the similarity engine.
///
/// Only construction and explicit decoding return errors. Scoring a probe
/// against an undecodable reference is not an error: it yields `0.0`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimilarityError {
    #[error("invalid config version {version}; expected >= 1")]
    InvalidConfigVersion { version: u32 },

    #[error("invalid config: canonical_size must be >= 3 (got {size})")]
    InvalidCanonicalSize { size: u32 },

    #[error("invalid config: histogram_bins must be in 1..=256 (got {bins})")]
    InvalidHistogramBins { bins: usize },

    #[error("invalid config: {reason}")]
    InvalidWeights { reason: String },

    #[error("image decode failed: {0}")]
    Decode(String),
}

impl From<image::ImageError> for SimilarityError {
    fn from(err: image::ImageError) -> Self {
        SimilarityError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let cfg = SimilarityConfig::default();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.canonical_size, 64);
        assert_eq!(cfg.histogram_bins, 32);
        assert_eq!(cfg.filter, ResampleFilter::Triangle);
        assert_eq!(cfg.edge_operator, EdgeOperatorKind::Sobel);
        assert_eq!(cfg.weights, MetricWeights::new(0.3, 0.3, 0.2, 0.2));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn weights_must_sum_to_one() {
        let cfg = SimilarityConfig::default().with_weights(MetricWeights::new(0.5, 0.5, 0.5, 0.0));
        match cfg.validate() {
            Err(SimilarityError::InvalidWeights { reason }) => assert!(reason.contains("sum")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn negative_weight_rejected() {
        let weights = MetricWeights::new(1.2, -0.2, 0.0, 0.0);
        assert!(matches!(
            weights.validate(),
            Err(SimilarityError::InvalidWeights { .. })
        ));
    }

    #[test]
    fn tiny_canonical_size_rejected() {
        let cfg = SimilarityConfig::default().with_canonical_size(2);
        assert_eq!(
            cfg.validate(),
            Err(SimilarityError::InvalidCanonicalSize { size: 2 })
        );
    }

    #[test]
    fn histogram_bins_bounds() {
        assert!(SimilarityConfig::default()
            .with_histogram_bins(0)
            .validate()
            .is_err());
        assert!(SimilarityConfig::default()
            .with_histogram_bins(257)
            .validate()
            .is_err());
        assert!(SimilarityConfig::default()
            .with_histogram_bins(256)
            .validate()
            .is_ok());
    }

    #[test]
    fn config_deserializes_with_partial_fields() {
        let cfg: SimilarityConfig =
            serde_json::from_str(r#"{"edge_operator":"central_difference","canonical_size":32}"#)
                .unwrap();
        assert_eq!(cfg.edge_operator, EdgeOperatorKind::CentralDifference);
        assert_eq!(cfg.canonical_size, 32);
        assert_eq!(cfg.histogram_bins, 32);
    }
}
