//! Canonical luma rasters and the per-image artifacts the scorers reuse.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::config::SimilarityConfig;
use crate::edge::EdgeOperator;

/// Square single-channel raster at the canonical resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LumaField {
    side: usize,
    pixels: Vec<u8>,
}

impl LumaField {
    /// Resample `img` to the canonical square with the configured filter,
    /// then drop it to 8-bit luminance.
    pub fn from_image(img: &DynamicImage, cfg: &SimilarityConfig) -> Self {
        let side = cfg.canonical_size;
        let luma = img
            .resize_exact(side, side, cfg.filter.as_filter_type())
            .to_luma8();
        Self {
            side: side as usize,
            pixels: luma.into_raw(),
        }
    }

    /// Build a field from raw row-major pixels. Returns `None` unless
    /// `pixels.len() == side * side`.
    pub fn from_raw(side: usize, pixels: Vec<u8>) -> Option<Self> {
        (side > 0 && pixels.len() == side * side).then_some(Self { side, pixels })
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Pixel at `(x, y)` with coordinates clamped into the field.
    pub(crate) fn at_clamped(&self, x: isize, y: isize) -> f64 {
        let max = self.side as isize - 1;
        let cx = x.clamp(0, max) as usize;
        let cy = y.clamp(0, max) as usize;
        f64::from(self.pixels[cy * self.side + cx])
    }

    pub(crate) fn mean(&self) -> f64 {
        let sum: u64 = self.pixels.iter().map(|&p| u64::from(p)).sum();
        sum as f64 / self.pixels.len() as f64
    }

    /// Population variance around `mean`.
    pub(crate) fn variance(&self, mean: f64) -> f64 {
        let acc: f64 = self
            .pixels
            .iter()
            .map(|&p| {
                let d = f64::from(p) - mean;
                d * d
            })
            .sum();
        acc / self.pixels.len() as f64
    }

    /// Equal-width histogram over `0..=255`, normalized to sum to one.
    pub(crate) fn histogram(&self, bins: usize) -> Vec<f64> {
        let mut counts = vec![0u32; bins];
        for &p in &self.pixels {
            counts[usize::from(p) * bins / 256] += 1;
        }
        let total = self.pixels.len() as f64;
        counts.into_iter().map(|c| f64::from(c) / total).collect()
    }
}

/// A raster normalized once and ready to be compared many times.
///
/// The scanner prepares the probe a single time per scan and compares it
/// against every candidate, so everything that depends on one image only is
/// computed here.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub(crate) luma: LumaField,
    pub(crate) mean: f64,
    pub(crate) variance: f64,
    pub(crate) histogram: Vec<f64>,
    pub(crate) edges: Vec<f64>,
}

impl PreparedImage {
    pub(crate) fn build(luma: LumaField, bins: usize, edges: &dyn EdgeOperator) -> Self {
        let mean = luma.mean();
        let variance = luma.variance(mean);
        let histogram = luma.histogram(bins);
        let edges = edges.magnitude(&luma);
        Self {
            luma,
            mean,
            variance,
            histogram,
            edges,
        }
    }

    pub fn luma(&self) -> &LumaField {
        &self.luma
    }

    pub fn histogram(&self) -> &[f64] {
        &self.histogram
    }

    /// Whether two prepared images came from compatible normalizations.
    pub(crate) fn compatible_with(&self, other: &PreparedImage) -> bool {
        self.luma.side == other.luma.side && self.histogram.len() == other.histogram.len()
    }
}
