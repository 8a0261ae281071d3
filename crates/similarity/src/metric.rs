//! The four sub-metrics and the table that names them.
//!
//! Each scorer is symmetric in its two arguments and returns a value in
//! `[0, 1]`. The composite is built by [`crate::SimilarityEngine::compare`]
//! from [`SCORERS`] and the configured weight vector, so changing weights
//! never touches the scoring code below.

use serde::{Deserialize, Serialize};

use crate::config::MetricWeights;
use crate::edge::EDGE_FULL_SCALE;
use crate::raster::PreparedImage;

/// Largest possible squared difference between two 8-bit intensities.
const MAX_SQUARED_ERROR: f64 = 255.0 * 255.0;

/// Stabilizer added to numerator and denominator of the structural ratio.
const STRUCTURAL_STABILIZER: f64 = 0.01;

/// Identifier for one sub-metric of the composite score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    PixelError,
    Structural,
    Distribution,
    EdgePattern,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::PixelError,
        Metric::Structural,
        Metric::Distribution,
        Metric::EdgePattern,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::PixelError => "pixel_error",
            Metric::Structural => "structural",
            Metric::Distribution => "distribution",
            Metric::EdgePattern => "edge_pattern",
        }
    }

    pub fn weight(self, weights: &MetricWeights) -> f32 {
        match self {
            Metric::PixelError => weights.pixel_error,
            Metric::Structural => weights.structural,
            Metric::Distribution => weights.distribution,
            Metric::EdgePattern => weights.edge_pattern,
        }
    }
}

pub(crate) type ScoreFn = fn(&PreparedImage, &PreparedImage) -> f64;

pub(crate) const SCORERS: [(Metric, ScoreFn); 4] = [
    (Metric::PixelError, pixel_error),
    (Metric::Structural, structural),
    (Metric::Distribution, distribution),
    (Metric::EdgePattern, edge_pattern),
];

/// `1 - MSE / 255^2`.
fn pixel_error(a: &PreparedImage, b: &PreparedImage) -> f64 {
    let pa = a.luma.pixels();
    let pb = b.luma.pixels();
    let sum: f64 = pa
        .iter()
        .zip(pb)
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum();
    let mse = sum / pa.len() as f64;
    (1.0 - mse / MAX_SQUARED_ERROR).clamp(0.0, 1.0)
}

/// Global cross-correlation ratio `(2 cov + C) / (var_a + var_b + C)`.
fn structural(a: &PreparedImage, b: &PreparedImage) -> f64 {
    let var_sum = a.variance + b.variance;
    if var_sum == 0.0 {
        // Two flat fields: identical or not, there is no structure to compare.
        return if a.luma.pixels() == b.luma.pixels() {
            1.0
        } else {
            0.0
        };
    }
    let cov: f64 = a
        .luma
        .pixels()
        .iter()
        .zip(b.luma.pixels())
        .map(|(&x, &y)| (f64::from(x) - a.mean) * (f64::from(y) - b.mean))
        .sum::<f64>()
        / a.luma.len() as f64;
    let ratio = (2.0 * cov + STRUCTURAL_STABILIZER) / (var_sum + STRUCTURAL_STABILIZER);
    ratio.clamp(0.0, 1.0)
}

/// Histogram intersection of the two normalized histograms.
fn distribution(a: &PreparedImage, b: &PreparedImage) -> f64 {
    a.histogram
        .iter()
        .zip(&b.histogram)
        .map(|(&x, &y)| x.min(y))
        .sum::<f64>()
        .clamp(0.0, 1.0)
}

/// `1 - mean |edges_a - edges_b| / full_scale`.
fn edge_pattern(a: &PreparedImage, b: &PreparedImage) -> f64 {
    let diff: f64 = a
        .edges
        .iter()
        .zip(&b.edges)
        .map(|(&x, &y)| (x - y).abs())
        .sum::<f64>()
        / a.edges.len() as f64;
    (1.0 - diff / EDGE_FULL_SCALE).max(0.0)
}
