//! # DEX Matcher (`matcher`)
//!
//! Drives the similarity engine over a catalog snapshot and decides whether
//! a probe photograph matched anything.
//!
//! - [`Scanner`] applies the threshold and tie-break policy of a
//!   [`ScanConfig`]: a candidate takes over only with a strictly greater
//!   score that is at least the threshold. Candidates that cannot be loaded
//!   or decoded are logged, counted and skipped.
//! - [`NoiseSource`] is the explicitly injected, seeded jitter applied to
//!   each score before the threshold test ([`SeededNoise`], [`NoNoise`]).
//! - [`Classifier`] turns the winning score into a [`MatchQuality`] tier plus
//!   a diagnostic possible-duplicate flag.
//! - [`CandidateScorer`] is the seam between the scan and the engine;
//!   [`EngineScorer`] loads rasters through a `catalog::PixelSource`.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use catalog::{Catalog, MemoryPixelSource};
//! use image::{DynamicImage, GrayImage, Luma};
//! use matcher::{EngineScorer, NoiseConfig, ScanConfig, Scanner};
//! use similarity::{SimilarityConfig, SimilarityEngine};
//!
//! let engine = Arc::new(SimilarityEngine::new(SimilarityConfig::default()).unwrap());
//! let scorer = EngineScorer::new(engine.clone(), Arc::new(MemoryPixelSource::new()));
//! let scanner = Scanner::new(ScanConfig::default().with_noise(NoiseConfig::disabled())).unwrap();
//!
//! let probe = engine.prepare(&DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([9]))));
//! let outcome = scanner.scan_catalog(&probe, &Catalog::in_memory(), &scorer).unwrap();
//! assert!(outcome.best.is_none());
//! ```
//!
//! ## Observability
//!
//! Install a [`ScanMetrics`] implementation via [`set_scan_metrics`] to record
//! per-scan latency, candidate counts and failures.

pub mod classify;
pub mod engine;
pub mod metrics;
pub mod noise;
pub mod types;

pub use crate::classify::Classifier;
pub use crate::engine::{CandidateScorer, EngineScorer, Scanner};
pub use crate::metrics::{set_scan_metrics, ScanMetrics};
pub use crate::noise::{NoNoise, NoiseSource, SeededNoise};
pub use crate::types::{
    CandidateError, Classification, ClassifierConfig, MatchError, MatchQuality, NoiseConfig,
    ScanConfig, ScanOutcome, ScoredCandidate, Visibility,
};
