use std::sync::Arc;
use std::time::Instant;

use catalog::{CatalogStore, PixelSource, ReferenceImage};
use rayon::prelude::*;
use similarity::{PreparedImage, SimilarityEngine};
use tracing::{debug, info, warn};

use crate::metrics::metrics_recorder;
use crate::noise::NoiseSource;
use crate::types::{CandidateError, MatchError, ScanConfig, ScanOutcome, ScoredCandidate};


/// Scores one prepared probe against one catalog entry.
pub trait CandidateScorer: Send + Sync {
    fn score(&self, probe: &PreparedImage, candidate: &ReferenceImage) -> Result<f32, CandidateError>;
}

/// Loads the candidate's raster through a [`PixelSource`] and runs the
/// similarity engine on it.
pub struct EngineScorer {
    engine: Arc<SimilarityEngine>,
    pixels: Arc<dyn PixelSource>,
}

impl EngineScorer {
    pub fn new(engine: Arc<SimilarityEngine>, pixels: Arc<dyn PixelSource>) -> Self {
        Self { engine, pixels }
    }

    pub fn engine(&self) -> &SimilarityEngine {
        &self.engine
    }
}

impl CandidateScorer for EngineScorer {
    fn score(&self, probe: &PreparedImage, candidate: &ReferenceImage) -> Result<f32, CandidateError> {
        let bytes = self.pixels.load(&candidate.locator)?;
        let reference = self.engine.prepare_bytes(&bytes)?;
        Ok(self.engine.compare(probe, &reference).composite)
    }
}

/// Partial scan result. Merging is commutative and associative, which is
/// what lets the parallel scan reduce in any order.
#[derive(Debug, Clone, Copy, Default)]
struct Tally<'a> {
    best: Option<(f32, &'a ReferenceImage)>,
    scanned: usize,
    failures: usize,
}

impl<'a> Tally<'a> {
    fn merge(self, other: Tally<'a>) -> Tally<'a> {
        let best = match (self.best, other.best) {
            (Some(a), Some(b)) => Some(if outranks(b, a) { b } else { a }),
            (a, b) => a.or(b),
        };
        Tally {
            best,
            scanned: self.scanned + other.scanned,
            failures: self.failures + other.failures,
        }
    }
}

/// Higher score first; equal scores go to the lower catalog id.
fn outranks(a: (f32, &ReferenceImage), b: (f32, &ReferenceImage)) -> bool {
    a.0 > b.0 || (a.0 == b.0 && a.1.id < b.1.id)
}

/// Finds the best catalog entry at or above the threshold.
///
/// Sequential scans keep the first candidate seen among equal scores: a
/// later candidate only takes over with a strictly greater score. Parallel
/// scans cannot observe enumeration order, so ties go to the lowest id.
pub struct Scanner {
    cfg: ScanConfig,
    noise: Box<dyn NoiseSource>,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("cfg", &self.cfg)
            .field("noise", &self.noise.name())
            .finish()
    }
}

impl Scanner {
    /// Validate `cfg` and build the noise source it describes.
    pub fn new(cfg: ScanConfig) -> Result<Self, MatchError> {
        cfg.validate()?;
        let noise = cfg.noise.build();
        Ok(Self { cfg, noise })
    }

    /// Use an injected noise source instead of the one `cfg.noise` describes.
    pub fn with_noise(cfg: ScanConfig, noise: Box<dyn NoiseSource>) -> Result<Self, MatchError> {
        cfg.validate()?;
        Ok(Self { cfg, noise })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.cfg
    }

    pub fn noise_name(&self) -> &'static str {
        self.noise.name()
    }

    /// Enumerate `store` and scan the snapshot. A store failure is an error,
    /// never a silent "no match".
    pub fn scan_catalog(
        &self,
        probe: &PreparedImage,
        store: &dyn CatalogStore,
        scorer: &dyn CandidateScorer,
    ) -> Result<ScanOutcome, MatchError> {
        let candidates = store.reference_images()?;
        Ok(self.scan(probe, &candidates, scorer))
    }

    pub fn scan(
        &self,
        probe: &PreparedImage,
        candidates: &[ReferenceImage],
        scorer: &dyn CandidateScorer,
    ) -> ScanOutcome {
        let start = Instant::now();
        let (eligible, skipped) = self.eligible(candidates);
        let tally = if self.cfg.parallel {
            self.scan_parallel(probe, &eligible, scorer)
        } else {
            self.scan_sequential(probe, &eligible, scorer)
        };
        let elapsed = start.elapsed();

        let best = tally.best.map(|(score, image)| ScoredCandidate {
            image: image.clone(),
            score,
        });
        info!(
            candidates = tally.scanned,
            failures = tally.failures,
            skipped,
            parallel = self.cfg.parallel,
            matched_id = best.as_ref().map(|b| b.image.id),
            elapsed_ms = elapsed.as_millis() as u64,
            "catalog scan finished"
        );
        if let Some(recorder) = metrics_recorder() {
            recorder.record_scan(tally.scanned, tally.failures, best.is_some(), elapsed);
        }

        ScanOutcome {
            best,
            scanned: tally.scanned,
            failures: tally.failures,
            skipped,
            elapsed,
        }
    }

    fn eligible<'a>(&self, candidates: &'a [ReferenceImage]) -> (Vec<&'a ReferenceImage>, usize) {
        let mut eligible: Vec<&ReferenceImage> = candidates
            .iter()
            .filter(|c| self.cfg.visibility.admits(c))
            .collect();
        if let Some(max) = self.cfg.max_candidates {
            eligible.truncate(max);
        }
        let skipped = candidates.len() - eligible.len();
        (eligible, skipped)
    }

    /// Noise-adjusted score, or `None` when the candidate could not be scored.
    fn evaluate(
        &self,
        probe: &PreparedImage,
        candidate: &ReferenceImage,
        scorer: &dyn CandidateScorer,
    ) -> Option<f32> {
        match scorer.score(probe, candidate) {
            Ok(raw) => {
                let raw = if raw.is_finite() { raw.clamp(0.0, 1.0) } else { 0.0 };
                Some(self.noise.apply(raw, candidate.id))
            }
            Err(err) => {
                warn!(
                    image_id = candidate.id,
                    locator = %candidate.locator,
                    error = %err,
                    "candidate could not be scored; skipping"
                );
                None
            }
        }
    }

    fn scan_sequential<'a>(
        &self,
        probe: &PreparedImage,
        eligible: &[&'a ReferenceImage],
        scorer: &dyn CandidateScorer,
    ) -> Tally<'a> {
        let mut tally = Tally::default();
        for &candidate in eligible {
            tally.scanned += 1;
            let Some(score) = self.evaluate(probe, candidate, scorer) else {
                tally.failures += 1;
                continue;
            };
            let improves = tally.best.map_or(true, |(best, _)| score > best);
            if improves && score >= self.cfg.threshold {
                debug!(image_id = candidate.id, score, "new best candidate");
                tally.best = Some((score, candidate));
            }
        }
        tally
    }

    fn scan_parallel<'a>(
        &self,
        probe: &PreparedImage,
        eligible: &[&'a ReferenceImage],
        scorer: &dyn CandidateScorer,
    ) -> Tally<'a> {
        let threshold = self.cfg.threshold;
        eligible
            .par_iter()
            .map(|&candidate| match self.evaluate(probe, candidate, scorer) {
                Some(score) => Tally {
                    best: (score >= threshold).then_some((score, candidate)),
                    scanned: 1,
                    failures: 0,
                },
                None => Tally {
                    best: None,
                    scanned: 1,
                    failures: 1,
                },
            })
            .reduce(Tally::default, Tally::merge)
    }
}
