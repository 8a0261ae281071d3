use std::time::Duration;

use catalog::{CatalogError, ImageId, PixelError, ReferenceImage};
use serde::{Deserialize, Serialize};
use similarity::SimilarityError;
use thiserror::Error;

use crate::noise::{NoNoise, NoiseSource, SeededNoise};

/// Which reference images a scan may consider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Only images flagged public.
    #[default]
    PublicOnly,
    /// Every cataloged image, public or not. Meant for operator debugging.
    All,
}

impl Visibility {
    pub fn admits(self, image: &ReferenceImage) -> bool {
        match self {
            Visibility::PublicOnly => image.is_public,
            Visibility::All => true,
        }
    }
}

/// Symmetric score jitter applied before the threshold test.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NoiseConfig {
    pub enabled: bool,
    pub seed: u64,
    /// Offsets are drawn uniformly from `[-amplitude, amplitude]`.
    pub amplitude: f32,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            seed: 42,
            amplitude: 0.01,
        }
    }
}

impl NoiseConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn seeded(seed: u64, amplitude: f32) -> Self {
        Self {
            enabled: true,
            seed,
            amplitude,
        }
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if !self.amplitude.is_finite() || !(0.0..=0.5).contains(&self.amplitude) {
            return Err(MatchError::InvalidConfig(format!(
                "noise amplitude must be within [0, 0.5], got {}",
                self.amplitude
            )));
        }
        Ok(())
    }

    pub fn build(&self) -> Box<dyn NoiseSource> {
        if self.enabled && self.amplitude > 0.0 {
            Box::new(SeededNoise::new(self.seed, self.amplitude))
        } else {
            Box::new(NoNoise)
        }
    }
}

/// Scan policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
    /// Lowest (noise-adjusted) score that counts as a match.
    pub threshold: f32,
    /// Score candidates on the rayon pool instead of in enumeration order.
    pub parallel: bool,
    pub noise: NoiseConfig,
    /// Only the first `n` eligible candidates are scored.
    pub max_candidates: Option<usize>,
    pub visibility: Visibility,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            parallel: false,
            noise: NoiseConfig::default(),
            max_candidates: None,
            visibility: Visibility::PublicOnly,
        }
    }
}

impl ScanConfig {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_noise(mut self, noise: NoiseConfig) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_max_candidates(mut self, max: Option<usize>) -> Self {
        self.max_candidates = max;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        // A zero threshold would let an unscored candidate win.
        if !self.threshold.is_finite() || self.threshold <= 0.0 || self.threshold > 1.0 {
            return Err(MatchError::InvalidConfig(format!(
                "threshold must be within (0, 1], got {}",
                self.threshold
            )));
        }
        if self.max_candidates == Some(0) {
            return Err(MatchError::InvalidConfig(
                "max_candidates must be greater than zero".into(),
            ));
        }
        self.noise.validate()
    }
}

/// Confidence tier of a reported match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MatchQuality {
    High,
    Medium,
    Low,
}

impl MatchQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchQuality::High => "high",
            MatchQuality::Medium => "medium",
            MatchQuality::Low => "low",
        }
    }
}

/// Tier cutoffs. Every comparison is strict: a score equal to a cutoff
/// falls into the lower tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    pub high_above: f32,
    pub medium_above: f32,
    pub duplicate_above: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            high_above: 0.8,
            medium_above: 0.6,
            duplicate_above: 0.95,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), MatchError> {
        let in_unit = |v: f32| v.is_finite() && (0.0..=1.0).contains(&v);
        if !(in_unit(self.high_above) && in_unit(self.medium_above) && in_unit(self.duplicate_above)) {
            return Err(MatchError::InvalidConfig(
                "classifier cutoffs must lie in [0, 1]".into(),
            ));
        }
        if self.medium_above > self.high_above {
            return Err(MatchError::InvalidConfig(
                "medium_above must not exceed high_above".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Classification {
    pub quality: MatchQuality,
    /// Diagnostic only; never changes whether a match is reported.
    pub possible_duplicate: bool,
}

/// The winning candidate of a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub image: ReferenceImage,
    /// Noise-adjusted score, in `[0, 1]`.
    pub score: f32,
}

impl ScoredCandidate {
    pub fn id(&self) -> ImageId {
        self.image.id
    }
}

/// Everything a scan found out.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome {
    pub best: Option<ScoredCandidate>,
    /// Candidates that were scored, failures included.
    pub scanned: usize,
    pub failures: usize,
    /// Candidates left out by the visibility policy or the candidate cap.
    pub skipped: usize,
    pub elapsed: Duration,
}

impl ScanOutcome {
    pub fn is_match(&self) -> bool {
        self.best.is_some()
    }
}

/// Why one candidate could not be scored.
#[derive(Debug, Error)]
pub enum CandidateError {
    #[error("pixels unavailable: {0}")]
    Pixels(#[from] PixelError),
    #[error("reference undecodable: {0}")]
    Decode(#[from] SimilarityError),
}

/// Errors produced by the matching layer.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("invalid match config: {0}")]
    InvalidConfig(String),
    /// The catalog could not be enumerated.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scan_config_is_valid() {
        let cfg = ScanConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.threshold, 0.7);
        assert_eq!(cfg.visibility, Visibility::PublicOnly);
        assert_eq!(cfg.noise, NoiseConfig::seeded(42, 0.01));
    }

    #[test]
    fn invalid_thresholds_rejected() {
        for threshold in [0.0, -0.1, 1.01, f32::NAN] {
            let err = ScanConfig::default()
                .with_threshold(threshold)
                .validate()
                .expect_err("config should be invalid");
            match err {
                MatchError::InvalidConfig(msg) => assert!(msg.contains("threshold")),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn zero_candidate_cap_rejected() {
        assert!(ScanConfig::default()
            .with_max_candidates(Some(0))
            .validate()
            .is_err());
    }

    #[test]
    fn oversized_noise_rejected() {
        let cfg = ScanConfig::default().with_noise(NoiseConfig::seeded(1, 0.9));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn classifier_cutoffs_must_be_ordered() {
        let cfg = ClassifierConfig {
            high_above: 0.5,
            medium_above: 0.6,
            duplicate_above: 0.95,
        };
        assert!(cfg.validate().is_err());
        assert!(ClassifierConfig::default().validate().is_ok());
    }

    #[test]
    fn scan_config_reads_partial_json() {
        let cfg: ScanConfig = serde_json::from_str(r#"{"threshold":0.75,"visibility":"all"}"#).unwrap();
        assert_eq!(cfg.threshold, 0.75);
        assert_eq!(cfg.visibility, Visibility::All);
        assert!(!cfg.parallel);
        assert!(cfg.noise.enabled);
    }

    #[test]
    fn quality_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MatchQuality::Medium).unwrap(), "\"medium\"");
    }
}
