//! Score to confidence tier.

use crate::types::{Classification, ClassifierConfig, MatchError, MatchQuality};

#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    cfg: ClassifierConfig,
}

impl Classifier {
    pub fn new(cfg: ClassifierConfig) -> Result<Self, MatchError> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.cfg
    }

    pub fn quality(&self, score: f32) -> MatchQuality {
        if score > self.cfg.high_above {
            MatchQuality::High
        } else if score > self.cfg.medium_above {
            MatchQuality::Medium
        } else {
            MatchQuality::Low
        }
    }

    pub fn classify(&self, score: f32) -> Classification {
        Classification {
            quality: self.quality(score),
            possible_duplicate: score > self.cfg.duplicate_above,
        }
    }
}
