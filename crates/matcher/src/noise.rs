//! Seedable score jitter.
//!
//! The offset for a candidate is a pure function of the seed and the
//! candidate id, so sequential and parallel scans see the same adjusted
//! scores and a given catalog always produces the same decision.

use catalog::ImageId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of per-candidate score offsets.
pub trait NoiseSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Offset to add to the raw score of `candidate`.
    fn offset(&self, candidate: ImageId) -> f32;

    /// `score + offset`, clamped back into `[0, 1]`.
    fn apply(&self, score: f32, candidate: ImageId) -> f32 {
        (score + self.offset(candidate)).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoNoise;

impl NoiseSource for NoNoise {
    fn name(&self) -> &'static str {
        "none"
    }

    fn offset(&self, _candidate: ImageId) -> f32 {
        0.0
    }
}

/// Uniform offsets in `[-amplitude, amplitude]` from a seeded `StdRng`.
#[derive(Debug, Clone, Copy)]
pub struct SeededNoise {
    seed: u64,
    amplitude: f32,
}

impl SeededNoise {
    pub fn new(seed: u64, amplitude: f32) -> Self {
        Self {
            seed,
            amplitude: amplitude.abs(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    fn stream_seed(&self, candidate: ImageId) -> u64 {
        // splitmix64 finalizer over seed and id.
        let mut z = self
            .seed
            .wrapping_add(candidate.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

impl NoiseSource for SeededNoise {
    fn name(&self) -> &'static str {
        "seeded"
    }

    fn offset(&self, candidate: ImageId) -> f32 {
        if self.amplitude == 0.0 {
            return 0.0;
        }
        let mut rng = StdRng::seed_from_u64(self.stream_seed(candidate));
        rng.random_range(-self.amplitude..=self.amplitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_stay_within_amplitude() {
        let noise = SeededNoise::new(42, 0.01);
        for id in 0..500 {
            let o = noise.offset(id);
            assert!((-0.01..=0.01).contains(&o), "id {id}: {o}");
        }
    }

    #[test]
    fn same_seed_same_offsets() {
        let a = SeededNoise::new(7, 0.05);
        let b = SeededNoise::new(7, 0.05);
        for id in [1, 2, 3, 1000, u64::MAX] {
            assert_eq!(a.offset(id), b.offset(id));
        }
    }

    #[test]
    fn offsets_vary_by_candidate_and_seed() {
        let a = SeededNoise::new(7, 0.05);
        let b = SeededNoise::new(8, 0.05);
        let from_a: Vec<f32> = (1..20).map(|id| a.offset(id)).collect();
        let from_b: Vec<f32> = (1..20).map(|id| b.offset(id)).collect();
        assert_ne!(from_a, from_b);
        assert!(from_a.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn apply_clamps_into_unit_range() {
        let noise = SeededNoise::new(1, 0.5);
        for id in 0..100 {
            assert!((0.0..=1.0).contains(&noise.apply(1.0, id)));
            assert!((0.0..=1.0).contains(&noise.apply(0.0, id)));
        }
        assert_eq!(NoNoise.apply(0.42, 9), 0.42);
    }
}
