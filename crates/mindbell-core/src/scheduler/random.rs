//! Interval jitter.
//!
//! The random source is owned by the caller so tests can seed it.

use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;

/// Standard deviation of the jitter as a fraction of the mean interval.
pub const STD_DEV_FACTOR: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct IntervalRandomizer {
    rng: Mcg128Xsl64,
}

impl IntervalRandomizer {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mcg128Xsl64::from_entropy(),
        }
    }

    /// Deterministic sequence for tests and simulations.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mcg128Xsl64::seed_from_u64(seed),
        }
    }

    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    /// Standard normal sample (Box-Muller).
    pub fn gaussian(&mut self) -> f64 {
        // 1 - [0, 1) keeps ln() away from zero.
        let u1 = 1.0 - self.rng.gen::<f64>();
        let u2 = self.rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    /// Gaussian around `mean_millis`, clamped to `[mean/2, 3*mean/2]`.
    pub fn randomized_interval(&mut self, mean_millis: u64) -> u64 {
        let mean = mean_millis as f64;
        let sample = mean * (1.0 + STD_DEV_FACTOR * self.gaussian());
        let lower = mean_millis / 2;
        let upper = mean_millis.saturating_add(mean_millis / 2);
        if sample <= lower as f64 {
            lower
        } else if sample >= upper as f64 {
            upper
        } else {
            sample.round() as u64
        }
    }
}

impl Default for IntervalRandomizer {
    fn default() -> Self {
        Self::from_entropy()
    }
}
