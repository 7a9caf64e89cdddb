//! # Random Source Module
//!
//! Deterministic, per-repetition pseudo-randomness.
//!
//! Every repetition owns a single seeded generator created by the engine,
//! never a shared or global source, so that two repetitions run with the
//! same seed and configuration reproduce identical time-series.
//! This module wraps `rand::rngs::StdRng` and adds the rejection-sampled
//! normal deviate used for idle-time and battery-goal sampling.
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Maximum number of resamples before a rejection sampler gives up and
/// clamps to the nearest bound, guaranteeing termination.
const MAX_REJECTION_RETRIES: u32 = 64;

/// Per-repetition random source. Every destination pick, lane-change roll,
/// normal-distribution sample, and queue tie-break consumes from the same
/// instance.
#[derive(Debug)]
pub struct RandSource {
    rng: StdRng,
}

impl RandSource {
    /// Seeds a new source for one repetition.
    ///
    /// # Example
    /// ```rust
    /// use ev_grid_sim::rand_source::RandSource;
    /// let mut rng = RandSource::seeded(42);
    /// let roll = rng.unit_interval();
    /// assert!((0.0..1.0).contains(&roll));
    /// ```
    pub fn seeded(seed: u64) -> Self {
        RandSource { rng: StdRng::seed_from_u64(seed) }
    }

    /// A uniform float in `[0, 1)`, used for lane-change probability rolls.
    pub fn unit_interval(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// Picks a uniformly random index in `0..len`. Panics if `len == 0`.
    pub fn random_index(&mut self, len: usize) -> usize {
        self.rng.random_range(0..len)
    }

    /// Box-Muller normal deviate with the given mean and standard deviation.
    fn normal(&mut self, mean: f64, std: f64) -> f64 {
        // Avoid ln(0.0) by excluding the lower endpoint.
        let u1: f64 = self.rng.random_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.random::<f64>();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std * z
    }

    /// Draws an integer normal deviate, resampling while it falls outside
    /// `[lower, upper]`. After [`MAX_REJECTION_RETRIES`] attempts, clamps the
    /// last draw to the nearest bound rather than looping forever.
    pub fn normal_clamped_i64(&mut self, mean: f64, std: f64, lower: i64, upper: i64) -> i64 {
        let mut draw = self.normal(mean, std).round() as i64;
        let mut attempts = 0;
        while (draw < lower || draw > upper) && attempts < MAX_REJECTION_RETRIES {
            draw = self.normal(mean, std).round() as i64;
            attempts += 1;
        }
        draw.clamp(lower, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_determinism() {
        let mut a = RandSource::seeded(7);
        let mut b = RandSource::seeded(7);
        for _ in 0..20 {
            assert_eq!(a.unit_interval(), b.unit_interval());
        }
    }

    #[test]
    fn test_normal_clamped_respects_bounds() {
        let mut rng = RandSource::seeded(1);
        for _ in 0..200 {
            let v = rng.normal_clamped_i64(50.0, 100.0, 10, 90);
            assert!((10..=90).contains(&v), "value {} out of bounds", v);
        }
    }
}
