//! Seeded Laplace noise
//!
//! Every estimate is reproducible from its `(domain, epsilon, seed)` triple:
//! a fresh [`SeededNoise`] is created per run from the caller's seed and never
//! shared between runs.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Exp};

use crate::{Error, Result};

/// Laplace distribution centred at zero
///
/// Sampled as the difference of two independent exponentials with rate
/// `1 / scale`, so every draw consumes exactly two exponential samples.
#[derive(Debug, Clone, Copy)]
pub struct Laplace {
    scale: f64,
    exp: Exp<f64>,
}

impl Laplace {
    /// Create a Laplace(0, scale) distribution
    pub fn new(scale: f64) -> Result<Self> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "Laplace scale must be positive and finite, got {scale}"
            )));
        }
        let exp = Exp::new(1.0 / scale)
            .map_err(|e| Error::InvalidParameter(format!("Laplace scale {scale}: {e}")))?;
        Ok(Self { scale, exp })
    }

    /// The scale parameter `b`
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Variance `2 b^2`
    pub fn variance(&self) -> f64 {
        2.0 * self.scale * self.scale
    }
}

impl Distribution<f64> for Laplace {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.exp.sample(rng) - self.exp.sample(rng)
    }
}

/// Anything that can produce Laplace noise for a given scale
pub trait NoiseSource {
    /// Draw one sample from Laplace(0, scale)
    fn laplace(&mut self, scale: f64) -> Result<f64>;

    /// Number of Laplace samples drawn so far
    fn draws(&self) -> usize;
}

/// Deterministic Laplace noise backed by a ChaCha20 stream
#[derive(Debug, Clone)]
pub struct SeededNoise {
    rng: ChaCha20Rng,
    draws: usize,
}

impl SeededNoise {
    /// Create a generator from a caller supplied seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl NoiseSource for SeededNoise {
    fn laplace(&mut self, scale: f64) -> Result<f64> {
        let dist = Laplace::new(scale)?;
        self.draws += 1;
        Ok(dist.sample(&mut self.rng))
    }

    fn draws(&self) -> usize {
        self.draws
    }
}
