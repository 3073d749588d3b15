//! Injectable source of randomness
//!
//! Every generator draws through [`RandomSource`] so tests can seed or
//! script the sequence.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use services_common::GenerationError;

/// Uniform draws in `[0, 1)`
pub trait RandomSource: Send {
    /// Next raw draw. Implementations should stay in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Next draw, rejected when outside `[0, 1)`
    fn draw(&mut self) -> Result<f64, GenerationError> {
        let value = self.next_unit();
        if (0.0..1.0).contains(&value) {
            Ok(value)
        } else {
            Err(GenerationError::DrawOutOfRange(value))
        }
    }

    /// Uniform in `[-magnitude, magnitude)`
    fn centered(&mut self, magnitude: f64) -> Result<f64, GenerationError> {
        Ok((self.draw()? - 0.5) * 2.0 * magnitude)
    }

    /// Uniform in `[min, max)`
    fn uniform(&mut self, min: f64, max: f64) -> Result<f64, GenerationError> {
        Ok(min + self.draw()? * (max - min))
    }

    /// Uniform integer in `[min, max]`
    fn uniform_u64(&mut self, min: u64, max: u64) -> Result<u64, GenerationError> {
        if max <= min {
            // Still consume a draw so the sequence length stays fixed
            self.draw()?;
            return Ok(min);
        }
        let span = (max - min) as f64 + 1.0;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let offset = (self.draw()? * span) as u64;
        Ok((min + offset).min(max))
    }

    /// True with probability `p`
    fn chance(&mut self, p: f64) -> Result<bool, GenerationError> {
        Ok(self.draw()? < p)
    }
}

/// `StdRng`-backed source
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    /// Deterministic source for a given seed
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Source seeded from the OS
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded when a seed is given, entropy otherwise
    #[must_use]
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::from_seed)
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }
}

/// Repeats a fixed cycle of draws
#[cfg(test)]
pub(crate) struct CycleRandom {
    values: Vec<f64>,
    index: usize,
}

#[cfg(test)]
impl CycleRandom {
    pub(crate) fn new(values: Vec<f64>) -> Self {
        Self { values, index: 0 }
    }

    pub(crate) fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

#[cfg(test)]
impl RandomSource for CycleRandom {
    fn next_unit(&mut self) -> f64 {
        let value = self.values[self.index % self.values.len()];
        self.index += 1;
        value
    }
}
