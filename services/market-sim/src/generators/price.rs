//! Bounded random walk for the mid-price

use crate::random::RandomSource;
use services_common::GenerationError;
use services_common::constants::engine::MIN_PRICE;

/// Centered-uniform price walk with a positive floor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePath {
    volatility: f64,
    floor: f64,
}

impl PricePath {
    /// Walk stepping at most `volatility` per sample
    #[must_use]
    pub const fn new(volatility: f64) -> Self {
        Self {
            volatility,
            floor: MIN_PRICE,
        }
    }

    /// Step half-width
    #[must_use]
    pub const fn volatility(&self) -> f64 {
        self.volatility
    }

    /// Lowest reachable price
    #[must_use]
    pub const fn floor(&self) -> f64 {
        self.floor
    }

    /// Next sample from the previous one
    ///
    /// # Errors
    ///
    /// Returns an error if `previous` or the result is not finite, or the
    /// random source misbehaves.
    pub fn next_price(
        &self,
        previous: f64,
        rng: &mut dyn RandomSource,
    ) -> Result<f64, GenerationError> {
        let previous = GenerationError::check_finite("previous price", previous)?;
        let step = rng.centered(self.volatility)?;
        let next = GenerationError::check_finite("price", previous + step)?;
        Ok(next.max(self.floor))
    }
}
