//! Resting liquidity map and iceberg flags
//!
//! Rebuilt on a slower cadence than the rest of the snapshot; see
//! [`RefreshPolicy`].

use crate::random::RandomSource;
use serde::{Deserialize, Serialize};
use services_common::constants::engine::MIN_PRICE;
use services_common::constants::liquidity::{
    DEFAULT_ICEBERG_PROBABILITY, DEFAULT_ICEBERG_SIZE_THRESHOLD, DEFAULT_LIQUIDITY_LEVELS,
    DEFAULT_MAX_OFFSET, DEFAULT_MAX_SIZE, DEFAULT_MIN_SIZE, DEFAULT_REFRESH_PROBABILITY,
};
use services_common::{ConfigError, GenerationError};

/// Which side of the mid a resting level sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiquiditySide {
    /// Below the mid
    Bid,
    /// At or above the mid
    Ask,
}

/// Resting order hint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityLevel {
    /// Level price
    pub price: f64,
    /// Resting size, always positive
    pub size: u64,
    /// Side of the mid
    #[serde(rename = "type")]
    pub side: LiquiditySide,
    /// Large order showing only part of its size
    pub is_iceberg: bool,
    /// Generation time
    pub timestamp_ms: i64,
}

/// Shape of the liquidity map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityParams {
    /// Levels per rebuild
    pub count: usize,
    /// Furthest distance from the mid
    pub max_offset: f64,
    /// Smallest resting size
    pub min_size: u64,
    /// Largest resting size
    pub max_size: u64,
    /// Only sizes above this can be icebergs
    pub iceberg_size_threshold: u64,
    /// Odds a candidate is flagged
    pub iceberg_probability: f64,
}

impl Default for LiquidityParams {
    fn default() -> Self {
        Self {
            count: DEFAULT_LIQUIDITY_LEVELS,
            max_offset: DEFAULT_MAX_OFFSET,
            min_size: DEFAULT_MIN_SIZE,
            max_size: DEFAULT_MAX_SIZE,
            iceberg_size_threshold: DEFAULT_ICEBERG_SIZE_THRESHOLD,
            iceberg_probability: DEFAULT_ICEBERG_PROBABILITY,
        }
    }
}

impl LiquidityParams {
    /// Check ranges and probabilities
    ///
    /// # Errors
    ///
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_size == 0 || self.max_size < self.min_size {
            #[allow(clippy::cast_precision_loss)]
            return Err(ConfigError::InvalidRange {
                name: "liquidity.size",
                min: self.min_size as f64,
                max: self.max_size as f64,
            });
        }
        if !self.max_offset.is_finite() || self.max_offset < 0.0 {
            return Err(ConfigError::InvalidRange {
                name: "liquidity.max_offset",
                min: 0.0,
                max: self.max_offset,
            });
        }
        validate_probability("liquidity.iceberg_probability", self.iceberg_probability)
    }
}

pub(crate) fn validate_probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability { name, value })
    }
}

/// How often the liquidity map is rebuilt
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Rebuild on a random share of ticks
    Probability(f64),
    /// Rebuild on every n-th tick
    EveryNTicks(u64),
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::Probability(DEFAULT_REFRESH_PROBABILITY)
    }
}

impl RefreshPolicy {
    /// Check the policy parameter
    ///
    /// # Errors
    ///
    /// Returns an error for a probability outside [0, 1] or a zero modulus.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Probability(p) => validate_probability("liquidity_refresh", p),
            Self::EveryNTicks(0) => Err(ConfigError::InvalidCapacity {
                name: "liquidity_refresh",
                value: 0,
            }),
            Self::EveryNTicks(_) => Ok(()),
        }
    }

    /// Whether tick number `tick_index` (1-based) rebuilds the map
    ///
    /// # Errors
    ///
    /// Returns an error if the random source misbehaves.
    pub fn should_refresh(
        &self,
        tick_index: u64,
        rng: &mut dyn RandomSource,
    ) -> Result<bool, GenerationError> {
        match *self {
            Self::Probability(p) => rng.chance(p),
            Self::EveryNTicks(n) => Ok(n > 0 && tick_index % n == 0),
        }
    }
}

/// Build `params.count` resting levels at random offsets from the mid,
/// sorted descending by price.
///
/// # Errors
///
/// Returns an error if a price is not finite or the random source misbehaves.
pub fn build_liquidity_levels(
    mid_price: f64,
    params: &LiquidityParams,
    now_ms: i64,
    rng: &mut dyn RandomSource,
) -> Result<Vec<LiquidityLevel>, GenerationError> {
    let mut levels = Vec::with_capacity(params.count);

    for _ in 0..params.count {
        let offset = rng.centered(params.max_offset)?;
        let price = GenerationError::check_finite("liquidity price", mid_price + offset)?;
        let size = rng.uniform_u64(params.min_size, params.max_size)?.max(1);
        // Rolled for every level so the draw count does not depend on size
        let flagged = rng.chance(params.iceberg_probability)?;

        levels.push(LiquidityLevel {
            price: price.max(MIN_PRICE),
            size,
            side: if offset < 0.0 {
                LiquiditySide::Bid
            } else {
                LiquiditySide::Ask
            },
            is_iceberg: size > params.iceberg_size_threshold && flagged,
            timestamp_ms: now_ms,
        });
    }

    levels.sort_by(|a, b| b.price.total_cmp(&a.price));
    Ok(levels)
}
