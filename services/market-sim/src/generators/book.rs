//! Synthetic depth ladder around the mid-price

use crate::random::RandomSource;
use serde::{Deserialize, Serialize};
use services_common::GenerationError;
use services_common::constants::book::{BOOK_BASE_SIZE, BOOK_MAX_TRADES, BOOK_MIN_SIZE};

/// One price rung of the ladder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLevel {
    /// Rung price
    pub price: f64,
    /// Resting bid size
    pub bid_size: u64,
    /// Resting ask size
    pub ask_size: u64,
    /// Prints at this rung
    pub trades: u64,
    /// `bid_size - ask_size`
    pub delta: i64,
    /// Generation time
    pub timestamp_ms: i64,
}

impl OrderLevel {
    /// Rung with `delta` derived from the sizes
    #[must_use]
    pub fn new(price: f64, bid_size: u64, ask_size: u64, trades: u64, timestamp_ms: i64) -> Self {
        Self {
            price,
            bid_size,
            ask_size,
            trades,
            delta: signed_difference(bid_size, ask_size),
            timestamp_ms,
        }
    }
}

/// `a - b` as a signed value, saturating at the `i64` range
#[must_use]
pub fn signed_difference(a: u64, b: u64) -> i64 {
    let diff = i128::from(a) - i128::from(b);
    i64::try_from(diff).unwrap_or(if diff > 0 { i64::MAX } else { i64::MIN })
}

/// Mean rung size at `distance` rungs from the touch
fn mean_size(distance: usize, level_count: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let falloff = 1.0 - distance as f64 / (level_count as f64 + 1.0);
    BOOK_BASE_SIZE * falloff
}

fn draw_size(mean: f64, rng: &mut dyn RandomSource) -> Result<u64, GenerationError> {
    let raw = rng.uniform(0.0, 2.0 * mean)?.floor();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let size = raw.max(0.0) as u64;
    Ok(size.max(BOOK_MIN_SIZE))
}

/// Build `2 * level_count + 1` rungs at `mid + i * tick_size` for
/// `i` in `[-level_count, level_count]`, sorted descending by price.
///
/// Size means fall linearly with distance from the mid. `level_count == 0`
/// yields the single mid rung.
///
/// # Errors
///
/// Returns an error if a computed price is not finite or the random source
/// misbehaves.
pub fn build_levels(
    mid_price: f64,
    level_count: usize,
    tick_size: f64,
    now_ms: i64,
    rng: &mut dyn RandomSource,
) -> Result<Vec<OrderLevel>, GenerationError> {
    let mut levels = Vec::with_capacity(2 * level_count + 1);
    let n = i64::try_from(level_count).unwrap_or(i64::MAX);

    for offset in (-n..=n).rev() {
        #[allow(clippy::cast_precision_loss)]
        let price =
            GenerationError::check_finite("level price", mid_price + offset as f64 * tick_size)?;
        let mean = mean_size(offset.unsigned_abs() as usize, level_count);
        let bid_size = draw_size(mean, rng)?;
        let ask_size = draw_size(mean, rng)?;
        let trades = rng.uniform_u64(0, BOOK_MAX_TRADES)?;
        levels.push(OrderLevel::new(price, bid_size, ask_size, trades, now_ms));
    }

    debug_assert!(levels.windows(2).all(|w| w[0].price >= w[1].price));
    Ok(levels)
}
