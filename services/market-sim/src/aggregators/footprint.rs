//! Footprint rows and volume profile

use crate::generators::book::signed_difference;
use crate::random::RandomSource;
use serde::{Deserialize, Serialize};
use services_common::GenerationError;
use services_common::constants::footprint::{
    FOOTPRINT_MAX_TRADES, FOOTPRINT_MAX_VOLUME, IMBALANCE_RATIO,
};

/// Which side dominates a footprint rung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Imbalance {
    /// Bid volume more than twice the ask volume
    Bid,
    /// Ask volume more than twice the bid volume
    Ask,
    /// Neither side dominates
    Neutral,
}

impl Imbalance {
    /// Classify by the 2:1 rule
    #[must_use]
    pub const fn classify(bid_volume: u64, ask_volume: u64) -> Self {
        if bid_volume > ask_volume.saturating_mul(IMBALANCE_RATIO) {
            Self::Bid
        } else if ask_volume > bid_volume.saturating_mul(IMBALANCE_RATIO) {
            Self::Ask
        } else {
            Self::Neutral
        }
    }
}

/// Executed volume at one price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootprintRow {
    /// Rung price
    pub price: f64,
    /// Volume traded on the bid
    pub bid_volume: u64,
    /// Volume traded on the ask
    pub ask_volume: u64,
    /// `bid_volume - ask_volume`
    pub delta: i64,
    /// Prints at this rung
    pub trades: u64,
    /// Derived from the volumes
    pub imbalance: Imbalance,
}

impl FootprintRow {
    /// Row with `delta` and `imbalance` derived from the volumes
    #[must_use]
    pub fn new(price: f64, bid_volume: u64, ask_volume: u64, trades: u64) -> Self {
        Self {
            price,
            bid_volume,
            ask_volume,
            delta: signed_difference(bid_volume, ask_volume),
            trades,
            imbalance: Imbalance::classify(bid_volume, ask_volume),
        }
    }

    /// Bid plus ask volume
    #[must_use]
    pub const fn total_volume(&self) -> u64 {
        self.bid_volume.saturating_add(self.ask_volume)
    }
}

/// Build `2 * level_count + 1` footprint rows around the mid, sorted
/// descending by price. Volumes are drawn independently per side.
///
/// # Errors
///
/// Returns an error if a price is not finite or the random source misbehaves.
pub fn build_footprint(
    mid_price: f64,
    level_count: usize,
    tick_size: f64,
    rng: &mut dyn RandomSource,
) -> Result<Vec<FootprintRow>, GenerationError> {
    let n = i64::try_from(level_count).unwrap_or(i64::MAX);
    let mut rows = Vec::with_capacity(2 * level_count + 1);

    for offset in (-n..=n).rev() {
        #[allow(clippy::cast_precision_loss)]
        let price = GenerationError::check_finite(
            "footprint price",
            mid_price + offset as f64 * tick_size,
        )?;
        let bid_volume = rng.uniform_u64(0, FOOTPRINT_MAX_VOLUME)?;
        let ask_volume = rng.uniform_u64(0, FOOTPRINT_MAX_VOLUME)?;
        let trades = rng.uniform_u64(0, FOOTPRINT_MAX_TRADES)?;
        rows.push(FootprintRow::new(price, bid_volume, ask_volume, trades));
    }

    Ok(rows)
}

/// Point of control and value area over a set of footprint rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootprintProfile {
    /// Price with the greatest total volume
    pub poc: f64,
    /// Top of the value area
    pub vah: f64,
    /// Bottom of the value area
    pub val: f64,
    /// Volume across all rows
    pub total_volume: u64,
    /// Volume inside the value area
    pub value_area_volume: u64,
}

impl FootprintProfile {
    /// Profile over rows sorted descending by price. `None` when empty.
    ///
    /// The value area grows outward from the POC, taking the heavier
    /// neighbour first (the higher price on ties), until it holds at least
    /// `value_area_pct` percent of the volume.
    #[must_use]
    pub fn from_rows(rows: &[FootprintRow], value_area_pct: u8) -> Option<Self> {
        let volumes: Vec<u64> = rows.iter().map(FootprintRow::total_volume).collect();
        let total: u64 = volumes.iter().sum();

        // First maximum in descending order is the higher price
        let poc_index = volumes
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, u64)>, (i, &v)| match best {
                Some((_, best_v)) if best_v >= v => best,
                _ => Some((i, v)),
            })?
            .0;

        let pct = u128::from(value_area_pct.min(100));
        let target = (u128::from(total) * pct).div_ceil(100);

        let (mut hi, mut lo) = (poc_index, poc_index);
        let mut covered = u128::from(volumes[poc_index]);

        while covered < target && (hi > 0 || lo + 1 < volumes.len()) {
            let above = hi.checked_sub(1).map(|i| volumes[i]);
            let below = volumes.get(lo + 1).copied();
            match (above, below) {
                (Some(a), Some(b)) if b > a => {
                    lo += 1;
                    covered += u128::from(b);
                }
                (Some(a), _) => {
                    hi -= 1;
                    covered += u128::from(a);
                }
                (None, Some(b)) => {
                    lo += 1;
                    covered += u128::from(b);
                }
                (None, None) => break,
            }
        }

        Some(Self {
            poc: rows[poc_index].price,
            vah: rows[hi].price,
            val: rows[lo].price,
            total_volume: total,
            value_area_volume: u64::try_from(covered).unwrap_or(u64::MAX),
        })
    }
}
