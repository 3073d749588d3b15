//! Rollup statistics over a snapshot

use crate::generators::{LiquidityLevel, OrderLevel, Trade};
use serde::{Deserialize, Serialize};

/// Pure projections of the current book, tape and liquidity map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Sum of bid sizes over the book
    pub total_bid_volume: u64,
    /// Sum of ask sizes over the book
    pub total_ask_volume: u64,
    /// Signed sum of print sizes over the tape
    pub cumulative_delta: i64,
    /// Large prints on the tape
    pub large_order_count: usize,
    /// Iceberg levels in the liquidity map
    pub iceberg_count: usize,
    /// `(bid - ask) / (bid + ask)`, zero for an empty book
    pub book_imbalance: f64,
}

impl Statistics {
    /// Recompute from scratch
    #[must_use]
    pub fn compute<'a>(
        order_book: &[OrderLevel],
        trades: impl IntoIterator<Item = &'a Trade>,
        liquidity: &[LiquidityLevel],
    ) -> Self {
        let total_bid_volume = order_book
            .iter()
            .fold(0u64, |acc, level| acc.saturating_add(level.bid_size));
        let total_ask_volume = order_book
            .iter()
            .fold(0u64, |acc, level| acc.saturating_add(level.ask_size));

        let (cumulative_delta, large_order_count) =
            trades.into_iter().fold((0i64, 0usize), |(delta, large), trade| {
                (
                    delta.saturating_add(trade.signed_size()),
                    large + usize::from(trade.is_large),
                )
            });

        let iceberg_count = liquidity.iter().filter(|level| level.is_iceberg).count();

        Self {
            total_bid_volume,
            total_ask_volume,
            cumulative_delta,
            large_order_count,
            iceberg_count,
            book_imbalance: imbalance_ratio(total_bid_volume, total_ask_volume),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn imbalance_ratio(bid: u64, ask: u64) -> f64 {
    let total = bid as f64 + ask as f64;
    if total == 0.0 {
        0.0
    } else {
        (bid as f64 - ask as f64) / total
    }
}
