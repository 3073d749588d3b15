//! Candle aggregator implementation
//!
//! Folds mid-price samples into fixed-width OHLCV buckets. Exactly one candle
//! is open at a time; it rolls into the bounded history the instant a sample
//! lands in a later bucket.

use crate::generators::PricePath;
use crate::generators::book::signed_difference;
use crate::random::RandomSource;
use serde::{Deserialize, Serialize};
use services_common::GenerationError;
use services_common::constants::candle::{
    CANDLE_VOLUME_MAX, CANDLE_VOLUME_MIN, SEED_TRADES_MAX, SEED_TRADES_MIN, SEED_VOLUME_FACTOR,
    SEED_WICK_FACTOR,
};
use std::collections::VecDeque;
use tracing::{trace, warn};

/// OHLCV bar for one bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket start, aligned to the bucket width
    pub start_ms: i64,
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Volume
    pub volume: u64,
    /// Buy volume
    pub buy_volume: u64,
    /// Sell volume
    pub sell_volume: u64,
    /// `buy_volume - sell_volume`
    pub delta: i64,
    /// Number of updates folded in
    pub trades: u32,
}

impl Candle {
    /// Flat candle with no volume
    #[must_use]
    pub const fn open_at(start_ms: i64, price: f64) -> Self {
        Self {
            start_ms,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 0,
            buy_volume: 0,
            sell_volume: 0,
            delta: 0,
            trades: 0,
        }
    }

    /// Fold one sample with its buy/sell split
    pub fn apply(&mut self, price: f64, buy_volume: u64, sell_volume: u64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;

        self.buy_volume += buy_volume;
        self.sell_volume += sell_volume;
        self.volume = self.buy_volume + self.sell_volume;
        self.delta = signed_difference(self.buy_volume, self.sell_volume);
        self.trades += 1;

        debug_assert!(self.is_consistent(), "candle invariant broken: {self:?}");
    }

    /// OHLC ordering and volume conservation hold
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.low <= self.open
            && self.open <= self.high
            && self.low <= self.close
            && self.close <= self.high
            && self.buy_volume + self.sell_volume == self.volume
            && self.delta == signed_difference(self.buy_volume, self.sell_volume)
    }
}

/// What a sample did to the candle series
#[derive(Debug, Clone, PartialEq)]
pub enum CandleUpdate {
    /// First candle opened
    Opened,
    /// Open candle mutated in place
    Updated,
    /// Previous candle closed and a fresh one opened
    Rolled {
        /// The candle that just closed
        closed: Candle,
    },
}

/// Random buy/sell split of `volume`
fn split_volume(volume: u64, rng: &mut dyn RandomSource) -> Result<(u64, u64), GenerationError> {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let buy = ((volume as f64) * rng.draw()?) as u64;
    let buy = buy.min(volume);
    Ok((buy, volume - buy))
}

/// Single-series candle aggregator
#[derive(Debug, Clone)]
pub struct CandleAggregator {
    bucket_ms: i64,
    max_history: usize,
    history: VecDeque<Candle>,
    open: Option<Candle>,
}

impl CandleAggregator {
    /// Aggregator with `bucket_ms`-wide buckets retaining `max_history` closed candles
    #[must_use]
    pub fn new(bucket_ms: i64, max_history: usize) -> Self {
        Self {
            bucket_ms: bucket_ms.max(1),
            max_history,
            history: VecDeque::with_capacity(max_history),
            open: None,
        }
    }

    /// Bucket width
    #[must_use]
    pub const fn bucket_ms(&self) -> i64 {
        self.bucket_ms
    }

    /// `floor(now / bucket) * bucket`, aligning negative times downward
    #[must_use]
    pub const fn bucket_start(&self, now_ms: i64) -> i64 {
        now_ms.div_euclid(self.bucket_ms) * self.bucket_ms
    }

    /// Closed candles, oldest first
    pub fn history(&self) -> impl Iterator<Item = &Candle> {
        self.history.iter()
    }

    /// Number of closed candles
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// The in-progress candle
    #[must_use]
    pub const fn open_candle(&self) -> Option<&Candle> {
        self.open.as_ref()
    }

    /// History followed by the open candle
    #[must_use]
    pub fn series(&self) -> Vec<Candle> {
        self.history.iter().chain(self.open.iter()).cloned().collect()
    }

    /// Drop all candles
    pub fn clear(&mut self) {
        self.history.clear();
        self.open = None;
    }

    fn push_closed(&mut self, candle: Candle) {
        debug_assert!(
            self.history
                .back()
                .is_none_or(|last| last.start_ms < candle.start_ms),
            "closed candles must be strictly increasing"
        );
        self.history.push_back(candle);
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }
    }

    /// Append already-closed candles, oldest first
    pub fn seed_history(&mut self, candles: impl IntoIterator<Item = Candle>) {
        for candle in candles {
            self.push_closed(candle);
        }
    }

    /// Open a flat candle for the bucket containing `now_ms`
    pub fn anchor(&mut self, now_ms: i64, price: f64) {
        let start = self.bucket_start(now_ms);
        if let Some(open) = self.open.take() {
            if open.start_ms < start {
                self.push_closed(open);
            } else {
                self.open = Some(open);
                return;
            }
        }
        self.open = Some(Candle::open_at(start, price));
    }

    /// Fold one sample taken at `now_ms`
    ///
    /// A sample older than the open candle's bucket is folded into the open
    /// candle so closed buckets stay strictly increasing.
    ///
    /// # Errors
    ///
    /// Returns an error if `price` is not finite or the random source
    /// misbehaves. The aggregator is untouched on error.
    pub fn update(
        &mut self,
        now_ms: i64,
        price: f64,
        rng: &mut dyn RandomSource,
    ) -> Result<CandleUpdate, GenerationError> {
        let price = GenerationError::check_finite("candle price", price)?;
        let start = self.bucket_start(now_ms);

        match self.open.take() {
            None => {
                self.open = Some(Candle::open_at(start, price));
                trace!(start_ms = start, price, "Opened first candle");
                Ok(CandleUpdate::Opened)
            }
            Some(open) if start > open.start_ms => {
                let closed = open.clone();
                self.push_closed(open);
                self.open = Some(Candle::open_at(start, price));
                trace!(
                    closed_ms = closed.start_ms,
                    start_ms = start,
                    "Rolled candle"
                );
                Ok(CandleUpdate::Rolled { closed })
            }
            Some(mut open) => {
                if start < open.start_ms {
                    warn!(
                        now_ms,
                        open_ms = open.start_ms,
                        "Sample older than open candle, folding into it"
                    );
                }
                let drawn = rng
                    .uniform_u64(CANDLE_VOLUME_MIN, CANDLE_VOLUME_MAX)
                    .and_then(|volume| split_volume(volume, rng));
                match drawn {
                    Ok((buy, sell)) => {
                        open.apply(price, buy, sell);
                        self.open = Some(open);
                        Ok(CandleUpdate::Updated)
                    }
                    Err(e) => {
                        self.open = Some(open);
                        Err(e)
                    }
                }
            }
        }
    }
}

/// Back-fill `count` closed candles ending just before `anchor_start_ms`,
/// walking the price backward from `price`. Returned oldest first; the newest
/// one closes at `price`.
///
/// # Errors
///
/// Returns an error if the walk produces a non-finite price or the random
/// source misbehaves.
pub fn backfill_candles(
    anchor_start_ms: i64,
    bucket_ms: i64,
    count: usize,
    price: f64,
    path: &PricePath,
    rng: &mut dyn RandomSource,
) -> Result<Vec<Candle>, GenerationError> {
    let mut candles = Vec::with_capacity(count);
    let mut close = GenerationError::check_finite("seed price", price)?;
    let wick = path.volatility() * SEED_WICK_FACTOR;

    for k in 1..=count {
        let k = i64::try_from(k).unwrap_or(i64::MAX);
        let start_ms = anchor_start_ms.saturating_sub(k.saturating_mul(bucket_ms));
        let open = path.next_price(close, rng)?;
        let high = open.max(close) + rng.uniform(0.0, wick)?;
        let low = (open.min(close) - rng.uniform(0.0, wick)?).max(path.floor());

        let volume = rng.uniform_u64(
            CANDLE_VOLUME_MIN * SEED_VOLUME_FACTOR,
            CANDLE_VOLUME_MAX * SEED_VOLUME_FACTOR,
        )?;
        let (buy_volume, sell_volume) = split_volume(volume, rng)?;
        let trades = rng.uniform_u64(SEED_TRADES_MIN, SEED_TRADES_MAX)?;
        let trades = u32::try_from(trades).unwrap_or(u32::MAX);

        let candle = Candle {
            start_ms,
            open,
            high,
            low: low.min(open.min(close)),
            close,
            volume,
            buy_volume,
            sell_volume,
            delta: signed_difference(buy_volume, sell_volume),
            trades,
        };
        debug_assert!(candle.is_consistent(), "seeded candle broken: {candle:?}");
        candles.push(candle);
        close = open;
    }

    candles.reverse();
    Ok(candles)
}
