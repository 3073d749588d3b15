//! Trade prints and the bounded tape

use crate::random::RandomSource;
use serde::{Deserialize, Serialize};
use services_common::GenerationError;
use services_common::constants::tape::{TRADE_MAX_SIZE, TRADE_MIN_SIZE, TRADE_PRICE_SPREAD};
use std::collections::VecDeque;

/// Aggressor side of a print
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buyer lifted the offer
    Buy,
    /// Seller hit the bid
    Sell,
}

impl Side {
    /// +1 for buys, -1 for sells
    #[must_use]
    pub const fn sign(self) -> i64 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }
}

/// One print on the tape. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Sequence id, unique per engine
    pub id: u64,
    /// Print price
    pub price: f64,
    /// Print size, always positive
    pub size: u64,
    /// Aggressor side
    pub side: Side,
    /// Print time
    pub timestamp_ms: i64,
    /// `size > large_order_threshold`
    pub is_large: bool,
}

impl Trade {
    /// Print flagged against `large_order_threshold`
    #[must_use]
    pub const fn new(
        id: u64,
        price: f64,
        size: u64,
        side: Side,
        timestamp_ms: i64,
        large_order_threshold: u64,
    ) -> Self {
        Self {
            id,
            price,
            size,
            side,
            timestamp_ms,
            is_large: size > large_order_threshold,
        }
    }

    /// Size signed by side
    #[must_use]
    pub fn signed_size(&self) -> i64 {
        i64::try_from(self.size).unwrap_or(i64::MAX) * self.side.sign()
    }
}

/// Produces prints around the mid-price
#[derive(Debug, Clone)]
pub struct TradeGenerator {
    next_id: u64,
}

impl Default for TradeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TradeGenerator {
    /// Generator starting at id 1
    #[must_use]
    pub const fn new() -> Self {
        Self { next_id: 1 }
    }

    /// Id the next print will carry
    #[must_use]
    pub const fn peek_id(&self) -> u64 {
        self.next_id
    }

    /// Draw one print
    ///
    /// # Errors
    ///
    /// Returns an error if the print price is not finite or the random source
    /// misbehaves.
    pub fn next_trade(
        &mut self,
        mid_price: f64,
        large_order_threshold: u64,
        now_ms: i64,
        rng: &mut dyn RandomSource,
    ) -> Result<Trade, GenerationError> {
        let offset = rng.centered(TRADE_PRICE_SPREAD)?;
        let price = GenerationError::check_finite("trade price", mid_price + offset)?;
        let size = rng.uniform_u64(TRADE_MIN_SIZE, TRADE_MAX_SIZE)?;
        let side = if rng.chance(0.5)? { Side::Buy } else { Side::Sell };

        let id = self.next_id;
        self.next_id += 1;

        Ok(Trade::new(id, price, size, side, now_ms, large_order_threshold))
    }
}

/// Newest-first tape with FIFO eviction
#[derive(Debug, Clone)]
pub struct TradeTape {
    trades: VecDeque<Trade>,
    capacity: usize,
}

impl TradeTape {
    /// Empty tape holding at most `capacity` prints
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            trades: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepend a print, evicting the oldest beyond capacity
    pub fn push(&mut self, trade: Trade) {
        self.trades.push_front(trade);
        self.trades.truncate(self.capacity);
    }

    /// Prints, newest first
    pub fn iter(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter()
    }

    /// Most recent print
    #[must_use]
    pub fn latest(&self) -> Option<&Trade> {
        self.trades.front()
    }

    /// Number of retained prints
    #[must_use]
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    /// No prints retained
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Retention cap
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Owned copy, newest first
    #[must_use]
    pub fn to_vec(&self) -> Vec<Trade> {
        self.trades.iter().cloned().collect()
    }
}

impl<'a> IntoIterator for &'a TradeTape {
    type Item = &'a Trade;
    type IntoIter = std::collections::vec_deque::Iter<'a, Trade>;

    fn into_iter(self) -> Self::IntoIter {
        self.trades.iter()
    }
}
