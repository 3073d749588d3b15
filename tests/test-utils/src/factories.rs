//! Factory patterns for generating test data

use market_sim::{LiquidityLevel, LiquiditySide, OrderLevel, Side, Trade};

/// Factory for trades with sequential ids
#[derive(Debug, Clone)]
pub struct TradeFactory {
    next_id: u64,
    price: f64,
    large_order_threshold: u64,
    timestamp_ms: i64,
}

impl Default for TradeFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl TradeFactory {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            price: 100.0,
            large_order_threshold: 50,
            timestamp_ms: 0,
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.large_order_threshold = threshold;
        self
    }

    pub fn build(&mut self, size: u64, side: Side) -> Trade {
        let trade = Trade::new(
            self.next_id,
            self.price,
            size,
            side,
            self.timestamp_ms,
            self.large_order_threshold,
        );
        self.next_id += 1;
        self.timestamp_ms += 1;
        trade
    }

    /// `count` identical prints
    pub fn build_many(&mut self, count: usize, size: u64, side: Side) -> Vec<Trade> {
        (0..count).map(|_| self.build(size, side)).collect()
    }
}

/// Ladder from `(price, bid, ask)` triples
pub fn book_from(rows: &[(f64, u64, u64)]) -> Vec<OrderLevel> {
    rows.iter()
        .map(|&(price, bid, ask)| OrderLevel::new(price, bid, ask, 0, 0))
        .collect()
}

/// Resting level with the side inferred from `mid`
pub fn liquidity_level(price: f64, size: u64, mid: f64, is_iceberg: bool) -> LiquidityLevel {
    LiquidityLevel {
        price,
        size,
        side: if price < mid {
            LiquiditySide::Bid
        } else {
            LiquiditySide::Ask
        },
        is_iceberg,
        timestamp_ms: 0,
    }
}
