//! Common constants used across the simulation services
//!
//! Single source of truth for default magic numbers

// Time constants
pub const MILLIS_PER_SEC: i64 = 1000;
pub const SECS_PER_MIN: i64 = 60;
pub const MILLIS_PER_MIN: i64 = MILLIS_PER_SEC * SECS_PER_MIN;

/// Engine defaults
pub mod engine {
    /// Default timer interval between ticks
    pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 500;
    /// Default candle bucket width (one minute)
    pub const DEFAULT_CANDLE_DURATION_MS: i64 = super::MILLIS_PER_MIN;
    /// Default number of ladder rungs on each side of the mid-price
    pub const DEFAULT_DEPTH_LEVELS: usize = 20;
    /// Default price increment between ladder rungs
    pub const DEFAULT_TICK_SIZE: f64 = 0.25;
    /// Default size above which a print is flagged as large
    pub const DEFAULT_LARGE_ORDER_THRESHOLD: u64 = 50;
    /// Default starting mid-price
    pub const DEFAULT_INITIAL_PRICE: f64 = 100.0;
    /// Default half-width of the uniform price step
    pub const DEFAULT_VOLATILITY: f64 = 0.5;
    /// Lowest price the walk is allowed to reach
    pub const MIN_PRICE: f64 = 0.01;
    /// Default number of back-filled candles on initialize
    pub const DEFAULT_HISTORY_SEED_COUNT: usize = 50;
    /// Default closed-candle retention
    pub const DEFAULT_MAX_CANDLE_HISTORY: usize = 100;
    /// Default trade tape retention
    pub const DEFAULT_MAX_TRADES: usize = 200;
    /// Default number of footprint rungs on each side of the mid-price
    pub const DEFAULT_FOOTPRINT_LEVELS: usize = 15;
    /// Default value area share in percent
    pub const DEFAULT_VALUE_AREA_PCT: u8 = 70;
    /// Upper bound on ladder and footprint rungs per side
    pub const MAX_LEVELS: usize = 10_000;
    /// Upper bound on back-filled candles
    pub const MAX_HISTORY_SEED_COUNT: usize = 100_000;
    /// Upper bound on closed-candle and tape retention
    pub const MAX_RETAINED: usize = 1_000_000;
}

/// Synthetic order book shape
pub mod book {
    /// Mean rung size at the touch
    pub const BOOK_BASE_SIZE: f64 = 500.0;
    /// No rung is ever emptier than this
    pub const BOOK_MIN_SIZE: u64 = 10;
    /// Upper bound on the per-rung trade count
    pub const BOOK_MAX_TRADES: u64 = 50;
}

/// Synthetic trade prints
pub mod tape {
    /// Half-width of the print price around the mid
    pub const TRADE_PRICE_SPREAD: f64 = 0.5;
    /// Smallest print size
    pub const TRADE_MIN_SIZE: u64 = 1;
    /// Largest print size
    pub const TRADE_MAX_SIZE: u64 = 100;
}

/// Candle volume increments
pub mod candle {
    /// Smallest volume added by one in-bucket update
    pub const CANDLE_VOLUME_MIN: u64 = 10;
    /// Largest volume added by one in-bucket update
    pub const CANDLE_VOLUME_MAX: u64 = 1000;
    /// Largest wick drawn on back-filled candles, as a multiple of volatility
    pub const SEED_WICK_FACTOR: f64 = 0.5;
    /// Back-filled candles carry this many in-bucket updates worth of volume
    pub const SEED_VOLUME_FACTOR: u64 = 10;
    /// Fewest trades counted on a back-filled candle
    pub const SEED_TRADES_MIN: u64 = 1;
    /// Most trades counted on a back-filled candle
    pub const SEED_TRADES_MAX: u64 = 100;
}

/// Resting liquidity and icebergs
pub mod liquidity {
    /// Default number of resting levels
    pub const DEFAULT_LIQUIDITY_LEVELS: usize = 20;
    /// Default furthest distance from the mid
    pub const DEFAULT_MAX_OFFSET: f64 = 5.0;
    /// Default smallest resting size
    pub const DEFAULT_MIN_SIZE: u64 = 100;
    /// Default largest resting size
    pub const DEFAULT_MAX_SIZE: u64 = 5000;
    /// Sizes above this are iceberg candidates
    pub const DEFAULT_ICEBERG_SIZE_THRESHOLD: u64 = 4000;
    /// Odds that a candidate is actually flagged
    pub const DEFAULT_ICEBERG_PROBABILITY: f64 = 0.3;
    /// Default share of ticks that rebuild the liquidity map
    pub const DEFAULT_REFRESH_PROBABILITY: f64 = 0.1;
}

/// Footprint volumes
pub mod footprint {
    /// Largest bid or ask volume at one footprint rung
    pub const FOOTPRINT_MAX_VOLUME: u64 = 1000;
    /// Largest trade count at one footprint rung
    pub const FOOTPRINT_MAX_TRADES: u64 = 100;
    /// Dominance ratio for the imbalance classification
    pub const IMBALANCE_RATIO: u64 = 2;
}
