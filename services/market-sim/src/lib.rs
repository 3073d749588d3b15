//! Market Simulation Service
//!
//! Produces a self-consistent, continuously updating stream of synthetic
//! market state for a single instrument:
//! - Mid-price random walk
//! - OHLCV candles with bucket rollover
//! - Order book depth ladder
//! - Trade tape
//! - Resting liquidity with iceberg flags
//! - Footprint rows and volume profile
//! - Rollup statistics

pub mod aggregators;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod generators;
pub mod random;

pub use aggregators::{
    Candle, CandleAggregator, CandleUpdate, FootprintProfile, FootprintRow, Imbalance, Statistics,
};
pub use config::EngineConfig;
pub use controller::{Clock, EngineController, system_clock};
pub use engine::{ConnectionStatus, EngineSnapshot, MarketEngine};
pub use error::EngineError;
pub use generators::{
    LiquidityLevel, LiquidityParams, LiquiditySide, OrderLevel, PricePath, RefreshPolicy, Side,
    Trade, TradeGenerator, TradeTape,
};
pub use random::{RandomSource, SeededRandom};
pub use services_common::{ConfigError, GenerationError};
