//! Aggregator implementations

pub mod candle;
pub mod footprint;
pub mod stats;

pub use candle::{Candle, CandleAggregator, CandleUpdate, backfill_candles};
pub use footprint::{FootprintProfile, FootprintRow, Imbalance, build_footprint};
pub use stats::Statistics;
