//! Per-tick synthetic market generators

pub mod book;
pub mod liquidity;
pub mod price;
pub mod tape;

pub use book::{OrderLevel, build_levels};
pub use liquidity::{
    LiquidityLevel, LiquidityParams, LiquiditySide, RefreshPolicy, build_liquidity_levels,
};
pub use price::PricePath;
pub use tape::{Side, Trade, TradeGenerator, TradeTape};
