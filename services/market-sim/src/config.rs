//! Engine configuration

use crate::generators::{LiquidityParams, RefreshPolicy};
use serde::{Deserialize, Serialize};
use services_common::ConfigError;
use services_common::constants::engine::{
    DEFAULT_CANDLE_DURATION_MS, DEFAULT_DEPTH_LEVELS, DEFAULT_FOOTPRINT_LEVELS,
    DEFAULT_HISTORY_SEED_COUNT, DEFAULT_INITIAL_PRICE, DEFAULT_LARGE_ORDER_THRESHOLD,
    DEFAULT_MAX_CANDLE_HISTORY, DEFAULT_MAX_TRADES, DEFAULT_TICK_SIZE,
    DEFAULT_UPDATE_INTERVAL_MS, DEFAULT_VALUE_AREA_PCT, DEFAULT_VOLATILITY,
    MAX_HISTORY_SEED_COUNT, MAX_LEVELS, MAX_RETAINED,
};
use std::path::Path;
use std::time::Duration;

/// Environment prefix for overrides, e.g. `MARKET_SIM__DEPTH_LEVELS=10`
pub const ENV_PREFIX: &str = "MARKET_SIM";

/// Engine configuration. Fixed for the lifetime of one initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Instrument shown by the dashboard
    pub symbol: String,

    /// Timer interval between ticks
    pub update_interval_ms: u64,

    /// Candle bucket width
    pub candle_duration_ms: i64,

    /// Ladder rungs on each side of the mid
    pub depth_levels: usize,

    /// Price increment between rungs
    pub tick_size: f64,

    /// Prints above this size are large
    pub large_order_threshold: u64,

    /// Starting mid-price
    pub initial_price: f64,

    /// Half-width of the uniform price step
    pub volatility: f64,

    /// Candles back-filled on initialize
    pub history_seed_count: usize,

    /// Closed candles retained
    pub max_candle_history: usize,

    /// Prints retained on the tape
    pub max_trades: usize,

    /// Footprint rungs on each side of the mid
    pub footprint_levels: usize,

    /// Value area share in percent
    pub value_area_pct: u8,

    /// Liquidity map shape
    pub liquidity: LiquidityParams,

    /// Liquidity map rebuild cadence
    pub liquidity_refresh: RefreshPolicy,

    /// Seed for a reproducible run
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbol: "SIM/USD".to_string(),
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            candle_duration_ms: DEFAULT_CANDLE_DURATION_MS,
            depth_levels: DEFAULT_DEPTH_LEVELS,
            tick_size: DEFAULT_TICK_SIZE,
            large_order_threshold: DEFAULT_LARGE_ORDER_THRESHOLD,
            initial_price: DEFAULT_INITIAL_PRICE,
            volatility: DEFAULT_VOLATILITY,
            history_seed_count: DEFAULT_HISTORY_SEED_COUNT,
            max_candle_history: DEFAULT_MAX_CANDLE_HISTORY,
            max_trades: DEFAULT_MAX_TRADES,
            footprint_levels: DEFAULT_FOOTPRINT_LEVELS,
            value_area_pct: DEFAULT_VALUE_AREA_PCT,
            liquidity: LiquidityParams::default(),
            liquidity_refresh: RefreshPolicy::default(),
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Load from an optional file, then apply `MARKET_SIM__*` environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or parsed, or the result
    /// fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would produce corrupted state
    ///
    /// # Errors
    ///
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.depth_levels == 0 {
            return Err(ConfigError::InvalidDepthLevels(self.depth_levels));
        }
        if self.update_interval_ms == 0 {
            return Err(ConfigError::InvalidInterval(self.update_interval_ms));
        }
        if self.candle_duration_ms <= 0 {
            return Err(ConfigError::InvalidCandleDuration(self.candle_duration_ms));
        }
        if !self.tick_size.is_finite() || self.tick_size <= 0.0 {
            return Err(ConfigError::InvalidTickSize(self.tick_size));
        }
        if !self.initial_price.is_finite() || self.initial_price <= 0.0 {
            return Err(ConfigError::InvalidInitialPrice(self.initial_price));
        }
        if !self.volatility.is_finite() || self.volatility < 0.0 {
            return Err(ConfigError::InvalidRange {
                name: "volatility",
                min: 0.0,
                max: self.volatility,
            });
        }
        if self.max_candle_history == 0 {
            return Err(ConfigError::InvalidCapacity {
                name: "max_candle_history",
                value: self.max_candle_history,
            });
        }
        if self.max_trades == 0 {
            return Err(ConfigError::InvalidCapacity {
                name: "max_trades",
                value: self.max_trades,
            });
        }
        self.check_limits()?;
        if self.value_area_pct > 100 {
            return Err(ConfigError::InvalidProbability {
                name: "value_area_pct",
                value: f64::from(self.value_area_pct) / 100.0,
            });
        }
        self.liquidity.validate()?;
        self.liquidity_refresh.validate()
    }

    fn check_limits(&self) -> Result<(), ConfigError> {
        let limits = [
            ("depth_levels", self.depth_levels, MAX_LEVELS),
            ("footprint_levels", self.footprint_levels, MAX_LEVELS),
            ("liquidity.count", self.liquidity.count, MAX_LEVELS),
            ("history_seed_count", self.history_seed_count, MAX_HISTORY_SEED_COUNT),
            ("max_candle_history", self.max_candle_history, MAX_RETAINED),
            ("max_trades", self.max_trades, MAX_RETAINED),
        ];
        match limits.into_iter().find(|&(_, value, max)| value > max) {
            Some((name, value, max)) => Err(ConfigError::LimitExceeded { name, value, max }),
            None => Ok(()),
        }
    }

    /// Timer interval as a `Duration`
    #[must_use]
    pub const fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }
}
