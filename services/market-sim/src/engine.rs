//! Synchronous engine core
//!
//! [`MarketEngine`] owns the configuration, the random source and the live
//! simulation state. Every state transition goes through [`MarketEngine::initialize`],
//! [`MarketEngine::tick`] or [`MarketEngine::configure`]; consumers only ever see
//! immutable [`EngineSnapshot`]s.
//!
//! A tick is transactional: the next state is built on a scratch copy and only
//! committed once every generator has succeeded.

use crate::aggregators::{
    Candle, CandleAggregator, CandleUpdate, FootprintProfile, FootprintRow, Statistics,
    backfill_candles, build_footprint,
};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::generators::{
    LiquidityLevel, OrderLevel, PricePath, Trade, TradeGenerator, TradeTape, build_levels,
    build_liquidity_levels,
};
use crate::random::{RandomSource, SeededRandom};
use serde::{Deserialize, Serialize};
use services_common::{ConfigError, GenerationError};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Connectivity as shown to consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Timer-driven ticks are flowing
    Live,
    /// Initialized but the timer is stopped
    Paused,
    /// Not initialized, or disposed
    Disconnected,
}

/// Complete, consistent engine state as of the last committed tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Instrument
    pub symbol: String,
    /// Bumped once per committed state change
    pub version: u64,
    /// Time of the last committed tick
    pub timestamp_ms: i64,
    /// Current mid-price
    pub mid_price: f64,
    /// Closed candles followed by the open one
    pub candles: Vec<Candle>,
    /// Depth ladder, descending by price
    pub order_book: Vec<OrderLevel>,
    /// Tape, newest first
    pub trades: Vec<Trade>,
    /// Resting liquidity, descending by price
    pub liquidity: Vec<LiquidityLevel>,
    /// Footprint rows, descending by price
    pub footprint: Vec<FootprintRow>,
    /// POC and value area over the footprint
    pub profile: Option<FootprintProfile>,
    /// Connectivity
    pub status: ConnectionStatus,
    /// Whether the timer is running
    pub is_live: bool,
    /// Rollups over this snapshot
    pub statistics: Statistics,
}

impl EngineSnapshot {
    /// Snapshot with no market data
    #[must_use]
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            version: 0,
            timestamp_ms: 0,
            mid_price: 0.0,
            candles: Vec::new(),
            order_book: Vec::new(),
            trades: Vec::new(),
            liquidity: Vec::new(),
            footprint: Vec::new(),
            profile: None,
            status: ConnectionStatus::Disconnected,
            is_live: false,
            statistics: Statistics::default(),
        }
    }

    /// The in-progress candle
    #[must_use]
    pub fn open_candle(&self) -> Option<&Candle> {
        self.candles.last()
    }
}

/// Mutable simulation state. Cloned as the scratch copy of a tick.
#[derive(Debug, Clone)]
struct SimState {
    mid_price: f64,
    candles: CandleAggregator,
    order_book: Vec<OrderLevel>,
    footprint: Vec<FootprintRow>,
    profile: Option<FootprintProfile>,
    tape: TradeTape,
    trade_ids: TradeGenerator,
    liquidity: Vec<LiquidityLevel>,
    tick_count: u64,
    last_ms: i64,
}

impl SimState {
    /// Seed history, book, footprint and liquidity around the initial price
    fn seed(
        config: &EngineConfig,
        path: &PricePath,
        rng: &mut dyn RandomSource,
        now_ms: i64,
    ) -> Result<Self, GenerationError> {
        let mid = config.initial_price;
        let mut candles =
            CandleAggregator::new(config.candle_duration_ms, config.max_candle_history);

        let anchor = candles.bucket_start(now_ms);
        let history = backfill_candles(
            anchor,
            candles.bucket_ms(),
            config.history_seed_count,
            mid,
            path,
            rng,
        )?;
        candles.seed_history(history);
        candles.anchor(now_ms, mid);

        let order_book = build_levels(mid, config.depth_levels, config.tick_size, now_ms, rng)?;
        let footprint = build_footprint(mid, config.footprint_levels, config.tick_size, rng)?;
        let liquidity = build_liquidity_levels(mid, &config.liquidity, now_ms, rng)?;

        Ok(Self {
            mid_price: mid,
            candles,
            profile: FootprintProfile::from_rows(&footprint, config.value_area_pct),
            order_book,
            footprint,
            tape: TradeTape::new(config.max_trades),
            trade_ids: TradeGenerator::new(),
            liquidity,
            tick_count: 0,
            last_ms: now_ms,
        })
    }

    /// Run every generator in order: price, candle, book and footprint,
    /// trade, then liquidity when the refresh policy fires.
    fn advance(
        &mut self,
        config: &EngineConfig,
        path: &PricePath,
        rng: &mut dyn RandomSource,
        now_ms: i64,
    ) -> Result<CandleUpdate, GenerationError> {
        self.tick_count += 1;

        let mid = path.next_price(self.mid_price, rng)?;
        self.mid_price = mid;

        let update = self.candles.update(now_ms, mid, rng)?;

        self.order_book = build_levels(mid, config.depth_levels, config.tick_size, now_ms, rng)?;
        self.footprint = build_footprint(mid, config.footprint_levels, config.tick_size, rng)?;
        self.profile = FootprintProfile::from_rows(&self.footprint, config.value_area_pct);

        let trade = self
            .trade_ids
            .next_trade(mid, config.large_order_threshold, now_ms, rng)?;
        self.tape.push(trade);

        if config.liquidity_refresh.should_refresh(self.tick_count, rng)? {
            self.liquidity = build_liquidity_levels(mid, &config.liquidity, now_ms, rng)?;
        }

        self.last_ms = now_ms;
        Ok(update)
    }

    fn to_snapshot(&self, symbol: &str, version: u64, status: ConnectionStatus) -> EngineSnapshot {
        EngineSnapshot {
            symbol: symbol.to_string(),
            version,
            timestamp_ms: self.last_ms,
            mid_price: self.mid_price,
            candles: self.candles.series(),
            order_book: self.order_book.clone(),
            trades: self.tape.to_vec(),
            liquidity: self.liquidity.clone(),
            footprint: self.footprint.clone(),
            profile: self.profile.clone(),
            status,
            is_live: status == ConnectionStatus::Live,
            // Last step of the tick, after every generator has committed
            statistics: Statistics::compute(&self.order_book, &self.tape, &self.liquidity),
        }
    }
}

/// Single-instrument simulation engine
///
/// Not internally synchronized: two ticks must never run concurrently against
/// the same engine. [`crate::EngineController`] wraps it in a mutex.
pub struct MarketEngine {
    config: EngineConfig,
    path: PricePath,
    rng: Box<dyn RandomSource>,
    state: Option<SimState>,
    status: ConnectionStatus,
    version: u64,
    snapshot: Arc<EngineSnapshot>,
}

impl fmt::Debug for MarketEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarketEngine")
            .field("symbol", &self.config.symbol)
            .field("status", &self.status)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl MarketEngine {
    /// Create an engine. The engine is `Disconnected` until [`Self::initialize`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: EngineConfig, rng: Box<dyn RandomSource>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            path: PricePath::new(config.volatility),
            snapshot: Arc::new(EngineSnapshot::empty(config.symbol.clone())),
            config,
            rng,
            state: None,
            status: ConnectionStatus::Disconnected,
            version: 0,
        })
    }

    /// Create an engine drawing from `StdRng`, seeded by `config.seed` when set
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_seeded_random(config: EngineConfig) -> Result<Self, ConfigError> {
        let rng = SeededRandom::from_optional_seed(config.seed);
        Self::new(config, Box::new(rng))
    }

    /// Seed history and derived data for the initial price
    ///
    /// A running engine stays live; otherwise it becomes `Paused`.
    ///
    /// # Errors
    ///
    /// Returns an error if a generator fails. The engine is left unchanged.
    pub fn initialize(&mut self, now_ms: i64) -> Result<(), EngineError> {
        let state = SimState::seed(&self.config, &self.path, self.rng.as_mut(), now_ms)?;
        self.commit_initial(state, now_ms);
        Ok(())
    }

    /// Replace the configuration and reinitialize
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or seeding fails. The
    /// engine keeps its previous configuration and state in both cases.
    pub fn configure(&mut self, config: EngineConfig, now_ms: i64) -> Result<(), EngineError> {
        config.validate()?;
        let path = PricePath::new(config.volatility);
        let state = SimState::seed(&config, &path, self.rng.as_mut(), now_ms)?;

        info!(
            symbol = %config.symbol,
            depth_levels = config.depth_levels,
            candle_duration_ms = config.candle_duration_ms,
            "Engine reconfigured"
        );
        self.config = config;
        self.path = path;
        self.commit_initial(state, now_ms);
        Ok(())
    }

    fn commit_initial(&mut self, state: SimState, now_ms: i64) {
        if self.status == ConnectionStatus::Disconnected {
            self.status = ConnectionStatus::Paused;
        }
        info!(
            symbol = %self.config.symbol,
            now_ms,
            seeded_candles = state.candles.history_len(),
            mid_price = state.mid_price,
            "Engine initialized"
        );
        self.state = Some(state);
        self.version += 1;
        self.publish();
    }

    /// Advance one step at `now_ms` and publish the new snapshot
    ///
    /// Runs regardless of the live flag; the timer path is [`Self::on_timer`].
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized or a generator fails.
    /// The previous snapshot is retained on error.
    pub fn tick(&mut self, now_ms: i64) -> Result<Arc<EngineSnapshot>, GenerationError> {
        let current = self.state.as_ref().ok_or(GenerationError::NotInitialized)?;
        let mut next = current.clone();

        let update = next.advance(&self.config, &self.path, self.rng.as_mut(), now_ms)?;

        if let CandleUpdate::Rolled { closed } = &update {
            debug!(
                closed_ms = closed.start_ms,
                close = closed.close,
                volume = closed.volume,
                "Candle closed"
            );
        }

        self.state = Some(next);
        self.version += 1;
        self.publish();
        debug!(
            version = self.version,
            mid_price = self.snapshot.mid_price,
            now_ms,
            "Tick committed"
        );
        Ok(Arc::clone(&self.snapshot))
    }

    /// Scheduled-callback entry. Returns whether a tick was committed.
    ///
    /// No-op unless live. Generation errors are logged and swallowed so the
    /// loop survives; the previous snapshot stays published.
    pub fn on_timer(&mut self, now_ms: i64) -> bool {
        if self.status != ConnectionStatus::Live {
            debug!(now_ms, status = ?self.status, "Timer fired while not live, ignoring");
            return false;
        }
        match self.tick(now_ms) {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    error = %e,
                    now_ms,
                    version = self.version,
                    "Tick abandoned, keeping previous snapshot"
                );
                false
            }
        }
    }

    /// Go live. No-op when already live.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine has not been initialized.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.state.is_none() {
            return Err(GenerationError::NotInitialized.into());
        }
        if self.status != ConnectionStatus::Live {
            self.set_status(ConnectionStatus::Live);
            info!(symbol = %self.config.symbol, "Engine live");
        }
        Ok(())
    }

    /// Pause. State is kept; no-op unless live.
    pub fn stop(&mut self) {
        if self.status == ConnectionStatus::Live {
            self.set_status(ConnectionStatus::Paused);
            info!(symbol = %self.config.symbol, version = self.version, "Engine paused");
        }
    }

    /// Flip between live and paused. Returns the new live flag.
    ///
    /// # Errors
    ///
    /// Returns an error if going live on an uninitialized engine.
    pub fn toggle_live(&mut self) -> Result<bool, EngineError> {
        if self.is_live() {
            self.stop();
            Ok(false)
        } else {
            self.start()?;
            Ok(true)
        }
    }

    /// Drop all market state. The engine can be initialized again.
    pub fn dispose(&mut self) {
        self.state = None;
        self.status = ConnectionStatus::Disconnected;
        let mut empty = EngineSnapshot::empty(self.config.symbol.clone());
        empty.version = self.version;
        self.snapshot = Arc::new(empty);
        info!(symbol = %self.config.symbol, "Engine disposed");
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        self.status = status;
        let mut snapshot = (*self.snapshot).clone();
        snapshot.status = status;
        snapshot.is_live = status == ConnectionStatus::Live;
        self.snapshot = Arc::new(snapshot);
    }

    fn publish(&mut self) {
        if let Some(state) = &self.state {
            let snapshot = state.to_snapshot(&self.config.symbol, self.version, self.status);
            self.snapshot = Arc::new(snapshot);
        }
    }

    /// Latest committed snapshot
    #[must_use]
    pub fn snapshot(&self) -> Arc<EngineSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Rollups of the latest snapshot
    #[must_use]
    pub fn statistics(&self) -> Statistics {
        self.snapshot.statistics.clone()
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current connectivity
    #[must_use]
    pub const fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Whether timer ticks are accepted
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.status == ConnectionStatus::Live
    }

    /// Whether [`Self::initialize`] has committed
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Version of the latest snapshot
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Ticks committed since the last initialize
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.state.as_ref().map_or(0, |state| state.tick_count)
    }
}
