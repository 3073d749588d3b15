//! Async driver around [`MarketEngine`]
//!
//! The engine sits behind a mutex that serves as the tick critical section.
//! A `tokio` interval task calls [`MarketEngine::on_timer`] and publishes each
//! committed snapshot on a `watch` channel and to registered callbacks.
//! The engine lock is never held across an `.await`.
//!
//! Every committer takes a publish ticket while still holding the engine
//! lock. Tickets therefore follow commit order, and a publish carrying an
//! older ticket than the last one delivered is dropped, so subscribers never
//! regress to an earlier snapshot or status.

use crate::config::EngineConfig;
use crate::engine::{ConnectionStatus, EngineSnapshot, MarketEngine};
use crate::error::{EngineError, Result};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Source of `now` in epoch milliseconds
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

type UpdateCallback = Box<dyn Fn(&EngineSnapshot) + Send + Sync>;

/// Wall clock
#[must_use]
pub fn system_clock() -> Clock {
    Arc::new(|| Utc::now().timestamp_millis())
}

/// Position of a snapshot in commit order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Ticket(u64);

/// Fan-out of committed snapshots
struct Publisher {
    sender: watch::Sender<Arc<EngineSnapshot>>,
    callbacks: RwLock<Vec<UpdateCallback>>,
    issued: AtomicU64,
    delivered: Mutex<Ticket>,
}

impl Publisher {
    fn new(initial: Arc<EngineSnapshot>) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender,
            callbacks: RwLock::new(Vec::new()),
            issued: AtomicU64::new(0),
            delivered: Mutex::new(Ticket(0)),
        }
    }

    /// Must be called with the engine lock held
    fn ticket(&self) -> Ticket {
        Ticket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Deliver `snapshot` unless a later commit already went out
    fn publish(&self, ticket: Ticket, snapshot: Arc<EngineSnapshot>) -> bool {
        let mut delivered = self.delivered.lock();
        if ticket <= *delivered {
            debug!(version = snapshot.version, "Dropping superseded snapshot");
            return false;
        }
        *delivered = ticket;
        self.sender.send_replace(Arc::clone(&snapshot));
        for callback in self.callbacks.read().iter() {
            callback(&snapshot);
        }
        true
    }
}

/// Drives an engine on a timer and notifies subscribers
pub struct EngineController {
    engine: Arc<Mutex<MarketEngine>>,
    publisher: Arc<Publisher>,
    clock: Clock,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for EngineController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let running = self.is_running();
        f.debug_struct("EngineController")
            .field("engine", &*self.engine.lock())
            .field("running", &running)
            .finish_non_exhaustive()
    }
}

impl EngineController {
    /// Wrap an engine using the wall clock
    ///
    /// # Errors
    ///
    /// Returns an error if the engine needs initializing and seeding fails.
    pub fn new(engine: MarketEngine) -> Result<Self> {
        Self::with_clock(engine, system_clock())
    }

    /// Wrap an engine with an injected clock, initializing it if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the engine needs initializing and seeding fails.
    pub fn with_clock(mut engine: MarketEngine, clock: Clock) -> Result<Self> {
        if !engine.is_initialized() {
            engine.initialize(clock())?;
        }
        let publisher = Publisher::new(engine.snapshot());
        Ok(Self {
            engine: Arc::new(Mutex::new(engine)),
            publisher: Arc::new(publisher),
            clock,
            task: Mutex::new(None),
        })
    }

    /// Build a seeded engine from `config` and wrap it
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or seeding fails.
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        Self::new(MarketEngine::with_seeded_random(config)?)
    }

    /// Spawn the interval loop on the current runtime. No-op when running.
    ///
    /// # Errors
    ///
    /// Returns an error outside a `tokio` runtime or if the engine is not
    /// initialized.
    pub fn start(&self) -> Result<()> {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| EngineError::Runtime(e.to_string()))?;

        let (period, ticket, snapshot) = {
            let mut engine = self.engine.lock();
            engine.start()?;
            (
                engine.config().update_interval(),
                self.publisher.ticket(),
                engine.snapshot(),
            )
        };

        *task = Some(runtime.spawn(run_loop(
            Arc::clone(&self.engine),
            Arc::clone(&self.publisher),
            Arc::clone(&self.clock),
            period,
        )));
        drop(task);
        info!(interval_ms = period.as_millis(), "Update loop started");

        self.publisher.publish(ticket, snapshot);
        Ok(())
    }

    /// Cancel the loop immediately and pause the engine. Idempotent.
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            info!("Update loop stopped");
        }

        let changed = {
            let mut engine = self.engine.lock();
            let was_live = engine.is_live();
            engine.stop();
            was_live.then(|| (self.publisher.ticket(), engine.snapshot()))
        };
        if let Some((ticket, snapshot)) = changed {
            self.publisher.publish(ticket, snapshot);
        }
    }

    /// Flip the loop. Returns whether it is now live.
    ///
    /// # Errors
    ///
    /// Returns an error if the loop cannot be started.
    pub fn toggle_live(&self) -> Result<bool> {
        if self.is_live() {
            self.stop();
            Ok(false)
        } else {
            self.start()?;
            Ok(true)
        }
    }

    /// Replace the configuration and reinitialize, restarting the loop if it
    /// was live
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or seeding fails. The
    /// previous state is kept in that case and a live loop is restarted.
    ///
    /// Returns [`EngineError::Restart`] if the new configuration was applied
    /// but the loop could not be restarted. The engine is then paused on the
    /// new state.
    pub fn configure(&self, config: EngineConfig) -> Result<()> {
        config.validate()?;
        let was_live = self.is_live();
        self.stop();

        let applied = {
            let mut engine = self.engine.lock();
            engine
                .configure(config, (self.clock)())
                .map(|()| (self.publisher.ticket(), engine.snapshot()))
        };
        let applied = applied.map(|(ticket, snapshot)| {
            self.publisher.publish(ticket, snapshot);
        });

        if was_live {
            match (&applied, self.start()) {
                (Ok(()), Err(e)) => {
                    warn!(error = %e, "Configuration applied but loop not restarted");
                    return Err(EngineError::Restart(e.to_string()));
                }
                (Err(_), Err(e)) => {
                    warn!(error = %e, "Failed to resume loop after rejected configuration");
                }
                _ => {}
            }
        }
        applied
    }

    /// Run one tick immediately at the clock's `now`, regardless of the loop
    ///
    /// # Errors
    ///
    /// Returns an error if the tick is abandoned.
    pub fn tick_now(&self) -> Result<Arc<EngineSnapshot>> {
        let (ticket, snapshot) = {
            let mut engine = self.engine.lock();
            let snapshot = engine.tick((self.clock)())?;
            (self.publisher.ticket(), snapshot)
        };
        self.publisher.publish(ticket, Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Stop the loop and drop all market state
    pub fn dispose(&self) {
        self.stop();
        let (ticket, snapshot) = {
            let mut engine = self.engine.lock();
            engine.dispose();
            (self.publisher.ticket(), engine.snapshot())
        };
        self.publisher.publish(ticket, snapshot);
    }

    /// Latest committed snapshot
    #[must_use]
    pub fn get_snapshot(&self) -> Arc<EngineSnapshot> {
        self.engine.lock().snapshot()
    }

    /// Receiver that sees every published snapshot
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<EngineSnapshot>> {
        self.publisher.sender.subscribe()
    }

    /// Register a callback run after every publish, outside the engine lock
    ///
    /// Callbacks run in commit order and may read the controller, but must
    /// not tick, start, stop, configure or dispose it.
    pub fn on_update(&self, callback: impl Fn(&EngineSnapshot) + Send + Sync + 'static) {
        self.publisher.callbacks.write().push(Box::new(callback));
    }

    /// Whether the engine accepts timer ticks
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.engine.lock().is_live()
    }

    /// Current connectivity
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.engine.lock().status()
    }

    /// Whether the loop task is alive
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for EngineController {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}

async fn run_loop(
    engine: Arc<Mutex<MarketEngine>>,
    publisher: Arc<Publisher>,
    clock: Clock,
    period: Duration,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // First tick completes immediately
    interval.tick().await;

    loop {
        interval.tick().await;
        let now_ms = clock();

        let committed = {
            let mut engine = engine.lock();
            engine
                .on_timer(now_ms)
                .then(|| (publisher.ticket(), engine.snapshot()))
        };

        match committed {
            Some((ticket, snapshot)) => {
                publisher.publish(ticket, snapshot);
            }
            None => debug!(now_ms, "No snapshot published this interval"),
        }
    }
}
