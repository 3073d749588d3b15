//! Interval loop, notification fan-out and cancellation with paused time

use market_sim::{ConnectionStatus, EngineConfig, EngineController};
use rstest::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use test_utils::{ManualClock, assert_snapshot_invariants, engine_config, engine_from};
use tokio::time::sleep;

const INTERVAL_MS: u64 = 500;

#[fixture]
fn clock() -> ManualClock {
    ManualClock::at(1_000_000)
}

fn controller_with(config: EngineConfig, clock: &ManualClock) -> EngineController {
    EngineController::with_clock(engine_from(config), clock.clock()).unwrap()
}

/// Advance paused time one interval at a time, moving the manual clock in step
async fn run_intervals(clock: &ManualClock, intervals: u64) {
    for _ in 0..intervals {
        clock.advance(INTERVAL_MS as i64);
        sleep(Duration::from_millis(INTERVAL_MS)).await;
    }
    // Let the loop task observe the last deadline
    sleep(Duration::from_millis(1)).await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_loop_publishes_each_interval(engine_config: EngineConfig, clock: ManualClock) {
    let controller = controller_with(engine_config.clone(), &clock);
    controller.start().unwrap();

    run_intervals(&clock, 4).await;

    let snapshot = controller.get_snapshot();
    assert_eq!(snapshot.trades.len(), 4);
    assert_eq!(snapshot.status, ConnectionStatus::Live);
    assert_snapshot_invariants(&snapshot, &engine_config);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_no_ticks_after_stop(engine_config: EngineConfig, clock: ManualClock) {
    let controller = controller_with(engine_config, &clock);
    controller.start().unwrap();
    run_intervals(&clock, 2).await;

    controller.stop();
    let frozen = controller.get_snapshot();
    run_intervals(&clock, 3).await;

    assert_eq!(*controller.get_snapshot(), *frozen);
    assert!(!controller.is_running());

    controller.stop();
    assert_eq!(*controller.get_snapshot(), *frozen);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_restart_resumes_from_snapshot(engine_config: EngineConfig, clock: ManualClock) {
    let controller = controller_with(engine_config, &clock);
    controller.start().unwrap();
    run_intervals(&clock, 2).await;
    controller.stop();

    assert!(controller.toggle_live().unwrap());
    run_intervals(&clock, 2).await;

    let snapshot = controller.get_snapshot();
    assert_eq!(snapshot.trades.len(), 4);
    let ids: Vec<u64> = snapshot.trades.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![4, 3, 2, 1]);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_watch_and_callbacks_see_every_tick(engine_config: EngineConfig, clock: ManualClock) {
    let controller = controller_with(engine_config, &clock);
    let mut updates = controller.subscribe();
    let last_seen = Arc::new(AtomicU64::new(0));
    let seen = Arc::clone(&last_seen);
    controller.on_update(move |snapshot| {
        seen.store(snapshot.version, Ordering::SeqCst);
    });

    let base = controller.get_snapshot().version;
    controller.start().unwrap();
    run_intervals(&clock, 3).await;

    assert!(updates.has_changed().unwrap());
    let latest = updates.borrow_and_update().clone();
    assert_eq!(latest.version, base + 3);
    assert_eq!(last_seen.load(Ordering::SeqCst), base + 3);
    assert_eq!(latest.timestamp_ms, clock.now());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_configure_while_live(engine_config: EngineConfig, clock: ManualClock) {
    let controller = controller_with(engine_config.clone(), &clock);
    controller.start().unwrap();
    run_intervals(&clock, 2).await;

    let config = EngineConfig {
        symbol: "RECONF".to_string(),
        depth_levels: 2,
        ..engine_config
    };
    controller.configure(config.clone()).unwrap();
    run_intervals(&clock, 1).await;

    let snapshot = controller.get_snapshot();
    assert_eq!(snapshot.symbol, "RECONF");
    assert_eq!(snapshot.trades.len(), 1);
    assert!(controller.is_live());
    assert_snapshot_invariants(&snapshot, &config);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_dispose_stops_everything(engine_config: EngineConfig, clock: ManualClock) {
    let controller = controller_with(engine_config, &clock);
    controller.start().unwrap();
    run_intervals(&clock, 1).await;

    controller.dispose();
    run_intervals(&clock, 2).await;

    assert_eq!(controller.status(), ConnectionStatus::Disconnected);
    assert!(controller.get_snapshot().trades.is_empty());
    assert!(controller.start().is_err());
}

#[rstest]
#[tokio::test]
async fn test_manual_tick_uses_injected_clock(engine_config: EngineConfig, clock: ManualClock) {
    let controller = controller_with(engine_config, &clock);
    clock.set(2_000_000);

    let snapshot = controller.tick_now().unwrap();

    assert_eq!(snapshot.timestamp_ms, 2_000_000);
    assert_eq!(controller.status(), ConnectionStatus::Paused);
}

#[rstest]
#[tokio::test]
async fn test_manual_ticks_follow_wall_clock_start(engine_config: EngineConfig) {
    let clock = ManualClock::starting_now();
    let controller = controller_with(engine_config.clone(), &clock);
    let first = controller.tick_now().unwrap();
    assert_eq!(first.timestamp_ms, clock.now());

    clock.advance(engine_config.candle_duration_ms);
    let second = controller.tick_now().unwrap();

    assert_eq!(second.timestamp_ms, clock.now());
    assert_eq!(second.candles.len(), first.candles.len() + 1);
    assert_eq!(controller.subscribe().borrow().version, second.version);
    assert_snapshot_invariants(&second, &engine_config);
}
