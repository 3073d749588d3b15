//! Custom assertions for testing

use market_sim::{Candle, EngineConfig, EngineSnapshot, Imbalance, Statistics};

/// Assert that two floating point values are approximately equal
pub fn assert_approx_eq(left: f64, right: f64, tolerance: f64) {
    let diff = (left - right).abs();
    assert!(
        diff <= tolerance,
        "Values not approximately equal: {} != {} (diff: {}, tolerance: {})",
        left,
        right,
        diff,
        tolerance
    );
}

/// Assert that prices are strictly descending
pub fn assert_descending(prices: impl IntoIterator<Item = f64>) {
    let prices: Vec<f64> = prices.into_iter().collect();
    for window in prices.windows(2) {
        assert!(
            window[0] > window[1],
            "Prices not strictly descending: {} then {}",
            window[0],
            window[1]
        );
    }
}

/// OHLC ordering and volume conservation on one candle
pub fn assert_candle_consistent(candle: &Candle) {
    assert!(
        candle.low <= candle.open && candle.open <= candle.high,
        "open outside range: {candle:?}"
    );
    assert!(
        candle.low <= candle.close && candle.close <= candle.high,
        "close outside range: {candle:?}"
    );
    assert_eq!(
        candle.buy_volume + candle.sell_volume,
        candle.volume,
        "volume not conserved: {candle:?}"
    );
    assert_eq!(
        candle.delta,
        candle.buy_volume as i64 - candle.sell_volume as i64,
        "delta mismatch: {candle:?}"
    );
}

/// Every candle consistent and bucket starts strictly increasing
pub fn assert_series_invariants(candles: &[Candle]) {
    candles.iter().for_each(assert_candle_consistent);
    for window in candles.windows(2) {
        assert!(
            window[0].start_ms < window[1].start_ms,
            "bucket starts not increasing: {} then {}",
            window[0].start_ms,
            window[1].start_ms
        );
    }
}

/// Everything a consumer may rely on in a published snapshot
pub fn assert_snapshot_invariants(snapshot: &EngineSnapshot, config: &EngineConfig) {
    assert_series_invariants(&snapshot.candles);
    assert!(
        snapshot.candles.len() <= config.max_candle_history + 1,
        "candle history over cap: {}",
        snapshot.candles.len()
    );
    assert!(
        snapshot.trades.len() <= config.max_trades,
        "tape over cap: {}",
        snapshot.trades.len()
    );
    for window in snapshot.trades.windows(2) {
        assert!(window[0].id > window[1].id, "tape not newest first");
    }

    assert_eq!(snapshot.order_book.len(), 2 * config.depth_levels + 1);
    assert_descending(snapshot.order_book.iter().map(|l| l.price));
    assert_eq!(snapshot.footprint.len(), 2 * config.footprint_levels + 1);
    assert_descending(snapshot.footprint.iter().map(|r| r.price));

    for row in &snapshot.footprint {
        let expected = if row.bid_volume > 2 * row.ask_volume {
            Imbalance::Bid
        } else if row.ask_volume > 2 * row.bid_volume {
            Imbalance::Ask
        } else {
            Imbalance::Neutral
        };
        assert_eq!(row.imbalance, expected, "bad imbalance: {row:?}");
    }

    let recomputed =
        Statistics::compute(&snapshot.order_book, &snapshot.trades, &snapshot.liquidity);
    assert_eq!(snapshot.statistics, recomputed, "statistics are stale");
    assert_eq!(snapshot.is_live, snapshot.status == market_sim::ConnectionStatus::Live);
}
