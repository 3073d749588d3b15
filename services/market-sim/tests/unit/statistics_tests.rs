//! Rollup statistics over book, tape and liquidity

use market_sim::{Side, Statistics};
use proptest::prelude::*;
use test_utils::{TradeFactory, assert_approx_eq, book_from, liquidity_level};

#[test]
fn test_five_trade_rollup() {
    let mut factory = TradeFactory::new().with_threshold(15);
    let mut trades = factory.build_many(3, 10, Side::Buy);
    trades.extend(factory.build_many(2, 20, Side::Sell));

    let stats = Statistics::compute(&[], &trades, &[]);

    assert_eq!(stats.cumulative_delta, 3 * 10 - 2 * 20);
    assert_eq!(stats.large_order_count, 2);
}

#[test]
fn test_book_sums_and_imbalance() {
    let book = book_from(&[(101.0, 100, 300), (100.5, 50, 50), (100.0, 250, 0)]);
    let stats = Statistics::compute(&book, std::iter::empty(), &[]);

    assert_eq!(stats.total_bid_volume, 400);
    assert_eq!(stats.total_ask_volume, 350);
    assert_approx_eq(stats.book_imbalance, 50.0 / 750.0, 1e-12);
}

#[test]
fn test_iceberg_count() {
    let liquidity = vec![
        liquidity_level(99.0, 4500, 100.0, true),
        liquidity_level(101.0, 4800, 100.0, true),
        liquidity_level(102.0, 300, 100.0, false),
    ];
    let stats = Statistics::compute(&[], std::iter::empty(), &liquidity);
    assert_eq!(stats.iceberg_count, 2);
}

#[test]
fn test_empty_inputs() {
    let stats = Statistics::compute(&[], std::iter::empty(), &[]);
    assert_eq!(stats, Statistics::default());
}

proptest! {
    #[test]
    fn prop_statistics_are_literal_sums(
        rows in prop::collection::vec((1u64..10_000, 1u64..10_000), 0..40),
        prints in prop::collection::vec((1u64..200, any::<bool>()), 0..100),
    ) {
        let book = book_from(
            &rows
                .iter()
                .enumerate()
                .map(|(i, &(bid, ask))| (100.0 - i as f64, bid, ask))
                .collect::<Vec<_>>(),
        );
        let mut factory = TradeFactory::new().with_threshold(50);
        let trades: Vec<_> = prints
            .iter()
            .map(|&(size, buy)| factory.build(size, if buy { Side::Buy } else { Side::Sell }))
            .collect();

        let stats = Statistics::compute(&book, &trades, &[]);

        prop_assert_eq!(stats.total_bid_volume, rows.iter().map(|r| r.0).sum::<u64>());
        prop_assert_eq!(stats.total_ask_volume, rows.iter().map(|r| r.1).sum::<u64>());
        let delta: i64 = prints
            .iter()
            .map(|&(size, buy)| if buy { size as i64 } else { -(size as i64) })
            .sum();
        prop_assert_eq!(stats.cumulative_delta, delta);
        prop_assert_eq!(stats.large_order_count, prints.iter().filter(|p| p.0 > 50).count());
        prop_assert!((-1.0..=1.0).contains(&stats.book_imbalance));
        prop_assert_eq!(Statistics::compute(&book, &trades, &[]), stats);
    }
}
