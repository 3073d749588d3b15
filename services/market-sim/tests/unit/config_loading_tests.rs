//! Configuration defaults, validation and file/environment loading

use market_sim::{ConfigError, EngineConfig, RefreshPolicy};
use pretty_assertions::assert_eq;
use rstest::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(extension: &str, body: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(extension)
        .tempfile()
        .unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_defaults() {
    let config = EngineConfig::default();
    assert_eq!(config.update_interval_ms, 500);
    assert_eq!(config.candle_duration_ms, 60_000);
    assert_eq!(config.depth_levels, 20);
    assert_eq!(config.max_candle_history, 100);
    assert_eq!(config.max_trades, 200);
    assert_eq!(config.liquidity_refresh, RefreshPolicy::Probability(0.1));
    assert_eq!(config.value_area_pct, 70);
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_toml_file() {
    let file = write_config(
        ".toml",
        r#"
symbol = "ES"
depth_levels = 8
tick_size = 0.5
seed = 7

[liquidity]
count = 12
iceberg_probability = 0.5

[liquidity_refresh]
mode = "every_n_ticks"
value = 10
"#,
    );

    let config = EngineConfig::load(Some(file.path())).unwrap();

    assert_eq!(config.symbol, "ES");
    assert_eq!(config.depth_levels, 8);
    assert_eq!(config.tick_size, 0.5);
    assert_eq!(config.seed, Some(7));
    assert_eq!(config.liquidity.count, 12);
    assert_eq!(config.liquidity.min_size, 100);
    assert_eq!(config.liquidity_refresh, RefreshPolicy::EveryNTicks(10));
    assert_eq!(config.max_trades, 200);
}

#[test]
fn test_load_json_file() {
    let file = write_config(".json", r#"{"symbol": "NQ", "volatility": 1.25}"#);
    let config = EngineConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.symbol, "NQ");
    assert_eq!(config.volatility, 1.25);
}

#[test]
fn test_invalid_file_values_rejected() {
    let file = write_config(".toml", "depth_levels = 0\n");
    assert_eq!(
        EngineConfig::load(Some(file.path())),
        Err(ConfigError::InvalidDepthLevels(0))
    );
}

#[test]
fn test_oversized_file_values_rejected() {
    let file = write_config(".toml", "history_seed_count = 1000000000000\n");
    assert!(matches!(
        EngineConfig::load(Some(file.path())),
        Err(ConfigError::LimitExceeded {
            name: "history_seed_count",
            ..
        })
    ));
}

#[test]
fn test_missing_file_is_load_error() {
    let result = EngineConfig::load(Some(std::path::Path::new("/nonexistent/market-sim.toml")));
    assert!(matches!(result, Err(ConfigError::Load(_))));
}

#[test]
fn test_environment_override() {
    let file = write_config(".toml", "large_order_threshold = 10\n");

    // SAFETY: only this test touches this variable
    unsafe { std::env::set_var("MARKET_SIM__LARGE_ORDER_THRESHOLD", "75") };
    let result = EngineConfig::load(Some(file.path()));
    unsafe { std::env::remove_var("MARKET_SIM__LARGE_ORDER_THRESHOLD") };

    assert_eq!(result.unwrap().large_order_threshold, 75);
}

#[rstest]
#[case::interval(EngineConfig { update_interval_ms: 0, ..EngineConfig::default() }, ConfigError::InvalidInterval(0))]
#[case::duration(EngineConfig { candle_duration_ms: -5, ..EngineConfig::default() }, ConfigError::InvalidCandleDuration(-5))]
#[case::tick(EngineConfig { tick_size: -0.25, ..EngineConfig::default() }, ConfigError::InvalidTickSize(-0.25))]
#[case::price(EngineConfig { initial_price: 0.0, ..EngineConfig::default() }, ConfigError::InvalidInitialPrice(0.0))]
#[case::tape(
    EngineConfig { max_trades: 0, ..EngineConfig::default() },
    ConfigError::InvalidCapacity { name: "max_trades", value: 0 }
)]
#[case::refresh(
    EngineConfig { liquidity_refresh: RefreshPolicy::EveryNTicks(0), ..EngineConfig::default() },
    ConfigError::InvalidCapacity { name: "liquidity_refresh", value: 0 }
)]
fn test_validation_errors(#[case] config: EngineConfig, #[case] expected: ConfigError) {
    assert_eq!(config.validate(), Err(expected));
}

#[test]
fn test_error_messages() {
    assert_eq!(
        ConfigError::InvalidInterval(0).to_string(),
        "Invalid update interval: 0ms (must be positive)"
    );
    assert_eq!(
        ConfigError::InvalidDepthLevels(0).to_string(),
        "Invalid depth levels: 0 (must be at least 1)"
    );
}
