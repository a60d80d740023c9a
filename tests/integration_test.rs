//! Full-stack integration: INI config on disk, CSV bar files on disk, and
//! the batch pipeline wired together exactly as the CLI wires it.

use pullback::adapters::csv_adapter::CsvAdapter;
use pullback::adapters::file_config_adapter::FileConfigAdapter;
use pullback::cli::{build_engine_config, build_strategy_params, resolve_tickers};
use pullback::domain::error::PullbackError;
use pullback::domain::orchestrator::run_batch;
use pullback::domain::position::ExitReason;
use pullback::domain::rsi_sma::RsiSmaPolicy;
use pullback::ports::data_port::DataPort;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

const CONFIG: &str = "\
[backtest]
tickers = AAA, BAD
entry_fill = next-bar-open

[strategy]
rsi_period = 2
sma_period = 8
entry_rsi = 30
exit_rsi = 60
stop_pct = 5.0
target_pct = 10.0
";

/// The hand-computed fixture from the engine tests, as a CSV file: RSI(2)
/// dips to 29.4 on the 8.7 pullback bar while the close holds above the
/// SMA(8), the entry fills at 9.0 the next open, and the recovery close at
/// 9.5 lifts RSI above the exit threshold the same day.
const GOOD_CSV: &str = "\
date,open,high,low,close,volume
2024-01-02,5.0,5.5,4.5,5.0,1000
2024-01-03,9.0,9.5,8.5,9.0,1000
2024-01-04,9.0,9.5,8.5,9.0,1000
2024-01-05,9.0,9.5,8.5,9.0,1000
2024-01-06,9.0,9.5,8.5,9.0,1000
2024-01-07,9.0,9.5,8.5,9.0,1000
2024-01-08,9.0,9.5,8.5,9.0,1000
2024-01-09,8.9,8.95,8.65,8.7,1000
2024-01-10,9.0,9.6,8.95,9.5,1000
";

const BAD_CSV: &str = "\
date,open,high,low,close,volume
2024-01-02,10.0,11.0,9.0,not_a_price,1000
";

fn setup() -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");
    fs::create_dir(&data_dir).unwrap();
    fs::write(data_dir.join("AAA.csv"), GOOD_CSV).unwrap();
    fs::write(data_dir.join("BAD.csv"), BAD_CSV).unwrap();

    let config_path = dir.path().join("pullback.ini");
    let mut file = fs::File::create(&config_path).unwrap();
    write!(file, "{}", CONFIG).unwrap();

    (dir, data_dir, config_path)
}

#[test]
fn config_and_csv_round_trip_through_the_batch() {
    let (_dir, data_dir, config_path) = setup();

    let adapter = FileConfigAdapter::from_file(&config_path).unwrap();
    let policy = RsiSmaPolicy::new(build_strategy_params(&adapter).unwrap()).unwrap();
    let engine_config = build_engine_config(&adapter).unwrap();
    let data_port = CsvAdapter::new(data_dir);

    let tickers = resolve_tickers(None, &adapter, &data_port).unwrap();
    assert_eq!(tickers, vec!["AAA", "BAD"]);

    let report = run_batch(&data_port, &tickers, &policy, &engine_config);

    assert_eq!(report.results.len(), 1);
    let result = &report.results[0];
    assert_eq!(result.ticker, "AAA");
    assert_eq!(result.bars, 9);
    assert_eq!(result.trades.len(), 1);

    let trade = &result.trades[0];
    assert_eq!(trade.entry_index, 8);
    assert!((trade.entry_price - 9.0).abs() < f64::EPSILON);
    assert_eq!(trade.exit_reason, ExitReason::Signal);
    assert!((trade.exit_price - 9.5).abs() < f64::EPSILON);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].ticker, "BAD");
    assert!(matches!(
        report.failures[0].error,
        PullbackError::Data { .. }
    ));
}

#[test]
fn corrupt_data_is_rejected_with_integrity_error() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().to_path_buf();
    // Duplicate session date.
    fs::write(
        data_dir.join("DUP.csv"),
        "date,open,high,low,close,volume\n\
         2024-01-02,10.0,11.0,9.0,10.0,1000\n\
         2024-01-02,10.0,11.0,9.0,10.0,1000\n\
         2024-01-03,10.0,11.0,9.0,10.0,1000\n\
         2024-01-04,10.0,11.0,9.0,10.0,1000\n\
         2024-01-05,10.0,11.0,9.0,10.0,1000\n\
         2024-01-06,10.0,11.0,9.0,10.0,1000\n\
         2024-01-07,10.0,11.0,9.0,10.0,1000\n\
         2024-01-08,10.0,11.0,9.0,10.0,1000\n\
         2024-01-09,10.0,11.0,9.0,10.0,1000\n",
    )
    .unwrap();

    let adapter = FileConfigAdapter::from_string(CONFIG).unwrap();
    let policy = RsiSmaPolicy::new(build_strategy_params(&adapter).unwrap()).unwrap();
    let engine_config = build_engine_config(&adapter).unwrap();
    let data_port = CsvAdapter::new(data_dir);

    let report = run_batch(
        &data_port,
        &["DUP".to_string()],
        &policy,
        &engine_config,
    );

    assert!(report.results.is_empty());
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0].error,
        PullbackError::DataIntegrity { .. }
    ));
}

#[test]
fn trades_serialize_to_json_lines() {
    let (_dir, data_dir, config_path) = setup();

    let adapter = FileConfigAdapter::from_file(&config_path).unwrap();
    let policy = RsiSmaPolicy::new(build_strategy_params(&adapter).unwrap()).unwrap();
    let engine_config = build_engine_config(&adapter).unwrap();
    let data_port = CsvAdapter::new(data_dir);

    let report = run_batch(
        &data_port,
        &["AAA".to_string()],
        &policy,
        &engine_config,
    );
    let trade = &report.results[0].trades[0];

    let line = serde_json::to_string(trade).unwrap();
    let value: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value["ticker"], "AAA");
    assert_eq!(value["exit_reason"], "signal");
    assert_eq!(value["entry_date"], "2024-01-10");
}
