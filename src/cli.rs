//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::engine::{EngineConfig, EntryFill};
use crate::domain::error::PullbackError;
use crate::domain::orchestrator;
use crate::domain::policy::StrategyPolicy;
use crate::domain::rsi_sma::{RsiSmaParams, RsiSmaPolicy, MAX_PERIOD};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "pullback", about = "Daily-bar pullback strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over the configured ticker universe
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Override the data directory from the config file
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Run a single ticker instead of the configured universe
        #[arg(long)]
        ticker: Option<String>,
        /// Write the trade log as JSON lines to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file without touching any data
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List tickers available in the data directory
    ListTickers {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data_dir,
            ticker,
            output,
        } => run_backtest(&config, data_dir, ticker.as_deref(), output.as_ref()),
        Command::Validate { config } => run_validate(&config),
        Command::ListTickers { config, data_dir } => run_list_tickers(&config, data_dir),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = PullbackError::configuration(
            "config",
            format!("failed to load {}: {}", path.display(), e),
        );
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Integer config values arrive as i64; reject anything outside the
/// valid period range before casting so a negative key in the file
/// cannot wrap around.
fn get_period(
    adapter: &dyn ConfigPort,
    key: &str,
    default: usize,
) -> Result<usize, PullbackError> {
    let raw = adapter.get_int("strategy", key, default as i64);
    if !(1..=MAX_PERIOD as i64).contains(&raw) {
        return Err(PullbackError::configuration(
            key,
            format!("must be between 1 and {}", MAX_PERIOD),
        ));
    }
    Ok(raw as usize)
}

pub fn build_strategy_params(adapter: &dyn ConfigPort) -> Result<RsiSmaParams, PullbackError> {
    let defaults = RsiSmaParams::default();
    Ok(RsiSmaParams {
        rsi_period: get_period(adapter, "rsi_period", defaults.rsi_period)?,
        sma_period: get_period(adapter, "sma_period", defaults.sma_period)?,
        entry_rsi: adapter.get_double("strategy", "entry_rsi", defaults.entry_rsi),
        exit_rsi: adapter.get_double("strategy", "exit_rsi", defaults.exit_rsi),
        stop_pct: adapter.get_double("strategy", "stop_pct", defaults.stop_pct),
        target_pct: adapter.get_double("strategy", "target_pct", defaults.target_pct),
        trail_pct: adapter.get_double("strategy", "trail_pct", defaults.trail_pct),
        partial_fraction: adapter.get_double(
            "strategy",
            "partial_fraction",
            defaults.partial_fraction,
        ),
        breakeven_after_partial: adapter.get_bool(
            "strategy",
            "breakeven_after_partial",
            defaults.breakeven_after_partial,
        ),
        require_gap_up: adapter.get_bool("strategy", "require_gap_up", defaults.require_gap_up),
    })
}

pub fn build_engine_config(adapter: &dyn ConfigPort) -> Result<EngineConfig, PullbackError> {
    let entry_fill = match adapter
        .get_string("backtest", "entry_fill")
        .unwrap_or_else(|| "next-bar-open".to_string())
        .as_str()
    {
        "next-bar-open" => EntryFill::NextBarOpen,
        "same-bar-close" => EntryFill::SameBarClose,
        other => {
            return Err(PullbackError::configuration(
                "backtest.entry_fill",
                format!(
                    "unknown value '{}' (expected next-bar-open or same-bar-close)",
                    other
                ),
            ));
        }
    };
    Ok(EngineConfig { entry_fill })
}

pub fn resolve_tickers(
    ticker_override: Option<&str>,
    config: &dyn ConfigPort,
    data_port: &dyn DataPort,
) -> Result<Vec<String>, PullbackError> {
    if let Some(t) = ticker_override {
        return Ok(vec![t.to_uppercase()]);
    }

    if let Some(tickers_str) = config.get_string("backtest", "tickers") {
        let tickers: Vec<String> = tickers_str
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if !tickers.is_empty() {
            return Ok(tickers);
        }
    }

    data_port.list_tickers()
}

fn resolve_data_dir(
    data_dir_override: Option<PathBuf>,
    config: &dyn ConfigPort,
) -> Result<PathBuf, PullbackError> {
    if let Some(dir) = data_dir_override {
        return Ok(dir);
    }
    config
        .get_string("backtest", "data_dir")
        .map(PathBuf::from)
        .ok_or_else(|| {
            PullbackError::configuration("backtest.data_dir", "missing (set in config or pass --data-dir)")
        })
}

fn run_backtest(
    config_path: &PathBuf,
    data_dir_override: Option<PathBuf>,
    ticker_override: Option<&str>,
    output_path: Option<&PathBuf>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let policy = match build_strategy_params(&adapter).and_then(RsiSmaPolicy::new) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let engine_config = match build_engine_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let data_dir = match resolve_data_dir(data_dir_override, &adapter) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let data_port = CsvAdapter::new(data_dir);

    let tickers = match resolve_tickers(ticker_override, &adapter, &data_port) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if tickers.is_empty() {
        eprintln!("error: no tickers configured and none found in data directory");
        return ExitCode::from(2);
    }

    eprintln!("Running backtest: {} tickers", tickers.len());

    let report = orchestrator::run_batch(&data_port, &tickers, &policy, &engine_config);

    for failure in &report.failures {
        eprintln!("warning: skipping {} ({})", failure.ticker, failure.error);
    }

    if report.results.is_empty() {
        eprintln!("error: no tickers produced results");
        return match report.failures.first() {
            Some(f) => (&f.error).into(),
            None => ExitCode::from(5),
        };
    }

    eprintln!("\n=== Per-Ticker Summary ===");
    let mut total_trades = 0usize;
    for result in &report.results {
        total_trades += result.trades.len();
        let rr = match result.stats.risk_reward {
            Some(rr) => format!("{:.2}", rr),
            None => "n/a".to_string(),
        };
        eprintln!(
            "  {}:  {} bars, {} trades, {:.1}% win rate, {:+.3}% expectancy, {} R:R",
            result.ticker,
            result.bars,
            result.stats.trades,
            result.stats.win_rate * 100.0,
            result.stats.expectancy * 100.0,
            rr,
        );
    }
    eprintln!(
        "\n{} tickers, {} trades, {} skipped",
        report.results.len(),
        total_trades,
        report.failures.len()
    );

    if let Some(output) = output_path {
        if let Err(e) = write_trade_log(output, &report) {
            eprintln!("error: failed to write trade log: {e}");
            return ExitCode::from(1);
        }
        eprintln!("Trade log written to: {}", output.display());
    }

    ExitCode::SUCCESS
}

/// One JSON object per line, trades across all tickers in ticker order.
fn write_trade_log(
    path: &PathBuf,
    report: &orchestrator::BatchReport,
) -> Result<(), PullbackError> {
    let mut file = fs::File::create(path)?;
    for result in &report.results {
        for trade in &result.trades {
            let line = serde_json::to_string(trade).map_err(|e| PullbackError::Data {
                reason: format!("trade serialization failed: {}", e),
            })?;
            writeln!(file, "{}", line)?;
        }
    }
    Ok(())
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let policy = match build_strategy_params(&adapter).and_then(RsiSmaPolicy::new) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let engine_config = match build_engine_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("\nStrategy:");
    eprintln!("  RSI period:   {}", policy.params().rsi_period);
    eprintln!("  SMA period:   {}", policy.params().sma_period);
    eprintln!("  entry RSI:    < {}", policy.params().entry_rsi);
    eprintln!("  exit RSI:     > {}", policy.params().exit_rsi);
    eprintln!("  stop:         {}%", policy.params().stop_pct);
    eprintln!("  target:       {}%", policy.params().target_pct);
    if policy.params().trail_pct > 0.0 {
        eprintln!("  trail:        {}%", policy.params().trail_pct);
    }
    eprintln!("  entry fill:   {:?}", engine_config.entry_fill);
    eprintln!("  minimum bars: {}", policy.min_bars());

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_list_tickers(config_path: &PathBuf, data_dir_override: Option<PathBuf>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let data_dir = match resolve_data_dir(data_dir_override, &adapter) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let data_port = CsvAdapter::new(data_dir);
    let tickers = match data_port.list_tickers() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if tickers.is_empty() {
        eprintln!("No data files found");
    } else {
        for ticker in &tickers {
            println!("{}", ticker);
        }
        eprintln!("{} tickers found", tickers.len());
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_params_read_from_config() {
        let adapter = FileConfigAdapter::from_string(
            "[strategy]\nrsi_period = 14\nentry_rsi = 25\npartial_fraction = 0.4\n",
        )
        .unwrap();
        let params = build_strategy_params(&adapter).unwrap();
        assert_eq!(params.rsi_period, 14);
        assert_eq!(params.entry_rsi, 25.0);
        assert_eq!(params.partial_fraction, 0.4);
        // Unset keys keep defaults.
        assert_eq!(params.sma_period, RsiSmaParams::default().sma_period);
    }

    #[test]
    fn negative_period_rejected_not_wrapped() {
        let adapter =
            FileConfigAdapter::from_string("[strategy]\nrsi_period = -1\n").unwrap();
        let err = build_strategy_params(&adapter).unwrap_err();
        assert!(matches!(err, PullbackError::Configuration { .. }));
        assert!(err.to_string().contains("rsi_period"));

        let adapter =
            FileConfigAdapter::from_string("[strategy]\nsma_period = 0\n").unwrap();
        assert!(build_strategy_params(&adapter).is_err());

        let adapter =
            FileConfigAdapter::from_string("[strategy]\nrsi_period = 999999999\n").unwrap();
        assert!(build_strategy_params(&adapter).is_err());
    }

    #[test]
    fn engine_config_parses_entry_fill() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\nentry_fill = same-bar-close\n").unwrap();
        let config = build_engine_config(&adapter).unwrap();
        assert_eq!(config.entry_fill, EntryFill::SameBarClose);

        let adapter = FileConfigAdapter::from_string("[backtest]\n").unwrap();
        let config = build_engine_config(&adapter).unwrap();
        assert_eq!(config.entry_fill, EntryFill::NextBarOpen);
    }

    #[test]
    fn engine_config_rejects_unknown_entry_fill() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\nentry_fill = at-vwap\n").unwrap();
        let err = build_engine_config(&adapter).unwrap_err();
        assert!(matches!(err, PullbackError::Configuration { .. }));
    }

    #[test]
    fn tickers_from_config_are_split_and_uppercased() {
        use crate::domain::bar::Bar;

        struct EmptyPort;
        impl DataPort for EmptyPort {
            fn fetch_bars(&self, _ticker: &str) -> Result<Vec<Bar>, PullbackError> {
                Ok(vec![])
            }
            fn list_tickers(&self) -> Result<Vec<String>, PullbackError> {
                Ok(vec!["ZZZ".to_string()])
            }
        }

        let adapter =
            FileConfigAdapter::from_string("[backtest]\ntickers = bhp, cba,anz\n").unwrap();
        let tickers = resolve_tickers(None, &adapter, &EmptyPort).unwrap();
        assert_eq!(tickers, vec!["BHP", "CBA", "ANZ"]);

        // Override wins over the config list.
        let tickers = resolve_tickers(Some("wes"), &adapter, &EmptyPort).unwrap();
        assert_eq!(tickers, vec!["WES"]);

        // No list configured: fall back to the data directory.
        let adapter = FileConfigAdapter::from_string("[backtest]\n").unwrap();
        let tickers = resolve_tickers(None, &adapter, &EmptyPort).unwrap();
        assert_eq!(tickers, vec!["ZZZ"]);
    }
}
