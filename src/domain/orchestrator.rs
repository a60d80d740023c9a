//! Batch orchestration across tickers.
//!
//! Each ticker is an independent unit of work with no shared mutable state,
//! so the batch fans out over a rayon worker pool, one task per ticker.
//! A per-ticker failure (bad data, short history) is isolated into the
//! failure list; the rest of the batch keeps running. Partial success is
//! the normal outcome.

use rayon::prelude::*;

use crate::domain::analytics::TradeStats;
use crate::domain::bar::validate_bars;
use crate::domain::engine::{self, EngineConfig};
use crate::domain::error::PullbackError;
use crate::domain::indicator::compute_indicators;
use crate::domain::policy::StrategyPolicy;
use crate::domain::position::TradeLog;
use crate::ports::data_port::DataPort;

/// Completed backtest for one ticker.
#[derive(Debug, Clone)]
pub struct TickerReport {
    pub ticker: String,
    pub bars: usize,
    pub trades: TradeLog,
    pub stats: TradeStats,
}

#[derive(Debug)]
pub struct TickerFailure {
    pub ticker: String,
    pub error: PullbackError,
}

/// Aggregate result of a batch run, joined by ticker key and sorted for
/// deterministic output regardless of worker scheduling.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<TickerReport>,
    pub failures: Vec<TickerFailure>,
}

/// Run the full per-ticker pipeline: fetch, integrity-check, precompute
/// indicators, execute, summarize.
pub fn run_ticker<P: StrategyPolicy>(
    data_port: &dyn DataPort,
    ticker: &str,
    policy: &P,
    config: &EngineConfig,
) -> Result<TickerReport, PullbackError> {
    let bars = data_port.fetch_bars(ticker)?;
    validate_bars(ticker, &bars)?;

    let minimum = policy.min_bars();
    if bars.len() < minimum {
        return Err(PullbackError::InsufficientData {
            ticker: ticker.to_string(),
            bars: bars.len(),
            minimum,
        });
    }

    let indicators = compute_indicators(&bars, &policy.required_indicators());
    let trades = engine::run(&bars, &indicators, policy, config);
    let stats = TradeStats::compute(&trades);

    Ok(TickerReport {
        ticker: ticker.to_string(),
        bars: bars.len(),
        trades,
        stats,
    })
}

pub fn run_batch<P>(
    data_port: &(dyn DataPort + Sync),
    tickers: &[String],
    policy: &P,
    config: &EngineConfig,
) -> BatchReport
where
    P: StrategyPolicy + Sync,
{
    let outcomes: Vec<(String, Result<TickerReport, PullbackError>)> = tickers
        .par_iter()
        .map(|ticker| {
            let outcome = run_ticker(data_port, ticker, policy, config);
            (ticker.clone(), outcome)
        })
        .collect();

    let mut report = BatchReport::default();
    for (ticker, outcome) in outcomes {
        match outcome {
            Ok(result) => report.results.push(result),
            Err(error) => report.failures.push(TickerFailure { ticker, error }),
        }
    }
    report.results.sort_by(|a, b| a.ticker.cmp(&b.ticker));
    report.failures.sort_by(|a, b| a.ticker.cmp(&b.ticker));
    report
}
