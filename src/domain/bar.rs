//! Daily OHLCV bar representation and series integrity checks.

use chrono::NaiveDate;

use crate::domain::error::PullbackError;

/// One OHLCV observation for one trading session. Immutable once loaded;
/// a ticker's bars are ordered by date with one bar per session.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Validate a bar series before it reaches the engine.
///
/// Checks, in order per bar: all OHLC fields finite, `low <= high`,
/// open/close within [low, high], non-negative volume, and strictly
/// increasing dates across the series. The first violation is reported
/// as [`PullbackError::DataIntegrity`] and the ticker is skipped by the
/// orchestrator; the batch continues.
pub fn validate_bars(ticker: &str, bars: &[Bar]) -> Result<(), PullbackError> {
    for (i, bar) in bars.iter().enumerate() {
        for (name, value) in [
            ("open", bar.open),
            ("high", bar.high),
            ("low", bar.low),
            ("close", bar.close),
        ] {
            if !value.is_finite() {
                return Err(PullbackError::DataIntegrity {
                    ticker: ticker.to_string(),
                    reason: format!("bar {} ({}): non-finite {}", i, bar.date, name),
                });
            }
        }

        if bar.low > bar.high {
            return Err(PullbackError::DataIntegrity {
                ticker: ticker.to_string(),
                reason: format!("bar {} ({}): low above high", i, bar.date),
            });
        }

        if bar.open < bar.low || bar.open > bar.high {
            return Err(PullbackError::DataIntegrity {
                ticker: ticker.to_string(),
                reason: format!("bar {} ({}): open outside [low, high]", i, bar.date),
            });
        }

        if bar.close < bar.low || bar.close > bar.high {
            return Err(PullbackError::DataIntegrity {
                ticker: ticker.to_string(),
                reason: format!("bar {} ({}): close outside [low, high]", i, bar.date),
            });
        }

        if bar.volume < 0 {
            return Err(PullbackError::DataIntegrity {
                ticker: ticker.to_string(),
                reason: format!("bar {} ({}): negative volume", i, bar.date),
            });
        }

        if i > 0 && bars[i - 1].date >= bar.date {
            return Err(PullbackError::DataIntegrity {
                ticker: ticker.to_string(),
                reason: format!(
                    "bar {}: date {} does not advance past {}",
                    i,
                    bar.date,
                    bars[i - 1].date
                ),
            });
        }
    }
    Ok(())
}
