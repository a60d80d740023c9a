//! RSI-dip pullback policy: buy oversold dips above a long moving average.
//!
//! Entry (long only): RSI below the entry threshold while the close holds
//! above the SMA, an oversold pullback inside an uptrend. Optionally the
//! decision bar must also open above the previous close (gap-up
//! confirmation). Exit signal fires when RSI recovers through the exit
//! threshold. Stops, targets, and the partial tranche are percent
//! distances from the entry fill.

use crate::domain::bar::Bar;
use crate::domain::error::PullbackError;
use crate::domain::indicator::{IndicatorSet, IndicatorType};
use crate::domain::policy::{EntryParams, StrategyPolicy, TrailMode};
use crate::domain::position::{Direction, PositionState};

/// Upper bound on lookback periods. Keeps warmup arithmetic and memory
/// use sane; daily-bar strategies never need lookbacks near this.
pub const MAX_PERIOD: usize = 10_000;

/// Tunable parameters; defaults match the stock RSI(10)/SMA(200) setup.
#[derive(Debug, Clone, PartialEq)]
pub struct RsiSmaParams {
    pub rsi_period: usize,
    pub sma_period: usize,
    pub entry_rsi: f64,
    pub exit_rsi: f64,
    pub stop_pct: f64,
    pub target_pct: f64,
    /// Trailing distance in percent of entry; 0 disables trailing.
    pub trail_pct: f64,
    pub partial_fraction: f64,
    pub breakeven_after_partial: bool,
    pub require_gap_up: bool,
}

impl Default for RsiSmaParams {
    fn default() -> Self {
        RsiSmaParams {
            rsi_period: 10,
            sma_period: 200,
            entry_rsi: 30.0,
            exit_rsi: 60.0,
            stop_pct: 5.0,
            target_pct: 10.0,
            trail_pct: 0.0,
            partial_fraction: 0.5,
            breakeven_after_partial: true,
            require_gap_up: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RsiSmaPolicy {
    params: RsiSmaParams,
    rsi: IndicatorType,
    sma: IndicatorType,
}

impl RsiSmaPolicy {
    /// Validate and build. Contradictory parameters are rejected here,
    /// before any simulation starts.
    pub fn new(params: RsiSmaParams) -> Result<Self, PullbackError> {
        for (name, period) in [
            ("rsi_period", params.rsi_period),
            ("sma_period", params.sma_period),
        ] {
            if !(1..=MAX_PERIOD).contains(&period) {
                return Err(PullbackError::configuration(
                    name,
                    format!("must be between 1 and {}", MAX_PERIOD),
                ));
            }
        }
        for (name, value) in [("entry_rsi", params.entry_rsi), ("exit_rsi", params.exit_rsi)] {
            if !(0.0..=100.0).contains(&value) {
                return Err(PullbackError::configuration(
                    name,
                    "must be between 0 and 100",
                ));
            }
        }
        if params.entry_rsi >= params.exit_rsi {
            return Err(PullbackError::configuration(
                "entry_rsi",
                "must be below exit_rsi",
            ));
        }
        if params.trail_pct < 0.0 || !params.trail_pct.is_finite() {
            return Err(PullbackError::configuration(
                "trail_pct",
                "must be zero (off) or positive",
            ));
        }

        let policy = RsiSmaPolicy {
            rsi: IndicatorType::Rsi(params.rsi_period),
            sma: IndicatorType::Sma(params.sma_period),
            params,
        };
        // Percent distances validate against a reference price of 100;
        // they scale linearly, so validity is price-independent.
        policy.entry_params(100.0).validate()?;
        Ok(policy)
    }

    pub fn params(&self) -> &RsiSmaParams {
        &self.params
    }
}

impl StrategyPolicy for RsiSmaPolicy {
    fn required_indicators(&self) -> Vec<IndicatorType> {
        vec![self.rsi, self.sma]
    }

    fn should_enter(
        &self,
        i: usize,
        bars: &[Bar],
        indicators: &IndicatorSet,
    ) -> Option<Direction> {
        let rsi = indicators.value_at(self.rsi, i)?;
        let sma = indicators.value_at(self.sma, i)?;
        let bar = &bars[i];

        if rsi >= self.params.entry_rsi || bar.close <= sma {
            return None;
        }
        if self.params.require_gap_up {
            // Gap-up confirmation uses only data at indices <= i.
            if i == 0 || bar.open <= bars[i - 1].close {
                return None;
            }
        }
        Some(Direction::Long)
    }

    fn entry_params(&self, entry_price: f64) -> EntryParams {
        let pct = |p: f64| entry_price * p / 100.0;
        EntryParams {
            stop_distance: pct(self.params.stop_pct),
            target_distance: pct(self.params.target_pct),
            trail: if self.params.trail_pct > 0.0 {
                TrailMode::Distance(pct(self.params.trail_pct))
            } else {
                TrailMode::Off
            },
            partial_fraction: self.params.partial_fraction,
            breakeven_after_partial: self.params.breakeven_after_partial,
        }
    }

    fn should_exit(
        &self,
        i: usize,
        _bars: &[Bar],
        indicators: &IndicatorSet,
        _position: &PositionState,
    ) -> bool {
        // A missing RSI point never forces an exit; the position is still
        // managed by its stops.
        indicators
            .value_at(self.rsi, i)
            .is_some_and(|rsi| rsi > self.params.exit_rsi)
    }
}
