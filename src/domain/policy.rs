//! Strategy policy capability interface.
//!
//! A policy supplies entry/exit signals and per-entry risk parameters; the
//! engine is agnostic to which concrete policy is active. Policies must be
//! pure given their inputs (no interior mutability) so a run is
//! deterministic and replayable.

use crate::domain::bar::Bar;
use crate::domain::error::PullbackError;
use crate::domain::indicator::{IndicatorSet, IndicatorType};
use crate::domain::position::{Direction, PositionState};

/// Trailing-stop behavior for a position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrailMode {
    Off,
    /// Trail at a fixed price distance behind the best close since entry.
    Distance(f64),
}

/// Risk parameters fixed at entry time, expressed as absolute price
/// distances from the entry price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryParams {
    pub stop_distance: f64,
    pub target_distance: f64,
    pub trail: TrailMode,
    /// Fraction of size closed on the first target touch; 1.0 disables
    /// partial exits (first touch closes everything).
    pub partial_fraction: f64,
    /// After a partial exit, ratchet the hard stop to the entry price.
    pub breakeven_after_partial: bool,
}

impl EntryParams {
    /// Reject contradictory parameters. Called at policy construction so a
    /// bad configuration never reaches the per-bar loop.
    pub fn validate(&self) -> Result<(), PullbackError> {
        if !self.stop_distance.is_finite() || self.stop_distance <= 0.0 {
            return Err(PullbackError::configuration(
                "stop_distance",
                "must be a positive price distance",
            ));
        }
        if !self.target_distance.is_finite() || self.target_distance <= 0.0 {
            return Err(PullbackError::configuration(
                "target_distance",
                "must be a positive price distance",
            ));
        }
        if let TrailMode::Distance(d) = self.trail {
            if !d.is_finite() || d <= 0.0 {
                return Err(PullbackError::configuration(
                    "trail_distance",
                    "must be a positive price distance",
                ));
            }
        }
        if !self.partial_fraction.is_finite()
            || self.partial_fraction <= 0.0
            || self.partial_fraction > 1.0
        {
            return Err(PullbackError::configuration(
                "partial_fraction",
                "must be in (0, 1]",
            ));
        }
        Ok(())
    }
}

/// Pluggable decision function consumed by the execution engine.
pub trait StrategyPolicy {
    /// Indicators that must be precomputed before the engine runs.
    fn required_indicators(&self) -> Vec<IndicatorType>;

    /// Minimum series length for this policy to produce any signal;
    /// shorter series are skipped as insufficient data.
    fn min_bars(&self) -> usize {
        self.required_indicators()
            .iter()
            .map(|ty| ty.warmup() + 1)
            .max()
            .unwrap_or(1)
    }

    /// Entry decision at bar `i`. Returning a direction requests an entry;
    /// the engine additionally requires every needed indicator point to be
    /// defined at `i`, and ignores the signal while a position is open.
    fn should_enter(&self, i: usize, bars: &[Bar], indicators: &IndicatorSet)
        -> Option<Direction>;

    /// Risk parameters for a position entered at `entry_price`.
    fn entry_params(&self, entry_price: f64) -> EntryParams;

    /// Signal-based exit decision for an open position at bar `i`.
    /// Checked last, after stop/target handling.
    fn should_exit(
        &self,
        i: usize,
        bars: &[Bar],
        indicators: &IndicatorSet,
        position: &PositionState,
    ) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_params() -> EntryParams {
        EntryParams {
            stop_distance: 2.0,
            target_distance: 4.0,
            trail: TrailMode::Off,
            partial_fraction: 1.0,
            breakeven_after_partial: false,
        }
    }

    #[test]
    fn valid_params_pass() {
        assert!(sample_params().validate().is_ok());
    }

    #[test]
    fn zero_stop_rejected() {
        let params = EntryParams {
            stop_distance: 0.0,
            ..sample_params()
        };
        let err = params.validate().unwrap_err();
        assert!(matches!(err, PullbackError::Configuration { .. }));
    }

    #[test]
    fn negative_target_rejected() {
        let params = EntryParams {
            target_distance: -1.0,
            ..sample_params()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn nan_stop_rejected() {
        let params = EntryParams {
            stop_distance: f64::NAN,
            ..sample_params()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn zero_trail_distance_rejected() {
        let params = EntryParams {
            trail: TrailMode::Distance(0.0),
            ..sample_params()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn positive_trail_distance_ok() {
        let params = EntryParams {
            trail: TrailMode::Distance(1.5),
            ..sample_params()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn partial_fraction_bounds() {
        for bad in [0.0, -0.5, 1.5] {
            let params = EntryParams {
                partial_fraction: bad,
                ..sample_params()
            };
            assert!(params.validate().is_err(), "{} should fail", bad);
        }
        let half = EntryParams {
            partial_fraction: 0.5,
            ..sample_params()
        };
        assert!(half.validate().is_ok());
    }
}
