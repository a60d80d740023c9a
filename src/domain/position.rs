//! Open-position state and completed-trade records.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Long,
    Short,
}

/// Why a trade (full or partial) was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExitReason {
    /// Hard stop breached intrabar.
    Stop,
    /// Ratcheted trailing stop breached intrabar.
    TrailingStop,
    /// Target touched, remaining size closed.
    Target,
    /// Target touched, partial tranche closed; position stays open.
    Partial,
    /// Policy exit signal at the close.
    Signal,
    /// Position still open after the last bar; force-closed at the final close.
    EndOfData,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::Stop => "stop",
            ExitReason::TrailingStop => "trailing-stop",
            ExitReason::Target => "target",
            ExitReason::Partial => "partial",
            ExitReason::Signal => "signal",
            ExitReason::EndOfData => "end-of-data",
        };
        f.write_str(s)
    }
}

/// Mutable per-ticker state held only while a position is open. Created on
/// entry, destroyed on full exit; the engine guarantees at most one exists
/// per ticker at any bar index.
#[derive(Debug, Clone)]
pub struct PositionState {
    pub direction: Direction,
    pub entry_index: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    /// Fixed protective stop level. May ratchet to break-even after a
    /// partial exit, favorably only.
    pub hard_stop: f64,
    /// Ratcheted trailing stop level; absent when trailing is off.
    pub trail_stop: Option<f64>,
    pub target: f64,
    /// Best close in the position's favor since entry; the trailing stop
    /// is anchored to this.
    pub extreme_price: f64,
    /// Fraction of the original size still open, in (0, 1].
    pub remaining_fraction: f64,
    pub partial_done: bool,
}

impl PositionState {
    /// Signed fractional return of a slice exited at `exit_price`.
    pub fn return_at(&self, exit_price: f64) -> f64 {
        match self.direction {
            Direction::Long => (exit_price - self.entry_price) / self.entry_price,
            Direction::Short => (self.entry_price - exit_price) / self.entry_price,
        }
    }

    /// Hard-stop breach check against the bar's intrabar extreme.
    /// Touch triggers: `<=` for longs, `>=` for shorts.
    pub fn hard_stop_hit(&self, low: f64, high: f64) -> bool {
        match self.direction {
            Direction::Long => low <= self.hard_stop,
            Direction::Short => high >= self.hard_stop,
        }
    }

    pub fn trail_stop_hit(&self, low: f64, high: f64) -> bool {
        match (self.direction, self.trail_stop) {
            (Direction::Long, Some(trail)) => low <= trail,
            (Direction::Short, Some(trail)) => high >= trail,
            (_, None) => false,
        }
    }

    pub fn target_hit(&self, low: f64, high: f64) -> bool {
        match self.direction {
            Direction::Long => high >= self.target,
            Direction::Short => low <= self.target,
        }
    }
}

/// Immutable record of one completed round trip (or partial tranche).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub ticker: String,
    pub entry_index: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_index: usize,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    /// Fraction of the original position size closed by this record; the
    /// fractions of all records for one logical position sum to 1.
    pub size_fraction: f64,
    pub realized_return: f64,
}

/// Ordered, append-only trade history for one ticker.
pub type TradeLog = Vec<Trade>;

#[cfg(test)]
mod tests {
    use super::*;

    fn long_position() -> PositionState {
        PositionState {
            direction: Direction::Long,
            entry_index: 5,
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            entry_price: 100.0,
            hard_stop: 95.0,
            trail_stop: Some(97.0),
            target: 110.0,
            extreme_price: 100.0,
            remaining_fraction: 1.0,
            partial_done: false,
        }
    }

    fn short_position() -> PositionState {
        PositionState {
            direction: Direction::Short,
            hard_stop: 105.0,
            trail_stop: Some(103.0),
            target: 90.0,
            ..long_position()
        }
    }

    #[test]
    fn return_long() {
        let pos = long_position();
        assert!((pos.return_at(110.0) - 0.10).abs() < f64::EPSILON);
        assert!((pos.return_at(95.0) - (-0.05)).abs() < f64::EPSILON);
    }

    #[test]
    fn return_short() {
        let pos = short_position();
        assert!((pos.return_at(90.0) - 0.10).abs() < f64::EPSILON);
        assert!((pos.return_at(105.0) - (-0.05)).abs() < f64::EPSILON);
    }

    #[test]
    fn hard_stop_long_touch_triggers() {
        let pos = long_position();
        assert!(pos.hard_stop_hit(95.0, 101.0));
        assert!(pos.hard_stop_hit(94.0, 101.0));
        assert!(!pos.hard_stop_hit(95.1, 101.0));
    }

    #[test]
    fn hard_stop_short_touch_triggers() {
        let pos = short_position();
        assert!(pos.hard_stop_hit(99.0, 105.0));
        assert!(pos.hard_stop_hit(99.0, 106.0));
        assert!(!pos.hard_stop_hit(99.0, 104.9));
    }

    #[test]
    fn trail_stop_absent_never_hits() {
        let mut pos = long_position();
        pos.trail_stop = None;
        assert!(!pos.trail_stop_hit(0.0, 1000.0));
    }

    #[test]
    fn trail_stop_long_uses_low() {
        let pos = long_position();
        assert!(pos.trail_stop_hit(97.0, 101.0));
        assert!(!pos.trail_stop_hit(97.5, 101.0));
    }

    #[test]
    fn target_long_uses_high() {
        let pos = long_position();
        assert!(pos.target_hit(99.0, 110.0));
        assert!(pos.target_hit(99.0, 112.0));
        assert!(!pos.target_hit(99.0, 109.9));
    }

    #[test]
    fn target_short_uses_low() {
        let pos = short_position();
        assert!(pos.target_hit(90.0, 101.0));
        assert!(!pos.target_hit(90.1, 101.0));
    }

    #[test]
    fn exit_reason_display() {
        assert_eq!(ExitReason::Stop.to_string(), "stop");
        assert_eq!(ExitReason::TrailingStop.to_string(), "trailing-stop");
        assert_eq!(ExitReason::EndOfData.to_string(), "end-of-data");
    }

    #[test]
    fn trade_serializes_required_fields() {
        let trade = Trade {
            ticker: "DIS".into(),
            entry_index: 3,
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
            entry_price: 100.0,
            exit_index: 7,
            exit_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            exit_price: 110.0,
            exit_reason: ExitReason::Target,
            size_fraction: 1.0,
            realized_return: 0.10,
        };
        let json = serde_json::to_string(&trade).unwrap();
        for field in [
            "entry_index",
            "entry_price",
            "exit_index",
            "exit_price",
            "exit_reason",
            "size_fraction",
            "realized_return",
        ] {
            assert!(json.contains(field), "missing {}", field);
        }
        assert!(json.contains("\"target\""));
    }
}
