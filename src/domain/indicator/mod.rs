//! Technical indicator precomputation.
//!
//! Indicators are computed once per ticker, before the engine walks the
//! bars. Each series is aligned 1:1 with the bar sequence; warm-up points
//! (before the window is filled) carry `valid == false` and are never an
//! error. The engine treats an invalid point as "no value", which
//! suppresses entries but never blocks management of an open position.
//!
//! - `IndicatorType`: indicator identity + parameters (serves as map key)
//! - `IndicatorPoint`: one aligned point, valid flag + value
//! - `IndicatorSeries`: full aligned series for one indicator
//! - `IndicatorSet`: all precomputed series for one ticker

pub mod rsi;
pub mod sma;

use std::collections::HashMap;
use std::fmt;

use crate::domain::bar::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Rsi(usize),
}

impl IndicatorType {
    /// Number of leading bars without a defined value.
    pub fn warmup(&self) -> usize {
        match self {
            IndicatorType::Sma(period) => period.saturating_sub(1),
            // RSI consumes one price change per bar; the seed average needs
            // `period` changes, so the first `period` bars are undefined.
            IndicatorType::Rsi(period) => *period,
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IndicatorPoint {
    pub valid: bool,
    pub value: f64,
}

impl IndicatorPoint {
    pub fn invalid() -> Self {
        IndicatorPoint {
            valid: false,
            value: 0.0,
        }
    }

    pub fn valid(value: f64) -> Self {
        IndicatorPoint { valid: true, value }
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub points: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Value at bar index `i`, or `None` during warm-up / out of range.
    pub fn value_at(&self, i: usize) -> Option<f64> {
        self.points
            .get(i)
            .filter(|p| p.valid)
            .map(|p| p.value)
    }
}

/// All precomputed indicator series for one ticker, keyed by identity.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSet {
    series: HashMap<IndicatorType, IndicatorSeries>,
}

impl IndicatorSet {
    pub fn insert(&mut self, series: IndicatorSeries) {
        self.series.insert(series.indicator_type, series);
    }

    pub fn get(&self, ty: IndicatorType) -> Option<&IndicatorSeries> {
        self.series.get(&ty)
    }

    /// Value of indicator `ty` at bar index `i`; `None` if the series is
    /// absent or the point is in warm-up.
    pub fn value_at(&self, ty: IndicatorType, i: usize) -> Option<f64> {
        self.series.get(&ty).and_then(|s| s.value_at(i))
    }

    /// True when every listed indicator has a defined value at index `i`.
    pub fn all_valid_at(&self, types: &[IndicatorType], i: usize) -> bool {
        types.iter().all(|ty| self.value_at(*ty, i).is_some())
    }
}

/// Compute every requested indicator over one bar series. Deterministic and
/// side-effect free; duplicate requests collapse onto one entry.
pub fn compute_indicators(bars: &[Bar], types: &[IndicatorType]) -> IndicatorSet {
    let mut set = IndicatorSet::default();
    for ty in types {
        if set.get(*ty).is_some() {
            continue;
        }
        let series = match ty {
            IndicatorType::Sma(period) => sma::calculate_sma(bars, *period),
            IndicatorType::Rsi(period) => rsi::calculate_rsi(bars, *period),
        };
        set.insert(series);
    }
    set
}
