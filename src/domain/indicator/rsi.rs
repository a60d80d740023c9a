//! RSI (Relative Strength Index) over closing prices.
//!
//! Wilder's smoothing for the average gain/loss:
//! - Seed: simple mean of the first `period` gains/losses
//! - After: avg = (prev_avg * (period - 1) + current) / period
//!
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss)); avg_loss == 0 gives 100.
//! The seed and smoothing constant are part of the contract: re-running the
//! same series must reproduce values bit-for-bit.
//!
//! Warmup: the first `period` bars are invalid; each bar contributes one
//! price change, and the seed needs `period` of them.

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};

pub fn calculate_rsi(bars: &[Bar], period: usize) -> IndicatorSeries {
    let mut points = Vec::with_capacity(bars.len());

    if period == 0 || bars.len() < period + 1 {
        points.resize(bars.len(), IndicatorPoint::invalid());
        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            points,
        };
    }

    points.push(IndicatorPoint::invalid());

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for i in 1..bars.len() {
        let change = bars[i].close - bars[i - 1].close;
        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { -change } else { 0.0 };

        if i < period {
            // Accumulating toward the seed; value still undefined.
            avg_gain += gain;
            avg_loss += loss;
            points.push(IndicatorPoint::invalid());
            continue;
        }

        if i == period {
            avg_gain = (avg_gain + gain) / period as f64;
            avg_loss = (avg_loss + loss) / period as f64;
        } else {
            avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
        }

        let rsi = if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
        };
        points.push(IndicatorPoint::valid(rsi));
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        points,
    }
}
