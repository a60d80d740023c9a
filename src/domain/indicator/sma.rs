//! Simple moving average over closing prices.
//!
//! Warmup: the first `period - 1` points are invalid. A window longer than
//! the series (or a zero period) yields an all-invalid series, not an error.

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};

pub fn calculate_sma(bars: &[Bar], period: usize) -> IndicatorSeries {
    let mut points = Vec::with_capacity(bars.len());

    if period == 0 || period > bars.len() {
        points.resize(bars.len(), IndicatorPoint::invalid());
        return IndicatorSeries {
            indicator_type: IndicatorType::Sma(period),
            points,
        };
    }

    // Rolling sum; one add and one subtract per bar after the window fills.
    let mut window_sum = 0.0;
    for (i, bar) in bars.iter().enumerate() {
        window_sum += bar.close;
        if i >= period {
            window_sum -= bars[i - period].close;
        }

        if i + 1 >= period {
            points.push(IndicatorPoint::valid(window_sum / period as f64));
        } else {
            points.push(IndicatorPoint::invalid());
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        points,
    }
}
