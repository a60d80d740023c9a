//! Post-trade statistics over a completed trade log.
//!
//! Pure read-only computation; nothing here feeds back into execution.

use serde::Serialize;

use crate::domain::position::Trade;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeStats {
    pub trades: usize,
    /// Fraction of trades with a positive realized return.
    pub win_rate: f64,
    /// Mean realized return weighted by size fraction.
    pub expectancy: f64,
    /// Mean winning return over mean losing magnitude. `None` when there
    /// are no losing trades; reported as "n/a" rather than infinity.
    pub risk_reward: Option<f64>,
}

impl TradeStats {
    pub fn compute(trades: &[Trade]) -> Self {
        if trades.is_empty() {
            return TradeStats {
                trades: 0,
                win_rate: 0.0,
                expectancy: 0.0,
                risk_reward: None,
            };
        }

        let mut wins = 0usize;
        let mut win_sum = 0.0_f64;
        let mut losses = 0usize;
        let mut loss_sum = 0.0_f64;
        let mut weighted_return = 0.0_f64;
        let mut weight = 0.0_f64;

        for trade in trades {
            let r = trade.realized_return;
            if r > 0.0 {
                wins += 1;
                win_sum += r;
            } else if r < 0.0 {
                losses += 1;
                loss_sum += r.abs();
            }
            weighted_return += r * trade.size_fraction;
            weight += trade.size_fraction;
        }

        let win_rate = wins as f64 / trades.len() as f64;
        let expectancy = if weight > 0.0 {
            weighted_return / weight
        } else {
            0.0
        };
        let risk_reward = if losses > 0 && wins > 0 {
            Some((win_sum / wins as f64) / (loss_sum / losses as f64))
        } else if losses > 0 {
            Some(0.0)
        } else {
            None
        };

        TradeStats {
            trades: trades.len(),
            win_rate,
            expectancy,
            risk_reward,
        }
    }
}
