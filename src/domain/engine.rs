//! Execution state machine: walks one ticker's bars in forward time order,
//! maintains the open-position state, and emits a deterministic trade log.
//!
//! Two states, `Flat` and `InPosition`, evaluated once per bar in strictly
//! increasing index order. A decision at index `i` may use only data from
//! indices `<= i`; at most one position is open at any bar.
//!
//! Numeric semantics, fixed for the whole crate:
//! - Stop and target breaches are evaluated against the bar's intrabar
//!   high/low, not close-only. A stop can trigger between opens, and this
//!   changes results versus close-only evaluation.
//! - Comparisons are touch-inclusive: a long stop triggers on
//!   `low <= stop`, a long target on `high >= target` (mirrored for
//!   shorts). Exact price equality always triggers.
//! - Exit priority within one bar: hard stop, then trailing stop, then
//!   target/partial, then signal exit. The first match wins; exactly one
//!   exit event is applied per bar.
//! - Stop and target fills execute at the level itself.

use crate::domain::bar::Bar;
use crate::domain::indicator::IndicatorSet;
use crate::domain::policy::{EntryParams, StrategyPolicy, TrailMode};
use crate::domain::position::{Direction, ExitReason, PositionState, Trade, TradeLog};

/// Entry-price convention, applied uniformly across a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryFill {
    /// Fill at the decision bar's close. Exit management starts the next
    /// bar; there is no intrabar range left after the close.
    SameBarClose,
    /// Fill at the next bar's open. Exit management runs on the fill bar
    /// itself, so an entry can stop out on its own day. A signal on the
    /// final bar produces no entry.
    NextBarOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub entry_fill: EntryFill,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            entry_fill: EntryFill::NextBarOpen,
        }
    }
}

/// Run the state machine over one ticker's bars and precomputed indicators.
///
/// The policy's entry parameters must already be validated (policy
/// construction rejects bad configurations); an invalid parameter set here
/// is a programming error.
pub fn run<P: StrategyPolicy>(
    bars: &[Bar],
    indicators: &IndicatorSet,
    policy: &P,
    config: &EngineConfig,
) -> TradeLog {
    let required = policy.required_indicators();
    let mut log = TradeLog::new();
    let mut open: Option<(PositionState, EntryParams)> = None;
    let mut pending_entry: Option<Direction> = None;

    for (i, bar) in bars.iter().enumerate() {
        // Fill a pending next-bar-open entry before anything else.
        if open.is_none() {
            if let Some(direction) = pending_entry.take() {
                open = Some(open_position(policy, direction, i, bar, bar.open));
            }
        }

        let mut exited_this_bar = false;

        // Manage the open position. A same-bar-close entry is created
        // after this block, so its entry bar is never managed; a
        // next-bar-open fill (above) is managed on its fill bar.
        if let Some((mut position, params)) = open.take() {
            match first_exit(&position, &params, policy, i, bars, indicators) {
                Some(ExitEvent::Full { price, reason }) => {
                    emit(&mut log, &position, i, bar, price, reason, position.remaining_fraction);
                    exited_this_bar = true;
                }
                Some(ExitEvent::Partial { price }) => {
                    emit(&mut log, &position, i, bar, price, ExitReason::Partial, params.partial_fraction);
                    position.remaining_fraction -= params.partial_fraction;
                    position.partial_done = true;
                    if params.breakeven_after_partial {
                        ratchet_hard_stop_to_breakeven(&mut position);
                    }
                    if position.remaining_fraction <= f64::EPSILON {
                        // Partial tranches exhausted the position size.
                        exited_this_bar = true;
                    } else {
                        update_trail(&mut position, &params, bar.close);
                        open = Some((position, params));
                    }
                }
                None => {
                    update_trail(&mut position, &params, bar.close);
                    open = Some((position, params));
                }
            }
        }

        // Entry decision while flat. Suppressed on a bar that just closed a
        // position, when any required indicator is undefined, and (for
        // next-bar-open fills) on the final bar.
        if open.is_none() && pending_entry.is_none() && !exited_this_bar {
            if indicators.all_valid_at(&required, i) {
                if let Some(direction) = policy.should_enter(i, bars, indicators) {
                    match config.entry_fill {
                        EntryFill::SameBarClose => {
                            open = Some(open_position(policy, direction, i, bar, bar.close));
                        }
                        EntryFill::NextBarOpen => {
                            if i + 1 < bars.len() {
                                pending_entry = Some(direction);
                            }
                        }
                    }
                }
            }
        }
    }

    // Terminal handling: never drop an open position silently.
    if let Some((position, _)) = open {
        let last = bars
            .len()
            .checked_sub(1)
            .expect("open position implies at least one bar");
        emit(
            &mut log,
            &position,
            last,
            &bars[last],
            bars[last].close,
            ExitReason::EndOfData,
            position.remaining_fraction,
        );
    }

    log
}

enum ExitEvent {
    Full { price: f64, reason: ExitReason },
    Partial { price: f64 },
}

/// Evaluate the fixed exit-priority ladder for one bar. Returns the first
/// matching exit, or `None` when the position survives the bar.
fn first_exit<P: StrategyPolicy>(
    position: &PositionState,
    params: &EntryParams,
    policy: &P,
    i: usize,
    bars: &[Bar],
    indicators: &IndicatorSet,
) -> Option<ExitEvent> {
    let bar = &bars[i];

    if position.hard_stop_hit(bar.low, bar.high) {
        return Some(ExitEvent::Full {
            price: position.hard_stop,
            reason: ExitReason::Stop,
        });
    }

    if position.trail_stop_hit(bar.low, bar.high) {
        return Some(ExitEvent::Full {
            price: position
                .trail_stop
                .expect("trail_stop_hit implies a trail level"),
            reason: ExitReason::TrailingStop,
        });
    }

    if position.target_hit(bar.low, bar.high) {
        if !position.partial_done && params.partial_fraction < 1.0 {
            return Some(ExitEvent::Partial {
                price: position.target,
            });
        }
        return Some(ExitEvent::Full {
            price: position.target,
            reason: ExitReason::Target,
        });
    }

    if policy.should_exit(i, bars, indicators, position) {
        return Some(ExitEvent::Full {
            price: bar.close,
            reason: ExitReason::Signal,
        });
    }

    None
}

fn open_position<P: StrategyPolicy>(
    policy: &P,
    direction: Direction,
    entry_index: usize,
    entry_bar: &Bar,
    entry_price: f64,
) -> (PositionState, EntryParams) {
    let params = policy.entry_params(entry_price);
    debug_assert!(params.validate().is_ok(), "unvalidated entry params");

    let (hard_stop, target) = match direction {
        Direction::Long => (
            entry_price - params.stop_distance,
            entry_price + params.target_distance,
        ),
        Direction::Short => (
            entry_price + params.stop_distance,
            entry_price - params.target_distance,
        ),
    };

    let trail_stop = match (direction, params.trail) {
        (_, TrailMode::Off) => None,
        (Direction::Long, TrailMode::Distance(d)) => Some(entry_price - d),
        (Direction::Short, TrailMode::Distance(d)) => Some(entry_price + d),
    };

    let position = PositionState {
        direction,
        entry_index,
        entry_date: entry_bar.date,
        entry_price,
        hard_stop,
        trail_stop,
        target,
        extreme_price: entry_price,
        remaining_fraction: 1.0,
        partial_done: false,
    };

    (position, params)
}

/// Ratchet the trailing reference and level. The trail only ever moves in
/// the position's favor: for longs it is non-decreasing, for shorts
/// non-increasing, across consecutive bars.
fn update_trail(position: &mut PositionState, params: &EntryParams, close: f64) {
    let TrailMode::Distance(d) = params.trail else {
        return;
    };
    match position.direction {
        Direction::Long => {
            if close > position.extreme_price {
                position.extreme_price = close;
            }
            let candidate = position.extreme_price - d;
            let current = position.trail_stop.unwrap_or(f64::NEG_INFINITY);
            position.trail_stop = Some(current.max(candidate));
        }
        Direction::Short => {
            if close < position.extreme_price {
                position.extreme_price = close;
            }
            let candidate = position.extreme_price + d;
            let current = position.trail_stop.unwrap_or(f64::INFINITY);
            position.trail_stop = Some(current.min(candidate));
        }
    }
}

fn ratchet_hard_stop_to_breakeven(position: &mut PositionState) {
    match position.direction {
        Direction::Long => {
            position.hard_stop = position.hard_stop.max(position.entry_price);
        }
        Direction::Short => {
            position.hard_stop = position.hard_stop.min(position.entry_price);
        }
    }
}

fn emit(
    log: &mut TradeLog,
    position: &PositionState,
    exit_index: usize,
    exit_bar: &Bar,
    exit_price: f64,
    exit_reason: ExitReason,
    size_fraction: f64,
) {
    debug_assert!(
        size_fraction > 0.0 && size_fraction <= 1.0 + f64::EPSILON,
        "size fraction out of range: {size_fraction}"
    );
    log.push(Trade {
        ticker: exit_bar.ticker.clone(),
        entry_index: position.entry_index,
        entry_date: position.entry_date,
        entry_price: position.entry_price,
        exit_index,
        exit_date: exit_bar.date,
        exit_price,
        exit_reason,
        size_fraction,
        realized_return: position.return_at(exit_price),
    });
}
