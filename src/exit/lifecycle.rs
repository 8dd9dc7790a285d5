// =============================================================================
// Position Lifecycle - ordered exit checks and stop tightening
// =============================================================================
//
// Evaluated once per cycle for the open position. Check order:
//
//   1. Stop-loss     - price crossed the stop adversely
//   2. Take-profit   - price crossed the target favourably
//   3. Time box      - holding time exceeded the configured maximum
//   4. ML early exit - predicted TP-before-SL probability under the floor
//
// Hard levels (1, 2) always win over the time box and the ML exit: a stale
// time or model check must never override a level that is already
// breached. Exactly one exit fires per terminating cycle.
//
// When nothing exits, the trailing policy may tighten the stop instead.
// Tightening and closing are independent single-step operations; the
// orchestrator applies each against the broker on its own, so a failed
// collaborator call leaves no half-updated position behind.
// =============================================================================

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::exit::trailing::TrailingPolicy;
use crate::indicators::macd::calculate_macd;
use crate::indicators::rsi::latest_rsi;
use crate::market_data::BarWindow;
use crate::ml::exit_model::{ExitProbabilityModel, ExitSnapshot};
use crate::position::{ExitReason, Position};
use crate::types::Direction;

/// What the lifecycle wants done with the position this cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LifecycleAction {
    Hold,
    TightenStop(f64),
    Close(ExitReason),
}

/// Fixed lifecycle parameters.
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    pub max_holding_minutes: f64,
    pub exit_probability_floor: f64,
    pub point_size: f64,
}

pub struct LifecycleManager {
    trailing: TrailingPolicy,
    settings: LifecycleSettings,
    exit_model: Box<dyn ExitProbabilityModel>,
}

impl LifecycleManager {
    pub fn new(
        trailing: TrailingPolicy,
        settings: LifecycleSettings,
        exit_model: Box<dyn ExitProbabilityModel>,
    ) -> Self {
        Self {
            trailing,
            settings,
            exit_model,
        }
    }

    /// Decide this cycle's action for `position` given the fresh window.
    pub fn evaluate(
        &self,
        position: &Position,
        window: &BarWindow,
        now: DateTime<Utc>,
    ) -> LifecycleAction {
        let Some(price) = window.last().map(|b| b.close) else {
            warn!(id = %position.id, "empty window, holding position");
            return LifecycleAction::Hold;
        };

        let is_long = position.direction == Direction::Long;

        // 1. Stop-loss (a zero stop is unset and cannot trigger).
        if position.stop_loss > 0.0 {
            let sl_hit = if is_long {
                price <= position.stop_loss
            } else {
                price >= position.stop_loss
            };
            if sl_hit {
                return LifecycleAction::Close(ExitReason::StopLoss);
            }
        }

        // 2. Take-profit.
        if position.take_profit > 0.0 {
            let tp_hit = if is_long {
                price >= position.take_profit
            } else {
                price <= position.take_profit
            };
            if tp_hit {
                return LifecycleAction::Close(ExitReason::TakeProfit);
            }
        }

        // 3. Time box.
        let elapsed = position.elapsed_minutes(now);
        if elapsed > self.settings.max_holding_minutes {
            debug!(
                id = %position.id,
                elapsed_minutes = format!("{elapsed:.1}"),
                limit = self.settings.max_holding_minutes,
                "time box exceeded"
            );
            return LifecycleAction::Close(ExitReason::TimeLimit);
        }

        // 4. ML early exit. A missing snapshot or an erroring model means
        //    hold: the model only ever ADDS an exit, never blocks one.
        if let Some(snapshot) = build_snapshot(position, price, elapsed, window) {
            match self.exit_model.score(&snapshot) {
                Ok(probability) if probability < self.settings.exit_probability_floor => {
                    debug!(
                        id = %position.id,
                        probability = format!("{probability:.3}"),
                        floor = self.settings.exit_probability_floor,
                        "exit model forced an early close"
                    );
                    return LifecycleAction::Close(ExitReason::MlExit);
                }
                Ok(probability) => {
                    debug!(
                        id = %position.id,
                        probability = format!("{probability:.3}"),
                        "exit model content to hold"
                    );
                }
                Err(e) => {
                    warn!(id = %position.id, error = %e, "exit model unavailable, holding");
                }
            }
        }

        // Nothing terminated: see whether the stop can ratchet.
        match self
            .trailing
            .improved_stop(position, price, self.settings.point_size)
        {
            Some(stop) => LifecycleAction::TightenStop(stop),
            None => LifecycleAction::Hold,
        }
    }
}

/// Snapshot the position for the exit model. `None` when the window is too
/// short for the model's indicator inputs.
fn build_snapshot(
    position: &Position,
    price: f64,
    elapsed_minutes: f64,
    window: &BarWindow,
) -> Option<ExitSnapshot> {
    let closes = window.closes();
    let rsi2 = latest_rsi(&closes, 2)?;
    let macd = calculate_macd(&closes)?;

    Some(ExitSnapshot {
        elapsed_minutes,
        unrealized_pnl_pct: position.unrealized_pnl_pct(price),
        direction: position.direction,
        rsi2,
        macd_hist: macd.histogram,
    })
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::Bar;
    use crate::ml::ScoreError;
    use chrono::DateTime;

    struct FixedExit(f64);

    impl ExitProbabilityModel for FixedExit {
        fn score(&self, _snapshot: &ExitSnapshot) -> Result<f64, ScoreError> {
            Ok(self.0)
        }
    }

    struct FailingExit;

    impl ExitProbabilityModel for FailingExit {
        fn score(&self, _snapshot: &ExitSnapshot) -> Result<f64, ScoreError> {
            Err(ScoreError::Unavailable("model file corrupt".into()))
        }
    }

    fn window_at(price: f64) -> BarWindow {
        // 60 gently wobbling bars ending exactly at `price`, enough history
        // for the snapshot indicators.
        let mut closes: Vec<f64> = (0..59)
            .map(|i| price + (i as f64 * 0.4).sin() * 0.8)
            .collect();
        closes.push(price);
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                open_time: DateTime::from_timestamp(i as i64 * 900, 0).unwrap(),
                open: c,
                high: c + 0.5,
                low: c - 0.5,
                close: c,
                volume: 100.0,
            })
            .collect();
        BarWindow::from_bars(500, bars)
    }

    fn position(direction: Direction, entry: f64, stop: f64, tp: f64) -> Position {
        Position {
            id: "t-1".to_string(),
            symbol: "XAUUSD".to_string(),
            direction,
            entry_price: entry,
            entry_time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            stop_loss: stop,
            take_profit: tp,
            size: 0.1,
            strategy_label: "test".to_string(),
        }
    }

    fn manager(exit_probability: f64) -> LifecycleManager {
        LifecycleManager::new(
            TrailingPolicy::new(100.0, false),
            LifecycleSettings {
                max_holding_minutes: 90.0,
                exit_probability_floor: 0.35,
                point_size: 0.01,
            },
            Box::new(FixedExit(exit_probability)),
        )
    }

    /// A time shortly after entry.
    fn soon(pos: &Position) -> DateTime<Utc> {
        pos.entry_time + chrono::Duration::minutes(5)
    }

    #[test]
    fn long_stop_loss_fires() {
        let pos = position(Direction::Long, 2000.0, 1998.5, 2003.0);
        let action = manager(0.9).evaluate(&pos, &window_at(1998.0), soon(&pos));
        assert_eq!(action, LifecycleAction::Close(ExitReason::StopLoss));
    }

    #[test]
    fn long_take_profit_fires() {
        let pos = position(Direction::Long, 2000.0, 1998.5, 2003.0);
        let action = manager(0.9).evaluate(&pos, &window_at(2003.5), soon(&pos));
        assert_eq!(action, LifecycleAction::Close(ExitReason::TakeProfit));
    }

    #[test]
    fn short_stop_loss_fires() {
        let pos = position(Direction::Short, 2000.0, 2001.5, 1997.0);
        let action = manager(0.9).evaluate(&pos, &window_at(2002.0), soon(&pos));
        assert_eq!(action, LifecycleAction::Close(ExitReason::StopLoss));
    }

    #[test]
    fn short_take_profit_fires() {
        let pos = position(Direction::Short, 2000.0, 2001.5, 1997.0);
        let action = manager(0.9).evaluate(&pos, &window_at(1996.5), soon(&pos));
        assert_eq!(action, LifecycleAction::Close(ExitReason::TakeProfit));
    }

    #[test]
    fn time_box_fires_when_levels_are_quiet() {
        // 95 minutes elapsed against a 90-minute box, price mid-range.
        let pos = position(Direction::Long, 2000.0, 1998.5, 2003.0);
        let later = pos.entry_time + chrono::Duration::minutes(95);
        let action = manager(0.9).evaluate(&pos, &window_at(2000.5), later);
        assert_eq!(action, LifecycleAction::Close(ExitReason::TimeLimit));
    }

    #[test]
    fn stop_loss_beats_time_box_when_both_are_true() {
        // Price sits under the stop AND the box has expired: the hard
        // level must win.
        let pos = position(Direction::Long, 2000.0, 1998.5, 2003.0);
        let later = pos.entry_time + chrono::Duration::minutes(120);
        let action = manager(0.9).evaluate(&pos, &window_at(1998.0), later);
        assert_eq!(action, LifecycleAction::Close(ExitReason::StopLoss));
    }

    #[test]
    fn take_profit_beats_ml_exit() {
        // The model screams exit, but the target is already crossed.
        let pos = position(Direction::Long, 2000.0, 1998.5, 2003.0);
        let action = manager(0.0).evaluate(&pos, &window_at(2003.5), soon(&pos));
        assert_eq!(action, LifecycleAction::Close(ExitReason::TakeProfit));
    }

    #[test]
    fn low_probability_forces_ml_exit() {
        let pos = position(Direction::Long, 2000.0, 1998.5, 2003.0);
        let action = manager(0.2).evaluate(&pos, &window_at(2000.5), soon(&pos));
        assert_eq!(action, LifecycleAction::Close(ExitReason::MlExit));
    }

    #[test]
    fn probability_at_the_floor_holds() {
        let pos = position(Direction::Long, 2000.0, 1998.5, 2003.0);
        let action = manager(0.35).evaluate(&pos, &window_at(2000.5), soon(&pos));
        assert_ne!(action, LifecycleAction::Close(ExitReason::MlExit));
    }

    #[test]
    fn failing_exit_model_holds_instead_of_closing() {
        let pos = position(Direction::Long, 2000.0, 1998.5, 2003.0);
        let lifecycle = LifecycleManager::new(
            TrailingPolicy::new(100.0, false),
            LifecycleSettings {
                max_holding_minutes: 90.0,
                exit_probability_floor: 0.35,
                point_size: 0.01,
            },
            Box::new(FailingExit),
        );
        let action = lifecycle.evaluate(&pos, &window_at(2000.5), soon(&pos));
        assert_eq!(action, LifecycleAction::Hold);
    }

    #[test]
    fn profitable_run_tightens_the_stop() {
        // Price at 2005.0: candidate stop 2004.0 beats entry and stop, and
        // no exit condition holds (TP is far away).
        let pos = position(Direction::Long, 2000.0, 1998.5, 2010.0);
        let action = manager(0.9).evaluate(&pos, &window_at(2005.0), soon(&pos));
        assert_eq!(action, LifecycleAction::TightenStop(2004.0));
    }

    #[test]
    fn retrace_after_ratchet_holds_instead_of_loosening() {
        let pos = position(Direction::Long, 2000.0, 2004.0, 2010.0);
        let action = manager(0.9).evaluate(&pos, &window_at(2005.5), soon(&pos));
        // Candidate 2004.5 beats 2004.0: tighten. Then from 2004.5, a pull
        // back to 2005.0 gives candidate 2004.0 < 2004.5: hold.
        assert_eq!(action, LifecycleAction::TightenStop(2004.5));

        let mut tightened = pos.clone();
        tightened.stop_loss = 2004.5;
        let action = manager(0.9).evaluate(&tightened, &window_at(2005.0), soon(&pos));
        assert_eq!(action, LifecycleAction::Hold);
    }

    #[test]
    fn unset_levels_never_trigger() {
        // Both levels zero (adopted ticket): only time/ML/trailing apply.
        let pos = position(Direction::Long, 2000.0, 0.0, 0.0);
        let action = manager(0.9).evaluate(&pos, &window_at(1990.0), soon(&pos));
        assert_eq!(action, LifecycleAction::Hold);
    }
}
