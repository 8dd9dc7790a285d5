// =============================================================================
// Exit Probability Model - TP-before-SL scoring for open positions
// =============================================================================
//
// Once per cycle the lifecycle manager snapshots the open position and asks
// the exit model for the probability of reaching take-profit before the
// stop. Probabilities under the configured floor force an early close.
//
// The shipped [`LogisticExitModel`] is a transparent three-factor logistic:
// unrealised pnl, momentum agreement, and holding time. A trained model
// implements the same trait.
// =============================================================================

use serde::Serialize;

use crate::ml::ScoreError;
use crate::types::Direction;

/// Inputs to the exit model, taken at evaluation time.
#[derive(Debug, Clone, Serialize)]
pub struct ExitSnapshot {
    pub elapsed_minutes: f64,
    pub unrealized_pnl_pct: f64,
    pub direction: Direction,
    pub rsi2: f64,
    pub macd_hist: f64,
}

/// Scores the probability (in `[0, 1]`) of the position reaching TP
/// before SL.
pub trait ExitProbabilityModel: Send + Sync {
    fn score(&self, snapshot: &ExitSnapshot) -> Result<f64, ScoreError>;
}

// ---------------------------------------------------------------------------
// Baseline implementation
// ---------------------------------------------------------------------------

/// Three-factor logistic baseline.
pub struct LogisticExitModel {
    pnl_weight: f64,
    momentum_weight: f64,
    time_weight: f64,
    /// Minutes of holding time that count as one unit of time decay.
    time_scale_minutes: f64,
}

impl LogisticExitModel {
    pub fn new(
        pnl_weight: f64,
        momentum_weight: f64,
        time_weight: f64,
        time_scale_minutes: f64,
    ) -> Self {
        Self {
            pnl_weight,
            momentum_weight,
            time_weight,
            time_scale_minutes,
        }
    }
}

impl Default for LogisticExitModel {
    fn default() -> Self {
        Self::new(1.2, 0.4, -0.5, 90.0)
    }
}

impl ExitProbabilityModel for LogisticExitModel {
    fn score(&self, snapshot: &ExitSnapshot) -> Result<f64, ScoreError> {
        if !(snapshot.elapsed_minutes.is_finite()
            && snapshot.unrealized_pnl_pct.is_finite()
            && snapshot.macd_hist.is_finite())
        {
            return Err(ScoreError::Unavailable("non-finite snapshot".into()));
        }

        // +1 when momentum currently points with the position, -1 against.
        let momentum_agreement = if snapshot.macd_hist == 0.0 {
            0.0
        } else {
            snapshot.direction.sign() * snapshot.macd_hist.signum()
        };

        let z = self.pnl_weight * snapshot.unrealized_pnl_pct
            + self.momentum_weight * momentum_agreement
            + self.time_weight * (snapshot.elapsed_minutes / self.time_scale_minutes);

        Ok(1.0 / (1.0 + (-z).exp()))
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(elapsed: f64, pnl_pct: f64, hist: f64) -> ExitSnapshot {
        ExitSnapshot {
            elapsed_minutes: elapsed,
            unrealized_pnl_pct: pnl_pct,
            direction: Direction::Long,
            rsi2: 50.0,
            macd_hist: hist,
        }
    }

    #[test]
    fn probability_stays_in_unit_interval() {
        let model = LogisticExitModel::default();
        for pnl in [-5.0, -1.0, 0.0, 1.0, 5.0] {
            for elapsed in [0.0, 45.0, 200.0] {
                let p = model.score(&snapshot(elapsed, pnl, 0.5)).unwrap();
                assert!((0.0..=1.0).contains(&p), "p = {p}");
            }
        }
    }

    #[test]
    fn fresh_winner_scores_above_the_default_floor() {
        let model = LogisticExitModel::default();
        let p = model.score(&snapshot(5.0, 0.3, 0.5)).unwrap();
        assert!(p > 0.35, "fresh winner scored {p}");
    }

    #[test]
    fn stale_loser_scores_below_the_default_floor() {
        let model = LogisticExitModel::default();
        let p = model.score(&snapshot(80.0, -0.8, -0.5)).unwrap();
        assert!(p < 0.35, "stale loser scored {p}");
    }

    #[test]
    fn probability_is_monotonic_in_pnl() {
        let model = LogisticExitModel::default();
        let worse = model.score(&snapshot(30.0, -1.0, 0.0)).unwrap();
        let better = model.score(&snapshot(30.0, 1.0, 0.0)).unwrap();
        assert!(better > worse);
    }

    #[test]
    fn adverse_momentum_lowers_probability() {
        let model = LogisticExitModel::default();
        let with = model.score(&snapshot(30.0, 0.2, 0.5)).unwrap();
        let against = model.score(&snapshot(30.0, 0.2, -0.5)).unwrap();
        assert!(with > against);
    }

    #[test]
    fn short_positions_flip_the_momentum_term() {
        let model = LogisticExitModel::default();
        let mut snap = snapshot(30.0, 0.2, -0.5);
        snap.direction = Direction::Short;
        // Falling histogram agrees with a short.
        let p_short = model.score(&snap).unwrap();
        let p_long = model.score(&snapshot(30.0, 0.2, -0.5)).unwrap();
        assert!(p_short > p_long);
    }

    #[test]
    fn non_finite_snapshot_is_unavailable() {
        let model = LogisticExitModel::default();
        let err = model.score(&snapshot(30.0, f64::NAN, 0.5)).unwrap_err();
        assert!(matches!(err, ScoreError::Unavailable(_)));
    }
}
