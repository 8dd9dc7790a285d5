// =============================================================================
// Regime / Volatility Gate - pre-trade statistical veto
// =============================================================================
//
// Before any entry signal is considered, two statistical models must agree
// that conditions are tradeable:
//
//   1. The volatility forecaster predicts next-period percentage std-dev;
//      forecasts above the configured ceiling veto the cycle.
//   2. The regime classifier labels the window; the market must currently
//      sit in its dominant regime (not mid-transition).
//
// The gate FAILS CLOSED: if either model errors (insufficient history,
// numeric failure), the verdict is a block, never a crash. Gate failure
// only suppresses new entries; open positions are still managed.
// =============================================================================

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::market_data::BarWindow;

// ---------------------------------------------------------------------------
// Model boundary
// ---------------------------------------------------------------------------

/// Failures from the statistical model collaborators. All of them are
/// expected operating conditions, not bugs: the gate maps every variant to
/// a closed verdict.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("insufficient history: need {needed} bars, have {got}")]
    InsufficientHistory { needed: usize, got: usize },

    #[error("model numeric failure: {0}")]
    Numeric(String),
}

/// Forecasts next-period volatility as a percentage standard deviation.
pub trait VolatilityModel: Send + Sync {
    fn forecast(&self, window: &BarWindow) -> Result<f64, ModelError>;
}

/// Regime labels for the window: the current bar's state and the state
/// that occurred most frequently across the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegimeOutcome {
    pub current: usize,
    pub dominant: usize,
}

/// Classifies the window into discrete hidden states.
pub trait RegimeModel: Send + Sync {
    fn classify(&self, window: &BarWindow) -> Result<RegimeOutcome, ModelError>;
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// The gate's verdict for one cycle, recomputed every bar.
///
/// Model outputs are `None` when the corresponding model failed; `pass` is
/// false in that case (fail closed), with the reason recorded.
#[derive(Debug, Clone, Serialize)]
pub struct GateVerdict {
    pub volatility_forecast: Option<f64>,
    pub regime_current: Option<usize>,
    pub regime_dominant: Option<usize>,
    pub pass: bool,
    pub block_reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// The pre-trade gate, owning its two model collaborators.
pub struct RegimeGate {
    volatility: Box<dyn VolatilityModel>,
    regime: Box<dyn RegimeModel>,
    ceiling_pct: f64,
}

impl RegimeGate {
    pub fn new(
        volatility: Box<dyn VolatilityModel>,
        regime: Box<dyn RegimeModel>,
        ceiling_pct: f64,
    ) -> Self {
        Self {
            volatility,
            regime,
            ceiling_pct,
        }
    }

    /// Evaluate both models over the window and combine them into a verdict.
    pub fn evaluate(&self, window: &BarWindow) -> GateVerdict {
        let forecast = match self.volatility.forecast(window) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(error = %e, "volatility model failed, gate closes");
                None
            }
        };

        let regime = match self.regime.classify(window) {
            Ok(r) => Some(r),
            Err(e) => {
                warn!(error = %e, "regime model failed, gate closes");
                None
            }
        };

        let mut block_reason = None;

        let pass = match (forecast, regime) {
            (Some(vol), Some(reg)) => {
                if vol > self.ceiling_pct {
                    block_reason = Some(format!(
                        "volatility forecast {vol:.3}% above ceiling {:.3}%",
                        self.ceiling_pct
                    ));
                    false
                } else if reg.current != reg.dominant {
                    block_reason = Some(format!(
                        "regime transition: current {} vs dominant {}",
                        reg.current, reg.dominant
                    ));
                    false
                } else {
                    true
                }
            }
            (None, _) => {
                block_reason = Some("volatility model unavailable".to_string());
                false
            }
            (_, None) => {
                block_reason = Some("regime model unavailable".to_string());
                false
            }
        };

        debug!(
            forecast = ?forecast,
            regime = ?regime,
            pass,
            reason = ?block_reason,
            "gate evaluated"
        );

        GateVerdict {
            volatility_forecast: forecast,
            regime_current: regime.map(|r| r.current),
            regime_dominant: regime.map(|r| r.dominant),
            pass,
            block_reason,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::Bar;
    use chrono::DateTime;

    struct FixedVol(f64);

    impl VolatilityModel for FixedVol {
        fn forecast(&self, _window: &BarWindow) -> Result<f64, ModelError> {
            Ok(self.0)
        }
    }

    struct FailingVol;

    impl VolatilityModel for FailingVol {
        fn forecast(&self, _window: &BarWindow) -> Result<f64, ModelError> {
            Err(ModelError::Numeric("fit did not converge".into()))
        }
    }

    struct FixedRegime(usize, usize);

    impl RegimeModel for FixedRegime {
        fn classify(&self, _window: &BarWindow) -> Result<RegimeOutcome, ModelError> {
            Ok(RegimeOutcome {
                current: self.0,
                dominant: self.1,
            })
        }
    }

    struct FailingRegime;

    impl RegimeModel for FailingRegime {
        fn classify(&self, _window: &BarWindow) -> Result<RegimeOutcome, ModelError> {
            Err(ModelError::InsufficientHistory { needed: 60, got: 5 })
        }
    }

    fn window() -> BarWindow {
        let bars: Vec<Bar> = (0..10)
            .map(|i| Bar {
                open_time: DateTime::from_timestamp(i * 900, 0).unwrap(),
                open: 2000.0,
                high: 2001.0,
                low: 1999.0,
                close: 2000.0,
                volume: 100.0,
            })
            .collect();
        BarWindow::from_bars(100, bars)
    }

    #[test]
    fn passes_calm_dominant_regime() {
        let gate = RegimeGate::new(Box::new(FixedVol(0.8)), Box::new(FixedRegime(1, 1)), 2.0);
        let verdict = gate.evaluate(&window());
        assert!(verdict.pass);
        assert!(verdict.block_reason.is_none());
        assert_eq!(verdict.volatility_forecast, Some(0.8));
        assert_eq!(verdict.regime_current, Some(1));
    }

    #[test]
    fn high_volatility_blocks_regardless_of_regime() {
        // Forecast 3.0% against a 2.0% ceiling: blocked even though the
        // regime condition holds.
        let gate = RegimeGate::new(Box::new(FixedVol(3.0)), Box::new(FixedRegime(1, 1)), 2.0);
        let verdict = gate.evaluate(&window());
        assert!(!verdict.pass);
        assert!(verdict.block_reason.unwrap().contains("ceiling"));
    }

    #[test]
    fn regime_transition_blocks() {
        let gate = RegimeGate::new(Box::new(FixedVol(0.5)), Box::new(FixedRegime(0, 1)), 2.0);
        let verdict = gate.evaluate(&window());
        assert!(!verdict.pass);
        assert!(verdict.block_reason.unwrap().contains("transition"));
    }

    #[test]
    fn volatility_exactly_at_ceiling_passes() {
        let gate = RegimeGate::new(Box::new(FixedVol(2.0)), Box::new(FixedRegime(1, 1)), 2.0);
        assert!(gate.evaluate(&window()).pass);
    }

    #[test]
    fn volatility_model_failure_fails_closed() {
        let gate = RegimeGate::new(Box::new(FailingVol), Box::new(FixedRegime(1, 1)), 2.0);
        let verdict = gate.evaluate(&window());
        assert!(!verdict.pass);
        assert!(verdict.volatility_forecast.is_none());
        // The regime model still reported, for the audit trail.
        assert_eq!(verdict.regime_current, Some(1));
    }

    #[test]
    fn regime_model_failure_fails_closed() {
        let gate = RegimeGate::new(Box::new(FixedVol(0.5)), Box::new(FailingRegime), 2.0);
        let verdict = gate.evaluate(&window());
        assert!(!verdict.pass);
        assert!(verdict.regime_current.is_none());
        assert_eq!(verdict.volatility_forecast, Some(0.5));
    }

    #[test]
    fn both_models_failing_fails_closed() {
        let gate = RegimeGate::new(Box::new(FailingVol), Box::new(FailingRegime), 2.0);
        let verdict = gate.evaluate(&window());
        assert!(!verdict.pass);
        assert!(verdict.block_reason.is_some());
    }
}
