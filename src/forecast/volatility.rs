// =============================================================================
// EWMA Volatility Forecaster
// =============================================================================
//
// Forecasts next-period volatility as the exponentially weighted moving
// average of squared percentage returns (the RiskMetrics recursion):
//
//   var_t = lambda * var_{t-1} + (1 - lambda) * r_t^2
//
// The forecast is sqrt(var) of the latest step, in percent. A persistence
// of 0.94 is the standard choice for intraday horizons.
// =============================================================================

use tracing::trace;

use crate::gate::{ModelError, VolatilityModel};
use crate::market_data::BarWindow;

/// Default EWMA persistence factor.
const DEFAULT_LAMBDA: f64 = 0.94;

/// Default minimum bars before a forecast is produced.
const DEFAULT_MIN_BARS: usize = 50;

pub struct EwmaVolatilityForecaster {
    lambda: f64,
    min_bars: usize,
}

impl EwmaVolatilityForecaster {
    pub fn new(lambda: f64, min_bars: usize) -> Self {
        Self { lambda, min_bars }
    }
}

impl Default for EwmaVolatilityForecaster {
    fn default() -> Self {
        Self::new(DEFAULT_LAMBDA, DEFAULT_MIN_BARS)
    }
}

impl VolatilityModel for EwmaVolatilityForecaster {
    fn forecast(&self, window: &BarWindow) -> Result<f64, ModelError> {
        let closes = window.closes();
        if closes.len() < self.min_bars {
            return Err(ModelError::InsufficientHistory {
                needed: self.min_bars,
                got: closes.len(),
            });
        }

        // Percentage returns.
        let mut returns = Vec::with_capacity(closes.len() - 1);
        for pair in closes.windows(2) {
            if pair[0] == 0.0 {
                return Err(ModelError::Numeric("zero close in return series".into()));
            }
            returns.push((pair[1] / pair[0] - 1.0) * 100.0);
        }

        // Seed with the plain variance of the series, then run the recursion.
        let mean = returns.iter().sum::<f64>() / returns.len() as f64;
        let mut variance =
            returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;

        for &r in &returns {
            variance = self.lambda * variance + (1.0 - self.lambda) * r * r;
        }

        let forecast = variance.sqrt();
        if !forecast.is_finite() {
            return Err(ModelError::Numeric("non-finite variance".into()));
        }

        trace!(forecast = format!("{forecast:.4}"), "EWMA volatility forecast");
        Ok(forecast)
    }
}
