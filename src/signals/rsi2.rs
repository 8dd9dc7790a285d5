// =============================================================================
// RSI(2) Momentum Strategy
// =============================================================================
//
// Short-horizon mean reversion on a 2-period RSI:
//   RSI(2) < oversold  (default 10)  => vote long
//   RSI(2) > overbought (default 90) => vote short
// Anything in between abstains.
// =============================================================================

use crate::indicators::rsi::latest_rsi;
use crate::market_data::BarWindow;
use crate::signals::{SignalStrategy, SignalVote};
use crate::types::Direction;

pub const NAME: &str = "RSI2";

/// RSI period. Deliberately tiny: the strategy trades exhaustion spikes,
/// not sustained momentum.
const RSI_PERIOD: usize = 2;

/// Bars required before the smoothed averages are trustworthy.
const MIN_BARS: usize = 20;

pub struct Rsi2Momentum {
    oversold: f64,
    overbought: f64,
}

impl Rsi2Momentum {
    pub fn new(oversold: f64, overbought: f64) -> Self {
        Self {
            oversold,
            overbought,
        }
    }
}

impl SignalStrategy for Rsi2Momentum {
    fn name(&self) -> &'static str {
        NAME
    }

    fn min_bars(&self) -> usize {
        MIN_BARS
    }

    fn evaluate(&self, window: &BarWindow) -> SignalVote {
        if window.len() < MIN_BARS {
            return SignalVote {
                strategy: NAME,
                direction: None,
            };
        }

        let closes = window.closes();
        let direction = match latest_rsi(&closes, RSI_PERIOD) {
            Some(rsi) if rsi < self.oversold => Some(Direction::Long),
            Some(rsi) if rsi > self.overbought => Some(Direction::Short),
            _ => None,
        };

        SignalVote {
            strategy: NAME,
            direction,
        }
    }
}
