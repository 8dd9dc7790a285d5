// =============================================================================
// Structure Breakout Strategy
// =============================================================================
//
// Votes on breaks of recent market structure:
//   close above the prior N-bar rolling high => vote long
//   close below the prior N-bar rolling low  => vote short
// The look-back window ends at the bar BEFORE the current one, so the
// current bar can never confirm a break against its own extreme.
// =============================================================================

use crate::market_data::BarWindow;
use crate::signals::{SignalStrategy, SignalVote};
use crate::types::Direction;

pub const NAME: &str = "Structure";

pub struct StructureBreakout {
    lookback: usize,
}

impl StructureBreakout {
    pub fn new(lookback: usize) -> Self {
        Self { lookback }
    }
}

impl SignalStrategy for StructureBreakout {
    fn name(&self) -> &'static str {
        NAME
    }

    fn min_bars(&self) -> usize {
        // The current bar plus a full prior look-back.
        self.lookback + 1
    }

    fn evaluate(&self, window: &BarWindow) -> SignalVote {
        let abstain = SignalVote {
            strategy: NAME,
            direction: None,
        };

        let n = window.len();
        if self.lookback == 0 || n < self.min_bars() {
            return abstain;
        }

        let highs = window.highs();
        let lows = window.lows();
        let Some(close) = window.last().map(|b| b.close) else {
            return abstain;
        };

        // Prior N bars, current bar excluded.
        let prior_high = highs[n - 1 - self.lookback..n - 1]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let prior_low = lows[n - 1 - self.lookback..n - 1]
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);

        if !prior_high.is_finite() || !prior_low.is_finite() {
            return abstain;
        }

        let direction = if close > prior_high {
            Some(Direction::Long)
        } else if close < prior_low {
            Some(Direction::Short)
        } else {
            None
        };

        SignalVote {
            strategy: NAME,
            direction,
        }
    }
}
