// =============================================================================
// Trend Regime Classifier
// =============================================================================
//
// Labels every bar of the window with one of two hidden states from the
// relation of a fast EMA to a slow EMA of closes:
//
//   state 1: fast above slow (upward drift)
//   state 0: fast at or below slow (downward / sideways drift)
//
// The classifier reports the CURRENT state and the DOMINANT state (most
// frequent across the window). The gate trades only when the two agree,
// i.e. when the market is persisting in its prevailing regime rather than
// flipping through a transition.
// =============================================================================

use tracing::trace;

use crate::gate::{ModelError, RegimeModel, RegimeOutcome};
use crate::indicators::ema::calculate_ema;
use crate::market_data::BarWindow;

/// Default fast EMA period for state labelling.
const DEFAULT_FAST: usize = 9;

/// Default slow EMA period for state labelling.
const DEFAULT_SLOW: usize = 21;

/// Default minimum bars before labels are produced.
const DEFAULT_MIN_BARS: usize = 60;

pub struct TrendRegimeClassifier {
    fast: usize,
    slow: usize,
    min_bars: usize,
}

impl TrendRegimeClassifier {
    pub fn new(fast: usize, slow: usize, min_bars: usize) -> Self {
        Self {
            fast,
            slow,
            min_bars,
        }
    }
}

impl Default for TrendRegimeClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_MIN_BARS)
    }
}

impl RegimeModel for TrendRegimeClassifier {
    fn classify(&self, window: &BarWindow) -> Result<RegimeOutcome, ModelError> {
        let closes = window.closes();
        if closes.len() < self.min_bars {
            return Err(ModelError::InsufficientHistory {
                needed: self.min_bars,
                got: closes.len(),
            });
        }

        let fast = calculate_ema(&closes, self.fast);
        let slow = calculate_ema(&closes, self.slow);
        if fast.is_empty() || slow.is_empty() {
            return Err(ModelError::Numeric("EMA series collapsed".into()));
        }

        // Align the series tails; both end at the latest close.
        let len = fast.len().min(slow.len());
        let fast_tail = &fast[fast.len() - len..];
        let slow_tail = &slow[slow.len() - len..];

        let labels: Vec<usize> = fast_tail
            .iter()
            .zip(slow_tail.iter())
            .map(|(f, s)| usize::from(f > s))
            .collect();

        let ones = labels.iter().filter(|&&l| l == 1).count();
        let dominant = usize::from(ones * 2 >= labels.len());
        let current = *labels.last().ok_or_else(|| {
            ModelError::Numeric("empty label series".into())
        })?;

        trace!(
            current,
            dominant,
            up_share = format!("{:.2}", ones as f64 / labels.len() as f64),
            "regime classified"
        );

        Ok(RegimeOutcome { current, dominant })
    }
}
