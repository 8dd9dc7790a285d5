// =============================================================================
// MACD + Bollinger Band Strategy
// =============================================================================
//
// Combines a volatility stretch with a momentum confirmation:
//   close below the lower band AND MACD histogram > 0 => vote long
//   close above the upper band AND MACD histogram < 0 => vote short
// The band says the move is overdone; the histogram says momentum already
// turned. Both have to agree or the strategy abstains.
// =============================================================================

use crate::indicators::bollinger::{calculate_bollinger, Bands};
use crate::indicators::macd::calculate_macd;
use crate::market_data::BarWindow;
use crate::signals::{SignalStrategy, SignalVote};
use crate::types::Direction;

pub const NAME: &str = "MACD_BB";

/// Enough history for MACD(12, 26, 9) plus a stable signal line.
const MIN_BARS: usize = 40;

pub struct MacdBollinger {
    bollinger_period: usize,
    bollinger_std: f64,
}

impl MacdBollinger {
    pub fn new(bollinger_period: usize, bollinger_std: f64) -> Self {
        Self {
            bollinger_period,
            bollinger_std,
        }
    }
}

/// The decision kernel, separated from indicator plumbing so it can be
/// exercised directly.
fn classify(close: f64, bands: &Bands, histogram: f64) -> Option<Direction> {
    if close < bands.lower && histogram > 0.0 {
        Some(Direction::Long)
    } else if close > bands.upper && histogram < 0.0 {
        Some(Direction::Short)
    } else {
        None
    }
}

impl SignalStrategy for MacdBollinger {
    fn name(&self) -> &'static str {
        NAME
    }

    fn min_bars(&self) -> usize {
        MIN_BARS.max(self.bollinger_period)
    }

    fn evaluate(&self, window: &BarWindow) -> SignalVote {
        let abstain = SignalVote {
            strategy: NAME,
            direction: None,
        };

        if window.len() < self.min_bars() {
            return abstain;
        }

        let closes = window.closes();
        let (Some(bands), Some(macd), Some(&close)) = (
            calculate_bollinger(&closes, self.bollinger_period, self.bollinger_std),
            calculate_macd(&closes),
            closes.last(),
        ) else {
            return abstain;
        };

        SignalVote {
            strategy: NAME,
            direction: classify(close, &bands, macd.histogram),
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

    fn window_from_closes(closes: &[f64]) -> BarWindow {
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

    fn bands(lower: f64, middle: f64, upper: f64) -> Bands {
        Bands {
            upper,
            middle,
            lower,
            bandwidth: upper - lower,
        }
    }

    // ---- classify kernel -------------------------------------------------

    #[test]
    fn long_needs_band_break_and_positive_histogram() {
        let b = bands(1990.0, 2000.0, 2010.0);
        assert_eq!(classify(1985.0, &b, 0.5), Some(Direction::Long));
        // Band break alone is not enough.
        assert_eq!(classify(1985.0, &b, -0.5), None);
        // Positive histogram inside the bands is not enough.
        assert_eq!(classify(2000.0, &b, 0.5), None);
    }

    #[test]
    fn short_needs_band_break_and_negative_histogram() {
        let b = bands(1990.0, 2000.0, 2010.0);
        assert_eq!(classify(2015.0, &b, -0.5), Some(Direction::Short));
        assert_eq!(classify(2015.0, &b, 0.5), None);
        assert_eq!(classify(2000.0, &b, -0.5), None);
    }

    #[test]
    fn exact_band_touch_abstains() {
        // Strict inequalities: sitting on the band is not a break.
        let b = bands(1990.0, 2000.0, 2010.0);
        assert_eq!(classify(1990.0, &b, 0.5), None);
        assert_eq!(classify(2010.0, &b, -0.5), None);
    }

    #[test]
    fn zero_histogram_abstains() {
        let b = bands(1990.0, 2000.0, 2010.0);
        assert_eq!(classify(1985.0, &b, 0.0), None);
        assert_eq!(classify(2015.0, &b, 0.0), None);
    }

    // ---- window-level evaluation -----------------------------------------

    #[test]
    fn abstains_below_min_bars() {
        let closes = vec![2000.0; 30];
        let vote = MacdBollinger::new(21, 2.0).evaluate(&window_from_closes(&closes));
        assert_eq!(vote.direction, None);
        assert_eq!(vote.strategy, "MACD_BB");
    }

    #[test]
    fn abstains_in_a_quiet_market() {
        // Gentle oscillation stays inside the bands.
        let closes: Vec<f64> = (0..60)
            .map(|i| 2000.0 + (i as f64 * 0.5).sin() * 0.5)
            .collect();
        let vote = MacdBollinger::new(21, 2.0).evaluate(&window_from_closes(&closes));
        assert_eq!(vote.direction, None);
    }

    #[test]
    fn steady_downtrend_is_not_a_confirmed_long() {
        // The close hugs the lower band but the histogram is negative too,
        // so the mean-reversion long never confirms.
        let closes: Vec<f64> = (0..60).map(|i| 2100.0 - (i as f64).powf(1.4)).collect();
        let vote = MacdBollinger::new(21, 2.0).evaluate(&window_from_closes(&closes));
        assert_eq!(vote.direction, None);
    }
}
