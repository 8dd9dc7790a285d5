// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
// MACD line  = EMA(fast) - EMA(slow)
// Signal     = EMA(signal_period) of the MACD line
// Histogram  = MACD line - Signal
//
// The histogram sign is what the trend strategy cares about: positive means
// upside momentum is building, negative means it is fading.
// =============================================================================

use crate::indicators::ema::calculate_ema;

/// Latest MACD values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Compute the most recent MACD point with explicit periods.
///
/// Returns `None` when there is not enough history for the slow EMA plus
/// the signal smoothing, or when any intermediate value is non-finite.
pub fn calculate_macd_with(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> Option<MacdPoint> {
    if fast == 0 || slow == 0 || signal_period == 0 || fast >= slow {
        return None;
    }

    let ema_fast = calculate_ema(closes, fast);
    let ema_slow = calculate_ema(closes, slow);
    if ema_slow.is_empty() {
        return None;
    }

    // Both series end at the latest close; align their tails.
    let len = ema_fast.len().min(ema_slow.len());
    if len == 0 {
        return None;
    }
    let fast_tail = &ema_fast[ema_fast.len() - len..];
    let slow_tail = &ema_slow[ema_slow.len() - len..];

    let macd_line: Vec<f64> = fast_tail
        .iter()
        .zip(slow_tail.iter())
        .map(|(f, s)| f - s)
        .collect();

    let signal_series = calculate_ema(&macd_line, signal_period);
    let signal = *signal_series.last()?;
    let line = *macd_line.last()?;
    let histogram = line - signal;

    (line.is_finite() && signal.is_finite()).then_some(MacdPoint {
        line,
        signal,
        histogram,
    })
}

/// Standard MACD(12, 26, 9).
pub fn calculate_macd(closes: &[f64]) -> Option<MacdPoint> {
    calculate_macd_with(closes, 12, 26, 9)
}
