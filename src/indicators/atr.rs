// =============================================================================
// Average True Range (ATR) - Wilder's Smoothing
// =============================================================================
//
// True Range per bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
// ATR seeds with the SMA of the first `period` TR values, then applies
//   ATR_t = (ATR_{t-1} * (period - 1) + TR_t) / period
// =============================================================================

use crate::market_data::Bar;

/// Most recent ATR value over `bars` (oldest first).
///
/// Returns `None` when `period` is zero, fewer than `period + 1` bars are
/// available (each TR needs a previous close), or a value goes non-finite.
pub fn calculate_atr(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }

    let mut tr_values = Vec::with_capacity(bars.len() - 1);
    for pair in bars.windows(2) {
        let prev_close = pair[0].close;
        let high = pair[1].high;
        let low = pair[1].low;

        // f64::max silently drops NaN operands, so screen the inputs.
        if !(high.is_finite() && low.is_finite() && prev_close.is_finite()) {
            return None;
        }

        let tr = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());
        tr_values.push(tr);
    }

    let period_f = period as f64;
    let mut atr = tr_values[..period].iter().sum::<f64>() / period_f;

    for &tr in &tr_values[period..] {
        atr = (atr * (period_f - 1.0) + tr) / period_f;
    }

    atr.is_finite().then_some(atr)
}
