// =============================================================================
// Relative Strength Index (RSI) - Wilder's Smoothing
// =============================================================================
//
// RSI measures the magnitude ratio of recent gains to recent losses.
// The engine leans on very short look-backs: RSI(2) drives the momentum
// entry strategy, RSI(14) feeds the ML feature vector.
//
//   avg_gain / avg_loss are seeded with the SMA of the first `period`
//   deltas, then smoothed with Wilder's method:
//     avg = (prev_avg * (period - 1) + current) / period
//   RS  = avg_gain / avg_loss
//   RSI = 100 - 100 / (1 + RS)
// =============================================================================

/// Compute the RSI series for `closes` with the given `period`.
///
/// One value is produced per close starting at index `period` (the first
/// `period` closes seed the averages).
///
/// # Edge cases
/// - `period == 0` or fewer than `period + 1` closes: empty vec.
/// - Zero average loss (straight up-move): RSI clamps to 100.
/// - Zero movement in both directions: RSI is 50.
/// - A non-finite value truncates the series at that point.
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period + 1 {
        return Vec::new();
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let period_f = period as f64;

    if deltas[..period].iter().any(|d| !d.is_finite()) {
        return Vec::new();
    }

    let mut avg_gain = deltas[..period].iter().filter(|&&d| d > 0.0).sum::<f64>() / period_f;
    let mut avg_loss = deltas[..period]
        .iter()
        .filter(|&&d| d < 0.0)
        .map(|d| d.abs())
        .sum::<f64>()
        / period_f;

    let mut result = Vec::with_capacity(deltas.len() - period + 1);
    match rsi_value(avg_gain, avg_loss) {
        Some(first) => result.push(first),
        None => return Vec::new(),
    }

    for &delta in &deltas[period..] {
        if !delta.is_finite() {
            break;
        }
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);

        avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;

        match rsi_value(avg_gain, avg_loss) {
            Some(rsi) => result.push(rsi),
            None => break,
        }
    }

    result
}

/// Most recent RSI value, or `None` when the series cannot be computed.
pub fn latest_rsi(closes: &[f64], period: usize) -> Option<f64> {
    calculate_rsi(closes, period).last().copied()
}

/// Convert smoothed averages into an RSI value in [0, 100].
fn rsi_value(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    let rsi = if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    };

    rsi.is_finite().then_some(rsi)
}
