// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Middle band = SMA over the look-back window, upper/lower = SMA +/- k * σ.
// The normalised bandwidth (upper - lower) feeds the ML feature vector; the
// band edges drive the mean-reversion leg of the trend strategy.

/// Latest Bollinger Band values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    /// Absolute band width: `upper - lower`.
    pub bandwidth: f64,
}

/// Compute the bands over the last `period` closes with multiplier `num_std`.
///
/// Returns `None` when fewer than `period` closes are available or the
/// result is non-finite (NaN input).
pub fn calculate_bollinger(closes: &[f64], period: usize, num_std: f64) -> Option<Bands> {
    if period == 0 || closes.len() < period {
        return None;
    }

    let window = &closes[closes.len() - period..];
    let middle = window.iter().sum::<f64>() / period as f64;

    let variance = window.iter().map(|x| (x - middle).powi(2)).sum::<f64>() / period as f64;
    let std_dev = variance.sqrt();

    let upper = middle + num_std * std_dev;
    let lower = middle - num_std * std_dev;
    let bandwidth = upper - lower;

    (middle.is_finite() && bandwidth.is_finite()).then_some(Bands {
        upper,
        middle,
        lower,
        bandwidth,
    })
}
