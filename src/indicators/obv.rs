// =============================================================================
// On-Balance Volume (OBV)
// =============================================================================
//
// Running volume total that adds a bar's volume on up-closes and subtracts
// it on down-closes. Unchanged closes contribute nothing. The absolute level
// is arbitrary; only its trend carries information, which is enough for the
// feature vector.

/// Most recent OBV value over parallel `closes` / `volumes` series.
///
/// Returns `None` when the series are shorter than two elements, have
/// mismatched lengths, or contain non-finite values.
pub fn calculate_obv(closes: &[f64], volumes: &[f64]) -> Option<f64> {
    if closes.len() < 2 || closes.len() != volumes.len() {
        return None;
    }

    let mut obv = 0.0_f64;
    for i in 1..closes.len() {
        let delta = closes[i] - closes[i - 1];
        if delta > 0.0 {
            obv += volumes[i];
        } else if delta < 0.0 {
            obv -= volumes[i];
        }
        if !obv.is_finite() {
            return None;
        }
    }

    Some(obv)
}
