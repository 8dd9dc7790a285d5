// =============================================================================
// Feature Vector - fixed, versioned schema for ML scoring
// =============================================================================
//
// Classifiers receive features through an ORDERED, versioned field list.
// The order is part of the contract: trained models are packaged against a
// specific schema version, and any name outside the list is a hard error
// rather than a silent reindex.
//
// Building the vector from a short window is a different failure class:
// that is ordinary data insufficiency and simply abstains the cycle.
// =============================================================================

use serde::Serialize;
use thiserror::Error;

use crate::indicators::atr::calculate_atr;
use crate::indicators::bollinger::calculate_bollinger;
use crate::indicators::macd::calculate_macd;
use crate::indicators::obv::calculate_obv;
use crate::indicators::rsi::latest_rsi;
use crate::market_data::BarWindow;

/// Bumped whenever a field is added, removed, or reordered.
pub const SCHEMA_VERSION: u32 = 1;

/// The ordered field list of schema v1.
pub const FEATURE_NAMES: [&str; 11] = [
    "rsi2",
    "rsi14",
    "macd_line",
    "macd_signal",
    "macd_hist",
    "obv",
    "atr",
    "bb_upper",
    "bb_lower",
    "volatility",
    "regime",
];

/// Bollinger parameters used for the band features.
const BB_PERIOD: usize = 21;
const BB_STD: f64 = 2.0;

/// ATR look-back for the volatility feature.
const ATR_PERIOD: usize = 14;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    /// A consumer asked for a name outside the schema: a packaging or
    /// version mismatch, surfaced to the operator.
    #[error("feature '{0}' is not part of schema v{SCHEMA_VERSION}")]
    UnknownFeature(String),

    /// Not enough bars to compute the named input. Abstain, never fatal.
    #[error("insufficient data for feature '{0}'")]
    Insufficient(&'static str),

    /// An input computed to NaN/inf. Treated like insufficiency.
    #[error("non-finite value for feature '{0}'")]
    NonFinite(&'static str),

    /// An externally supplied value vector does not match the schema length.
    #[error("expected {expected} values for schema v{SCHEMA_VERSION}, got {got}")]
    LengthMismatch { expected: usize, got: usize },
}

// ---------------------------------------------------------------------------
// FeatureVector
// ---------------------------------------------------------------------------

/// A complete schema-v1 feature vector. Values are stored in schema order.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    /// Build the vector from the rolling window plus the gate outputs.
    ///
    /// `volatility` is the gate's percentage std-dev forecast and `regime`
    /// the current regime id, both computed over the same window.
    pub fn build(
        window: &BarWindow,
        volatility: f64,
        regime: usize,
    ) -> Result<Self, FeatureError> {
        let closes = window.closes();
        let volumes = window.volumes();
        let bars: Vec<_> = window.bars().cloned().collect();

        let rsi2 = latest_rsi(&closes, 2).ok_or(FeatureError::Insufficient("rsi2"))?;
        let rsi14 = latest_rsi(&closes, 14).ok_or(FeatureError::Insufficient("rsi14"))?;
        let macd = calculate_macd(&closes).ok_or(FeatureError::Insufficient("macd_line"))?;
        let obv = calculate_obv(&closes, &volumes).ok_or(FeatureError::Insufficient("obv"))?;
        let atr = calculate_atr(&bars, ATR_PERIOD).ok_or(FeatureError::Insufficient("atr"))?;
        let bands = calculate_bollinger(&closes, BB_PERIOD, BB_STD)
            .ok_or(FeatureError::Insufficient("bb_upper"))?;

        if !volatility.is_finite() {
            return Err(FeatureError::NonFinite("volatility"));
        }

        let values = vec![
            rsi2,
            rsi14,
            macd.line,
            macd.signal,
            macd.histogram,
            obv,
            atr,
            bands.upper,
            bands.lower,
            volatility,
            regime as f64,
        ];

        for (value, name) in values.iter().zip(FEATURE_NAMES.iter()) {
            if !value.is_finite() {
                return Err(FeatureError::NonFinite(name));
            }
        }

        Ok(Self { values })
    }

    /// Wrap an externally produced value vector (e.g. a replayed journal
    /// row). The length must match the schema exactly.
    pub fn from_values(values: Vec<f64>) -> Result<Self, FeatureError> {
        if values.len() != FEATURE_NAMES.len() {
            return Err(FeatureError::LengthMismatch {
                expected: FEATURE_NAMES.len(),
                got: values.len(),
            });
        }
        Ok(Self { values })
    }

    /// Look a feature up by schema name.
    pub fn get(&self, name: &str) -> Result<f64, FeatureError> {
        FEATURE_NAMES
            .iter()
            .position(|&n| n == name)
            .map(|i| self.values[i])
            .ok_or_else(|| FeatureError::UnknownFeature(name.to_string()))
    }

    /// Values in schema order.
    pub fn values(&self) -> &[f64] {
        &self.values
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
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 100.0,
            })
            .collect();
        BarWindow::from_bars(500, bars)
    }

    fn rich_window() -> BarWindow {
        let closes: Vec<f64> = (0..80)
            .map(|i| 2000.0 + (i as f64 * 0.3).sin() * 5.0)
            .collect();
        window_from_closes(&closes)
    }

    #[test]
    fn builds_all_schema_fields() {
        let fv = FeatureVector::build(&rich_window(), 1.2, 1).unwrap();
        assert_eq!(fv.values().len(), FEATURE_NAMES.len());
        for name in FEATURE_NAMES {
            assert!(fv.get(name).is_ok(), "missing {name}");
        }
        assert!((fv.get("volatility").unwrap() - 1.2).abs() < f64::EPSILON);
        assert!((fv.get("regime").unwrap() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn short_window_is_insufficiency_not_a_crash() {
        let closes = vec![2000.0; 10];
        let err = FeatureVector::build(&window_from_closes(&closes), 1.0, 1).unwrap_err();
        assert!(matches!(err, FeatureError::Insufficient(_)));
    }

    #[test]
    fn unknown_name_is_a_contract_error() {
        let fv = FeatureVector::build(&rich_window(), 1.0, 1).unwrap();
        let err = fv.get("vwap").unwrap_err();
        assert_eq!(err, FeatureError::UnknownFeature("vwap".to_string()));
    }

    #[test]
    fn non_finite_gate_output_is_rejected() {
        let err = FeatureVector::build(&rich_window(), f64::NAN, 1).unwrap_err();
        assert_eq!(err, FeatureError::NonFinite("volatility"));
    }

    #[test]
    fn from_values_enforces_schema_length() {
        assert!(FeatureVector::from_values(vec![0.0; FEATURE_NAMES.len()]).is_ok());
        let err = FeatureVector::from_values(vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, FeatureError::LengthMismatch { .. }));
    }

    #[test]
    fn get_respects_schema_order() {
        let values: Vec<f64> = (0..FEATURE_NAMES.len()).map(|i| i as f64).collect();
        let fv = FeatureVector::from_values(values).unwrap();
        assert!((fv.get("rsi2").unwrap() - 0.0).abs() < f64::EPSILON);
        assert!((fv.get("regime").unwrap() - 10.0).abs() < f64::EPSILON);
    }
}
