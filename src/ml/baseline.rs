// =============================================================================
// Baseline Classifiers - the shipped default ensemble
// =============================================================================
//
// Three rule classifiers behind the [`EntryClassifier`] contract. They keep
// the filter honest out of the box; a trained model replaces any of them
// without touching the voting layer.

use crate::config::EngineConfig;
use crate::ml::entry_filter::EntryClassifier;
use crate::ml::features::FeatureVector;
use crate::ml::ScoreError;

/// Accepts only when the market sits in the configured trending state.
pub struct RegimeAlignment {
    trending_state: f64,
}

impl RegimeAlignment {
    pub fn new(trending_state: usize) -> Self {
        Self {
            trending_state: trending_state as f64,
        }
    }
}

impl EntryClassifier for RegimeAlignment {
    fn name(&self) -> &'static str {
        "regime_alignment"
    }

    fn score(&self, features: &FeatureVector) -> Result<bool, ScoreError> {
        let regime = features.get("regime")?;
        Ok((regime - self.trending_state).abs() < f64::EPSILON)
    }
}

/// Rejects when the forecast volatility exceeds its own comfort ceiling.
/// Deliberately overlaps the gate: the gate ceiling is an operator knob,
/// this one is a fixed sanity bound baked into the ensemble.
pub struct VolatilitySanity {
    ceiling_pct: f64,
}

impl VolatilitySanity {
    pub fn new(ceiling_pct: f64) -> Self {
        Self { ceiling_pct }
    }
}

impl EntryClassifier for VolatilitySanity {
    fn name(&self) -> &'static str {
        "volatility_sanity"
    }

    fn score(&self, features: &FeatureVector) -> Result<bool, ScoreError> {
        let volatility = features.get("volatility")?;
        Ok(volatility <= self.ceiling_pct)
    }
}

/// Accepts when RSI(14) and the MACD histogram tell the same momentum
/// story: both above neutral or both below it.
pub struct MomentumCoherence;

impl EntryClassifier for MomentumCoherence {
    fn name(&self) -> &'static str {
        "momentum_coherence"
    }

    fn score(&self, features: &FeatureVector) -> Result<bool, ScoreError> {
        let rsi14 = features.get("rsi14")?;
        let hist = features.get("macd_hist")?;

        let rsi_bias = rsi14 - 50.0;
        Ok(rsi_bias == 0.0 || hist == 0.0 || (rsi_bias > 0.0) == (hist > 0.0))
    }
}

/// The default three-member ensemble.
pub fn default_ensemble(config: &EngineConfig) -> Vec<Box<dyn EntryClassifier>> {
    vec![
        Box::new(RegimeAlignment::new(1)),
        Box::new(VolatilitySanity::new(config.gate.volatility_ceiling_pct)),
        Box::new(MomentumCoherence),
    ]
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::features::FEATURE_NAMES;

    /// Build a vector with chosen fields set and everything else zero.
    fn features_with(pairs: &[(&str, f64)]) -> FeatureVector {
        let mut values = vec![0.0; FEATURE_NAMES.len()];
        for (name, value) in pairs {
            let idx = FEATURE_NAMES.iter().position(|n| n == name).unwrap();
            values[idx] = *value;
        }
        FeatureVector::from_values(values).unwrap()
    }

    #[test]
    fn regime_alignment_wants_trending_state() {
        let classifier = RegimeAlignment::new(1);
        assert!(classifier.score(&features_with(&[("regime", 1.0)])).unwrap());
        assert!(!classifier.score(&features_with(&[("regime", 0.0)])).unwrap());
    }

    #[test]
    fn volatility_sanity_bounds_the_forecast() {
        let classifier = VolatilitySanity::new(2.0);
        assert!(classifier
            .score(&features_with(&[("volatility", 1.5)]))
            .unwrap());
        assert!(classifier
            .score(&features_with(&[("volatility", 2.0)]))
            .unwrap());
        assert!(!classifier
            .score(&features_with(&[("volatility", 2.1)]))
            .unwrap());
    }

    #[test]
    fn momentum_coherence_wants_agreement() {
        let classifier = MomentumCoherence;
        // Both bullish.
        assert!(classifier
            .score(&features_with(&[("rsi14", 65.0), ("macd_hist", 0.8)]))
            .unwrap());
        // Both bearish.
        assert!(classifier
            .score(&features_with(&[("rsi14", 35.0), ("macd_hist", -0.8)]))
            .unwrap());
        // Contradiction.
        assert!(!classifier
            .score(&features_with(&[("rsi14", 65.0), ("macd_hist", -0.8)]))
            .unwrap());
        // A perfectly neutral leg never vetoes.
        assert!(classifier
            .score(&features_with(&[("rsi14", 50.0), ("macd_hist", -0.8)]))
            .unwrap());
    }

    #[test]
    fn default_ensemble_has_three_members() {
        let config = EngineConfig::default();
        let members = default_ensemble(&config);
        let names: Vec<&str> = members.iter().map(|m| m.name()).collect();
        assert_eq!(
            names,
            vec!["regime_alignment", "volatility_sanity", "momentum_coherence"]
        );
    }
}
