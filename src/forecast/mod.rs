// =============================================================================
// Forecast Module
// =============================================================================
//
// Shipped implementations of the gate's statistical model traits. Both are
// deliberately simple estimators behind the same seams a heavier model
// (GARCH-family forecaster, hidden-state classifier) would plug into.

pub mod regime;
pub mod volatility;

pub use regime::TrendRegimeClassifier;
pub use volatility::EwmaVolatilityForecaster;
