// =============================================================================
// Indicators Module
// =============================================================================
//
// Pure functions over price/volume series. All indicators share the same
// contract: insufficient or non-finite input yields an empty series or
// `None`, never an error.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod obv;
pub mod rsi;

pub use atr::calculate_atr;
pub use bollinger::{calculate_bollinger, Bands};
pub use ema::calculate_ema;
pub use macd::{calculate_macd, MacdPoint};
pub use obv::calculate_obv;
pub use rsi::{calculate_rsi, latest_rsi};
