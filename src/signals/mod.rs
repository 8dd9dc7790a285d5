// =============================================================================
// Signals Module
// =============================================================================
//
// Directional signal pipeline for the engine:
// - Independent per-strategy votes over the rolling bar window
// - A deterministic priority cascade that folds votes into one decision
//
// Strategies are plugins: an ordered `Vec<Box<dyn SignalStrategy>>` that the
// orchestrator evaluates every cycle. Adding a strategy never touches the
// decision cascade.

pub mod ensemble;
pub mod macd_bollinger;
pub mod rsi2;
pub mod structure_breakout;

pub use ensemble::{decide, EnsembleDecision};
pub use macd_bollinger::MacdBollinger;
pub use rsi2::Rsi2Momentum;
pub use structure_breakout::StructureBreakout;

use serde::Serialize;

use crate::config::SignalParams;
use crate::market_data::BarWindow;
use crate::types::Direction;

/// One strategy's directional vote for the current bar.
///
/// `direction == None` is an abstention: the strategy saw no edge, or had
/// fewer bars than its minimum look-back. Abstaining is never an error.
#[derive(Debug, Clone, Serialize)]
pub struct SignalVote {
    /// Stable strategy identifier, e.g. `"RSI2"`.
    pub strategy: &'static str,
    pub direction: Option<Direction>,
}

impl SignalVote {
    /// Signed vote contribution: +1 long, -1 short, 0 abstain.
    pub fn value(&self) -> i32 {
        self.direction.map(Direction::vote_value).unwrap_or(0)
    }
}

/// A directional signal strategy, evaluated once per closed bar.
///
/// Implementations are stateless and side-effect-free: the vote is a pure
/// function of the window.
pub trait SignalStrategy: Send + Sync {
    /// Stable identifier used in votes and decision labels.
    fn name(&self) -> &'static str;

    /// Minimum number of bars required before this strategy can vote.
    fn min_bars(&self) -> usize;

    /// Produce this bar's vote. Must abstain (not fail) on short windows.
    fn evaluate(&self, window: &BarWindow) -> SignalVote;
}

/// Build the standard strategy set. The cascade resolves priority by
/// strategy name, so this order only affects evaluation and logging.
pub fn default_strategies(params: &SignalParams) -> Vec<Box<dyn SignalStrategy>> {
    vec![
        Box::new(Rsi2Momentum::new(params.rsi_oversold, params.rsi_overbought)),
        Box::new(MacdBollinger::new(
            params.bollinger_period,
            params.bollinger_std,
        )),
        Box::new(StructureBreakout::new(params.structure_lookback)),
    ]
}
