// =============================================================================
// Ensemble Decision Cascade
// =============================================================================
//
// Folds the per-strategy votes of one bar into a single decision through an
// ordered priority cascade (first match wins):
//
//   1. vote sum >= +2          => long,  "Ensemble Long"
//   2. vote sum <= -2          => short, "Ensemble Short"
//   3. structure vote != 0     => adopt it, "Structure Only"
//   4. MACD_BB vote != 0       => adopt it, "MACD_BB Only"
//   5. RSI2 vote != 0          => adopt it, "RSI2 Only"
//   6. otherwise               => no trade this bar
//
// Strategies are not weighted, only prioritised by specificity: agreement
// beats structure, structure beats the combined trend signal, and the bare
// momentum oscillator comes last.
// =============================================================================

use serde::Serialize;

use crate::signals::{macd_bollinger, rsi2, structure_breakout, SignalVote};
use crate::types::Direction;

/// The ensemble's committed decision for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnsembleDecision {
    pub direction: Direction,
    /// Which cascade branch produced the decision.
    pub label: &'static str,
}

/// Apply the cascade. `None` means no trade this cycle.
///
/// Exactly one branch applies for any vote set, so the outcome is total
/// and deterministic.
pub fn decide(votes: &[SignalVote]) -> Option<EnsembleDecision> {
    let sum: i32 = votes.iter().map(SignalVote::value).sum();

    if sum >= 2 {
        return Some(EnsembleDecision {
            direction: Direction::Long,
            label: "Ensemble Long",
        });
    }
    if sum <= -2 {
        return Some(EnsembleDecision {
            direction: Direction::Short,
            label: "Ensemble Short",
        });
    }

    if let Some(direction) = vote_of(votes, structure_breakout::NAME) {
        return Some(EnsembleDecision {
            direction,
            label: "Structure Only",
        });
    }
    if let Some(direction) = vote_of(votes, macd_bollinger::NAME) {
        return Some(EnsembleDecision {
            direction,
            label: "MACD_BB Only",
        });
    }
    if let Some(direction) = vote_of(votes, rsi2::NAME) {
        return Some(EnsembleDecision {
            direction,
            label: "RSI2 Only",
        });
    }

    None
}

/// The non-abstaining vote of a named strategy, if present.
fn vote_of(votes: &[SignalVote], name: &str) -> Option<Direction> {
    votes
        .iter()
        .find(|v| v.strategy == name)
        .and_then(|v| v.direction)
}
