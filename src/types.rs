// =============================================================================
// Shared types used across the Aurum trading engine
// =============================================================================

use serde::{Deserialize, Serialize};

/// Committed trade direction for a signal or an open position.
///
/// Directional math throughout the engine uses the sign convention
/// `Long = +1`, `Short = -1`, so that
/// `pnl = (exit - entry) * direction.sign() * size` holds for both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Numeric sign for pnl and distance math: `+1.0` long, `-1.0` short.
    pub fn sign(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }

    /// Integer vote contribution when summing ensemble votes.
    pub fn vote_value(self) -> i32 {
        match self {
            Self::Long => 1,
            Self::Short => -1,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "BUY"),
            Self::Short => write!(f, "SELL"),
        }
    }
}
