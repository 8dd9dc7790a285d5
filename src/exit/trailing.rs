// =============================================================================
// Trailing Stop Policy - monotonic tightening toward price
// =============================================================================
//
// Every cycle a candidate stop is derived from the current price and a
// fixed trailing distance. The candidate is accepted only when it
//
//   1. locks in profit: sits beyond the entry price in the trade's favour
//      (which also means the trade is in profit by at least the distance),
//   2. tightens: beats the current stop.
//
// A stop is therefore never loosened and never trails to a loss.
//
// A position whose stop is UNSET (zero, e.g. a ticket adopted from a
// manual trade) is a policy choice: by default the same two rules apply;
// with `allow_seed_when_unset` the candidate may seed the stop as long as
// rule 1 holds.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::position::Position;
use crate::types::Direction;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailingPolicy {
    /// Trailing distance in points.
    pub distance_points: f64,

    /// Allow seeding an unset (zero) stop with a profitable candidate.
    pub allow_seed_when_unset: bool,
}

impl TrailingPolicy {
    pub fn new(distance_points: f64, allow_seed_when_unset: bool) -> Self {
        Self {
            distance_points,
            allow_seed_when_unset,
        }
    }

    /// The improved stop for `position` at `current_price`, or `None` when
    /// no update is allowed this cycle.
    pub fn improved_stop(
        &self,
        position: &Position,
        current_price: f64,
        point_size: f64,
    ) -> Option<f64> {
        let distance = self.distance_points * point_size;
        if distance <= 0.0 || !current_price.is_finite() {
            return None;
        }

        let unset = position.stop_loss == 0.0;

        match position.direction {
            Direction::Long => {
                let candidate = current_price - distance;
                if candidate <= position.entry_price {
                    return None;
                }
                if candidate > position.stop_loss || (unset && self.allow_seed_when_unset) {
                    Some(candidate)
                } else {
                    None
                }
            }
            Direction::Short => {
                let candidate = current_price + distance;
                if candidate >= position.entry_price {
                    return None;
                }
                if candidate < position.stop_loss || (unset && self.allow_seed_when_unset) {
                    Some(candidate)
                } else {
                    None
                }
            }
        }
    }
}
