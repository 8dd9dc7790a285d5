// =============================================================================
// Entry Filter - majority-vote classifier ensemble
// =============================================================================
//
// Runs only after the aggregator produced a direction and the gate passed.
// Each ensemble member independently accepts or rejects the EXISTING
// decision; the filter never chooses a direction itself.
//
// Vote policy:
//   - accept iff votes-for >= half of votes CAST (ties accept)
//   - a member that errors is excluded from this cycle's vote
//   - if every member errors, the filter rejects (fails closed)
//   - a schema contract violation is not a vote at all: it aborts the
//     decision and surfaces to the operator
// =============================================================================

use tracing::{debug, warn};

use crate::ml::features::{FeatureError, FeatureVector};
use crate::ml::ScoreError;

/// One member of the classifier ensemble.
pub trait EntryClassifier: Send + Sync {
    fn name(&self) -> &'static str;

    /// Accept (`true`) or reject (`false`) the pending entry.
    fn score(&self, features: &FeatureVector) -> Result<bool, ScoreError>;
}

/// Outcome of one filter pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterDecision {
    pub accepted: bool,
    pub votes_for: usize,
    pub votes_cast: usize,
}

/// The majority-vote ensemble.
pub struct EntryFilter {
    members: Vec<Box<dyn EntryClassifier>>,
}

impl EntryFilter {
    pub fn new(members: Vec<Box<dyn EntryClassifier>>) -> Self {
        Self { members }
    }

    /// Poll every member and fold the votes.
    ///
    /// Returns `Err` only on a feature-schema contract violation.
    pub fn decide(&self, features: &FeatureVector) -> Result<FilterDecision, FeatureError> {
        let mut votes_for = 0;
        let mut votes_cast = 0;

        for member in &self.members {
            match member.score(features) {
                Ok(accept) => {
                    votes_cast += 1;
                    if accept {
                        votes_for += 1;
                    }
                    debug!(member = member.name(), accept, "classifier voted");
                }
                Err(ScoreError::Contract(e)) => {
                    warn!(member = member.name(), error = %e, "feature contract violation");
                    return Err(e);
                }
                Err(ScoreError::Unavailable(reason)) => {
                    warn!(
                        member = member.name(),
                        reason, "classifier unavailable, excluded from vote"
                    );
                }
            }
        }

        // No usable member this cycle: fail closed.
        let accepted = votes_cast > 0 && votes_for * 2 >= votes_cast;

        debug!(votes_for, votes_cast, accepted, "entry filter decided");

        Ok(FilterDecision {
            accepted,
            votes_for,
            votes_cast,
        })
    }
}
