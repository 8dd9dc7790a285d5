// =============================================================================
// ML Module
// =============================================================================
//
// The decision-filter side of the engine: a fixed feature schema, an
// accept/reject classifier ensemble for entries, and an exit-probability
// model for open positions. Classifiers are black boxes behind traits;
// the shipped baselines are plain heuristics using the same contract a
// trained model would.

pub mod baseline;
pub mod entry_filter;
pub mod exit_model;
pub mod features;

pub use entry_filter::{EntryClassifier, EntryFilter, FilterDecision};
pub use exit_model::{ExitProbabilityModel, ExitSnapshot};
pub use features::{FeatureError, FeatureVector};

use thiserror::Error;

/// Failures from a scoring call.
///
/// `Contract` marks a packaging/version mismatch (a classifier asked for a
/// feature outside the schema) and is surfaced to the operator. Everything
/// else is an expected runtime condition handled by exclusion from the vote.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error(transparent)]
    Contract(#[from] FeatureError),

    #[error("model unavailable: {0}")]
    Unavailable(String),
}
