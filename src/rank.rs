//! Candidate ranking.

use serde::{Deserialize, Serialize};

use crate::candidates::Variant;
use crate::dispatch::{ScoreSummary, TrialScores};
use crate::key::VariantKey;

/// Candidates shown to the user after a run.
pub const DISPLAY_TOP: usize = 5;

/// A scored variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// The scored variant.
    pub variant: Variant,
    /// Trial scores of the most recent scoring.
    pub scores: TrialScores,
    /// Refinement points accumulated for this variant's key.
    pub points: u64,
    /// Trials run for this variant's key across refinement rounds.
    pub cumulative_trials: u64,
}

impl Candidate {
    /// A freshly scored candidate with no refinement history.
    #[must_use]
    pub fn new(variant: Variant, scores: TrialScores) -> Self {
        Self {
            variant,
            scores,
            points: 0,
            cumulative_trials: 0,
        }
    }

    /// Mean trial score.
    #[must_use]
    pub const fn mean(&self) -> f64 {
        self.scores.mean()
    }

    /// Identity of the variant.
    #[must_use]
    pub const fn key(&self) -> VariantKey {
        self.variant.key
    }

    /// Min/mean/median/max of the trials.
    #[must_use]
    pub fn summary(&self) -> ScoreSummary {
        self.scores.summary()
    }
}

/// Candidates sorted by descending mean score.
///
/// Equal means keep their input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    candidates: Vec<Candidate>,
}

impl Ranking {
    /// Sorts `candidates` best first.
    #[must_use]
    pub fn rank(mut candidates: Vec<Candidate>) -> Self {
        candidates.sort_by(|a, b| b.mean().total_cmp(&a.mean()));
        Self { candidates }
    }

    /// All candidates, best first.
    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Consumes the ranking, best first.
    #[must_use]
    pub fn into_candidates(self) -> Vec<Candidate> {
        self.candidates
    }

    /// The best `n` candidates (fewer if the ranking is shorter).
    #[must_use]
    pub fn top(&self, n: usize) -> &[Candidate] {
        &self.candidates[..n.min(self.candidates.len())]
    }

    /// The [`DISPLAY_TOP`] best candidates.
    #[must_use]
    pub fn display(&self) -> &[Candidate] {
        self.top(DISPLAY_TOP)
    }

    /// The top candidate, if any.
    #[must_use]
    pub fn best(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    /// Number of ranked candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// True if nothing was ranked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
