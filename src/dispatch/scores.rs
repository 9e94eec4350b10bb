//! Trial score aggregation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ExecutionError, ExplorerError, ExplorerResult};

/// Scores of all trials run for one candidate.
///
/// Holds at least one finite sample. Deserialized values are rebuilt through
/// [`TrialScores::from_samples`], so a stored `mean` is recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredScores")]
pub struct TrialScores {
    samples: Vec<f64>,
    mean: f64,
}

#[derive(Deserialize)]
struct StoredScores {
    samples: Vec<f64>,
}

impl TryFrom<StoredScores> for TrialScores {
    type Error = ExplorerError;

    fn try_from(stored: StoredScores) -> Result<Self, Self::Error> {
        Self::from_samples(stored.samples)
    }
}

impl TrialScores {
    /// Aggregates raw trial scores.
    ///
    /// Non-finite samples are discarded. Fails with
    /// [`ExecutionError::NoSamples`] when nothing remains.
    pub fn from_samples(mut samples: Vec<f64>) -> ExplorerResult<Self> {
        samples.retain(|s| s.is_finite());
        if samples.is_empty() {
            return Err(ExecutionError::NoSamples.into());
        }
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        Ok(Self { samples, mean })
    }

    /// Individual trial scores.
    #[must_use]
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Mean trial score.
    #[must_use]
    pub const fn mean(&self) -> f64 {
        self.mean
    }

    /// Number of trials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false: construction rejects an empty sample set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Histogram of the samples in buckets of `width`.
    ///
    /// Returns `(lower_bound, count)` for every non-empty bucket in ascending
    /// order. A non-positive or non-finite width yields nothing.
    #[must_use]
    pub fn buckets(&self, width: f64) -> Vec<(f64, usize)> {
        if !(width.is_finite() && width > 0.0) {
            return Vec::new();
        }
        let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
        for sample in &self.samples {
            *counts.entry((sample / width).floor() as i64).or_default() += 1;
        }
        counts
            .into_iter()
            .map(|(bucket, count)| (bucket as f64 * width, count))
            .collect()
    }

    /// Min/mean/median/max of the samples.
    #[must_use]
    pub fn summary(&self) -> ScoreSummary {
        let mut sorted = self.samples.clone();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };
        ScoreSummary {
            min: sorted[0],
            mean: self.mean,
            median,
            max: sorted[sorted.len() - 1],
        }
    }
}

/// Distribution summary of a candidate's trials.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    /// Lowest sample.
    pub min: f64,
    /// Mean of all samples.
    pub mean: f64,
    /// Median sample.
    pub median: f64,
    /// Highest sample.
    pub max: f64,
}
