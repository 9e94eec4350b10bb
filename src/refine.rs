//! Iterative refinement of the best candidates.
//!
//! A refinement pass re-scores a retry set for several rounds. Each round is
//! ranked on its own and awards `max(0, 20 - rank)` points per candidate to a
//! [`Ledger`] keyed by [`VariantKey`]. The ledger outlives a single pass; only
//! a fresh exploration clears it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::dispatch::{SimulationConfig, TrialDispatcher};
use crate::key::VariantKey;
use crate::rank::{Candidate, Ranking};

/// Points awarded to the winner of a round.
pub const ROUND_WINNER_POINTS: u64 = 20;

/// Points for finishing a round at `rank` (0-based).
#[must_use]
pub fn points_for_rank(rank: usize) -> u64 {
    ROUND_WINNER_POINTS.saturating_sub(rank as u64)
}

/// Accumulated refinement points and trial counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    points: HashMap<VariantKey, u64>,
    trials: HashMap<VariantKey, u64>,
}

impl Ledger {
    /// An empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `points` to `key`.
    pub fn award(&mut self, key: VariantKey, points: u64) {
        *self.points.entry(key).or_insert(0) += points;
    }

    /// Adds `trials` to `key`'s cumulative trial count.
    pub fn record_trials(&mut self, key: VariantKey, trials: u64) {
        *self.trials.entry(key).or_insert(0) += trials;
    }

    /// Points accumulated by `key`.
    #[must_use]
    pub fn points(&self, key: &VariantKey) -> u64 {
        self.points.get(key).copied().unwrap_or(0)
    }

    /// Trials recorded for `key`.
    #[must_use]
    pub fn trials(&self, key: &VariantKey) -> u64 {
        self.trials.get(key).copied().unwrap_or(0)
    }

    /// Copies `candidate`'s ledger entries onto it.
    pub fn annotate(&self, candidate: &mut Candidate) {
        let key = candidate.key();
        candidate.points = self.points(&key);
        candidate.cumulative_trials = self.trials(&key);
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.points.clear();
        self.trials.clear();
    }

    /// Number of keys with any entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.keys().chain(self.trials.keys()).collect::<HashSet<_>>().len()
    }

    /// True if no key has points or trials.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.trials.is_empty()
    }
}

/// Picks the candidates worth re-scoring.
///
/// Every candidate within 10% of the best mean is taken. If that is fewer
/// than a tenth of the ranking (rounded up), the next best fill the gap.
/// Keys appear once, in ranking order.
#[must_use]
pub fn select_retry_set(ranking: &Ranking) -> Vec<Candidate> {
    let Some(best) = ranking.best() else {
        return Vec::new();
    };
    let top = best.mean();
    let threshold = top - 0.1 * top.abs();
    let minimum = ranking.len().div_ceil(10);

    let mut seen = HashSet::new();
    let mut retry: Vec<Candidate> = ranking
        .candidates()
        .iter()
        .filter(|c| c.mean() >= threshold && seen.insert(c.key()))
        .cloned()
        .collect();

    for candidate in ranking.candidates() {
        if retry.len() >= minimum {
            break;
        }
        if seen.insert(candidate.key()) {
            retry.push(candidate.clone());
        }
    }
    retry
}

/// Summary of one refinement round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSummary {
    /// 1-based round number.
    pub round: usize,
    /// Keys scored this round, best first.
    pub order: Vec<VariantKey>,
    /// Candidates whose scoring failed this round.
    pub failed: usize,
}

/// Result of a refinement pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementOutcome {
    /// Per-round summaries.
    pub rounds: Vec<RoundSummary>,
    /// Latest score of every re-scored candidate, annotated from the ledger.
    pub merged: Ranking,
}

/// Re-scores a retry set over several rounds.
pub struct RefinementLoop<'a> {
    dispatcher: &'a TrialDispatcher,
    strategy: &'a str,
    num_runs: usize,
    stage: &'a serde_json::Value,
}

impl<'a> RefinementLoop<'a> {
    /// Rounds score through `dispatcher` with `num_runs` trials per candidate.
    #[must_use]
    pub const fn new(
        dispatcher: &'a TrialDispatcher,
        strategy: &'a str,
        num_runs: usize,
        stage: &'a serde_json::Value,
    ) -> Self {
        Self {
            dispatcher,
            strategy,
            num_runs,
            stage,
        }
    }

    /// Runs `rounds` rounds over `retry`, accumulating into `ledger`.
    ///
    /// A candidate whose scoring fails in a round gets neither points nor
    /// trials for it.
    pub fn run(&self, retry: &[Candidate], rounds: usize, ledger: &mut Ledger) -> RefinementOutcome {
        info!(
            "refining {} candidates over {rounds} rounds ({} runs each)",
            retry.len(),
            self.num_runs
        );

        let mut latest: HashMap<VariantKey, Candidate> = HashMap::new();
        let mut first_seen: Vec<VariantKey> = Vec::new();
        let mut summaries = Vec::with_capacity(rounds);

        for round in 1..=rounds {
            let mut scored = Vec::with_capacity(retry.len());
            let mut failed = 0;

            for candidate in retry {
                let config = Arc::new(SimulationConfig::new(
                    candidate.variant.loadout.clone(),
                    self.stage.clone(),
                ));
                match self.dispatcher.score(config, self.strategy, self.num_runs) {
                    Ok(scores) => scored.push(Candidate::new(candidate.variant.clone(), scores)),
                    Err(err) => {
                        warn!("round {round}: candidate {} failed: {err}", candidate.key());
                        failed += 1;
                    }
                }
                thread::yield_now();
            }

            let round_ranking = Ranking::rank(scored);
            let mut order = Vec::with_capacity(round_ranking.len());
            for (rank, candidate) in round_ranking.into_candidates().into_iter().enumerate() {
                let key = candidate.key();
                ledger.award(key, points_for_rank(rank));
                ledger.record_trials(key, self.num_runs as u64);
                order.push(key);
                if latest.insert(key, candidate).is_none() {
                    first_seen.push(key);
                }
            }

            debug!("round {round}: scored {} failed {failed}", order.len());
            summaries.push(RoundSummary { round, order, failed });
        }

        let merged = first_seen
            .iter()
            .filter_map(|key| latest.remove(key))
            .map(|mut candidate| {
                ledger.annotate(&mut candidate);
                candidate
            })
            .collect();

        RefinementOutcome {
            rounds: summaries,
            merged: Ranking::rank(merged),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{SimulationOutcome, Simulator};
    use crate::error::{ExecutionError, ExplorerResult};
    use crate::rank::tests::candidate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn names(candidates: &[Candidate]) -> Vec<String> {
        candidates
            .iter()
            .map(|c| c.variant.loadout.item_ids[0].as_ref().unwrap().to_string())
            .collect()
    }

    #[test]
    fn points_floor_at_zero() {
        assert_eq!(points_for_rank(0), 20);
        assert_eq!(points_for_rank(7), 13);
        assert_eq!(points_for_rank(20), 0);
        assert_eq!(points_for_rank(250), 0);
    }

    #[test]
    fn ledger_accumulates_and_clears() {
        let a = candidate("a", 1.0).key();
        let b = candidate("b", 1.0).key();
        let mut ledger = Ledger::new();
        ledger.award(a, 20);
        ledger.award(a, 19);
        ledger.record_trials(a, 200);
        ledger.record_trials(b, 100);
        assert_eq!(ledger.points(&a), 39);
        assert_eq!(ledger.trials(&a), 200);
        assert_eq!(ledger.points(&b), 0);
        assert_eq!(ledger.len(), 2);

        let mut c = candidate("a", 1.0);
        ledger.annotate(&mut c);
        assert_eq!((c.points, c.cumulative_trials), (39, 200));

        ledger.clear();
        assert!(ledger.is_empty());
    }

    #[test]
    fn ledger_serializes_with_hex_keys() {
        let mut ledger = Ledger::new();
        let key = candidate("a", 1.0).key();
        ledger.award(key, 5);
        let json = serde_json::to_string(&ledger).unwrap();
        assert!(json.contains(&key.to_hex()));
        let back: Ledger = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ledger);
    }

    #[test]
    fn retry_set_takes_candidates_near_the_top() {
        let ranking = Ranking::rank(vec![
            candidate("a", 100.0),
            candidate("b", 95.0),
            candidate("c", 91.0),
            candidate("d", 80.0),
        ]);
        assert_eq!(names(&select_retry_set(&ranking)), vec!["a", "b", "c"]);
    }

    #[test]
    fn retry_set_fills_to_a_tenth() {
        let spread = |i: u32| if i == 24 || i == 29 { 1000.0 } else { f64::from(i) };

        // 25 candidates: ceil(2.5) = 3, only the top clears the threshold.
        let all: Vec<_> = (0..25).map(|i| candidate(&format!("c{i}"), spread(i))).collect();
        let ranking = Ranking::rank(all);
        assert_eq!(names(&select_retry_set(&ranking)), vec!["c24", "c23", "c22"]);

        // Exactly 30 candidates need 3, not 4.
        let all: Vec<_> = (0..30).map(|i| candidate(&format!("c{i}"), spread(i))).collect();
        assert_eq!(select_retry_set(&Ranking::rank(all)).len(), 3);
    }

    #[test]
    fn retry_set_handles_negative_and_empty_rankings() {
        let ranking = Ranking::rank(vec![candidate("a", -10.0), candidate("b", -10.5), candidate("c", -20.0)]);
        assert_eq!(names(&select_retry_set(&ranking)), vec!["a", "b"]);
        assert!(select_retry_set(&Ranking::default()).is_empty());
    }

    /// Scores each loadout by the numeric suffix of its item, shifted per call.
    fn scripted(calls: Arc<AtomicUsize>) -> Arc<dyn Simulator> {
        Arc::new(move |config: &SimulationConfig, _: &str, runs: usize| -> ExplorerResult<SimulationOutcome> {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            let item = config.loadout.item_ids[0].as_ref().map(ToString::to_string).unwrap_or_default();
            if item == "broken" {
                return Err(ExecutionError::Simulator {
                    message: "boom".to_string(),
                }
                .into());
            }
            let base: f64 = item.trim_start_matches('c').parse().unwrap_or(0.0);
            Ok(SimulationOutcome::new(vec![base + call as f64 * 0.01; runs]))
        })
    }

    #[test]
    fn rounds_award_points_and_trials() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = TrialDispatcher::inline(scripted(Arc::clone(&calls)));
        let stage = serde_json::Value::Null;
        let retry = vec![candidate("c3", 3.0), candidate("c1", 1.0), candidate("c2", 2.0)];

        let mut ledger = Ledger::new();
        let outcome = RefinementLoop::new(&dispatcher, "s", 50, &stage).run(&retry, 3, &mut ledger);

        assert_eq!(calls.load(Ordering::SeqCst), 9);
        assert_eq!(outcome.rounds.len(), 3);
        for candidate in &retry {
            assert_eq!(ledger.trials(&candidate.key()), 150);
        }
        assert_eq!(ledger.points(&retry[0].key()), 60);
        assert_eq!(ledger.points(&retry[2].key()), 57);
        assert_eq!(ledger.points(&retry[1].key()), 54);

        assert_eq!(names(outcome.merged.candidates()), vec!["c3", "c2", "c1"]);
        let best = outcome.merged.best().unwrap();
        assert_eq!((best.points, best.cumulative_trials), (60, 150));
        // Latest round's score is the one kept.
        assert!((best.mean() - (3.0 + 6.0 * 0.01)).abs() < 1e-9);
    }

    #[test]
    fn ledger_persists_across_passes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = TrialDispatcher::inline(scripted(calls));
        let stage = serde_json::Value::Null;
        let retry = vec![candidate("c5", 5.0), candidate("c4", 4.0)];

        let mut ledger = Ledger::new();
        let refine = RefinementLoop::new(&dispatcher, "s", 100, &stage);
        refine.run(&retry, 2, &mut ledger);
        let outcome = refine.run(&retry, 1, &mut ledger);

        assert_eq!(ledger.points(&retry[0].key()), 60);
        assert_eq!(ledger.points(&retry[1].key()), 57);
        assert_eq!(ledger.trials(&retry[1].key()), 300);
        assert_eq!(outcome.merged.best().unwrap().points, 60);
    }

    #[test]
    fn failed_candidates_earn_nothing() {
        let dispatcher = TrialDispatcher::inline(scripted(Arc::new(AtomicUsize::new(0))));
        let stage = serde_json::Value::Null;
        let retry = vec![candidate("broken", 9.0), candidate("c1", 1.0)];

        let mut ledger = Ledger::new();
        let outcome = RefinementLoop::new(&dispatcher, "s", 50, &stage).run(&retry, 2, &mut ledger);

        assert_eq!(ledger.points(&retry[0].key()), 0);
        assert_eq!(ledger.trials(&retry[0].key()), 0);
        assert_eq!(ledger.points(&retry[1].key()), 40);
        assert!(outcome.rounds.iter().all(|r| r.failed == 1));
        assert_eq!(outcome.merged.len(), 1);
    }
}
