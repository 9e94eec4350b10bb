//! Per-candidate trial scoring.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};

use super::pool::TrialPool;
use super::scores::TrialScores;
use super::simulator::{SimulationConfig, SimulationRequest, Simulator};
use crate::config::ExplorerConfig;
use crate::error::{ExecutionError, ExplorerError, ExplorerResult};

/// Runs a candidate's trials inline or across a [`TrialPool`].
pub struct TrialDispatcher {
    simulator: Arc<dyn Simulator>,
    pool: Option<TrialPool>,
    timeout: Option<Duration>,
}

impl TrialDispatcher {
    /// Runs every trial on the calling thread.
    #[must_use]
    pub fn inline(simulator: Arc<dyn Simulator>) -> Self {
        Self {
            simulator,
            pool: None,
            timeout: None,
        }
    }

    /// Starts a pool of `workers` threads; 1 or less runs inline.
    pub fn with_pool(simulator: Arc<dyn Simulator>, workers: usize) -> ExplorerResult<Self> {
        let pool = if workers > 1 {
            Some(TrialPool::start(workers, Arc::clone(&simulator))?)
        } else {
            None
        };
        Ok(Self {
            simulator,
            pool,
            timeout: None,
        })
    }

    /// Pool size and trial deadline taken from `config`.
    pub fn from_config(simulator: Arc<dyn Simulator>, config: &ExplorerConfig) -> ExplorerResult<Self> {
        Ok(Self::with_pool(simulator, config.worker_count())?.with_timeout(config.trial_timeout()))
    }

    /// Bounds the wait for pooled replies. Inline runs are not bounded.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Worker threads in use; 1 when inline.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.pool.as_ref().map_or(1, TrialPool::size)
    }

    /// True if trials fan out over a pool.
    #[must_use]
    pub const fn is_pooled(&self) -> bool {
        self.pool.is_some()
    }

    /// Runs `num_runs` trials of `config` and aggregates their scores.
    ///
    /// Pooled runs send `round(num_runs / idle)` trials (at least 1) to every
    /// idle worker, so the total may differ slightly from `num_runs`.
    pub fn score(
        &self,
        config: Arc<SimulationConfig>,
        strategy: &str,
        num_runs: usize,
    ) -> ExplorerResult<TrialScores> {
        let Some(pool) = &self.pool else {
            let outcome = self.simulator.simulate(&config, strategy, num_runs)?;
            return TrialScores::from_samples(outcome.scores);
        };

        let idle = pool.idle_workers();
        if idle.is_empty() {
            return Err(ExecutionError::PoolExhausted { size: pool.size() }.into());
        }

        let per_worker = ((num_runs as f64 / idle.len() as f64).round() as usize).max(1);
        let request = SimulationRequest {
            config,
            strategy_name: strategy.to_string(),
            num_runs: per_worker,
        };
        let deadline = self.timeout.map(|t| Instant::now() + t);

        let mut handles = Vec::with_capacity(idle.len());
        for worker in idle {
            match pool.submit(worker, request.clone()) {
                Ok(handle) => handles.push(handle),
                Err(err) if err.is_retryable() => debug!("skipping worker {worker}: {err}"),
                Err(err) => return Err(err),
            }
        }
        if handles.is_empty() {
            return Err(ExecutionError::PoolExhausted { size: pool.size() }.into());
        }

        let mut samples = Vec::with_capacity(per_worker * handles.len());
        for handle in handles {
            let outcome = match (deadline, self.timeout) {
                (Some(deadline), Some(budget)) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    handle.join_timeout(remaining).map_err(|err| match err {
                        ExplorerError::Execution(ExecutionError::Timeout { .. }) => {
                            warn!("trial batch exceeded {}ms", budget.as_millis());
                            ExecutionError::Timeout {
                                duration_ms: budget.as_millis().min(u128::from(u64::MAX)) as u64,
                            }
                            .into()
                        }
                        other => other,
                    })?
                }
                _ => handle.join()?,
            };
            samples.extend(outcome.scores);
        }

        TrialScores::from_samples(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::simulator::SimulationOutcome;
    use crate::loadout::Loadout;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config() -> Arc<SimulationConfig> {
        Arc::new(SimulationConfig::new(Loadout::default(), serde_json::Value::Null))
    }

    fn constant(score: f64) -> Arc<dyn Simulator> {
        Arc::new(move |_: &SimulationConfig, _: &str, runs: usize| -> ExplorerResult<SimulationOutcome> {
            Ok(SimulationOutcome::new(vec![score; runs]))
        })
    }

    #[test]
    fn inline_runs_all_trials_on_caller() {
        let dispatcher = TrialDispatcher::inline(constant(7.0));
        assert!(!dispatcher.is_pooled());
        assert_eq!(dispatcher.worker_count(), 1);

        let scores = dispatcher.score(config(), "s", 50).unwrap();
        assert_eq!(scores.len(), 50);
        assert_eq!(scores.mean(), 7.0);
    }

    #[test]
    fn single_worker_pool_runs_inline() {
        let dispatcher = TrialDispatcher::with_pool(constant(1.0), 1).unwrap();
        assert!(!dispatcher.is_pooled());
    }

    #[test]
    fn pooled_runs_split_evenly_and_concatenate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let sim = move |_: &SimulationConfig, strategy: &str, runs: usize| -> ExplorerResult<SimulationOutcome> {
            assert_eq!(strategy, "HeuristicStrategy");
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(SimulationOutcome::new(vec![2.0; runs]))
        };
        let dispatcher = TrialDispatcher::with_pool(Arc::new(sim), 4).unwrap();
        assert_eq!(dispatcher.worker_count(), 4);

        let scores = dispatcher.score(config(), "HeuristicStrategy", 200).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(scores.len(), 200);
        assert_eq!(scores.mean(), 2.0);
    }

    #[test]
    fn uneven_split_rounds_per_worker() {
        let dispatcher = TrialDispatcher::with_pool(constant(1.0), 3).unwrap();
        // round(200 / 3) = 67 per worker.
        assert_eq!(dispatcher.score(config(), "s", 200).unwrap().len(), 201);
        // Never fewer than one trial per worker.
        assert_eq!(dispatcher.score(config(), "s", 1).unwrap().len(), 3);
    }

    #[test]
    fn pooled_timeout_fails_the_candidate() {
        let sim = |_: &SimulationConfig, _: &str, runs: usize| -> ExplorerResult<SimulationOutcome> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(SimulationOutcome::new(vec![1.0; runs]))
        };
        let dispatcher = TrialDispatcher::with_pool(Arc::new(sim), 2)
            .unwrap()
            .with_timeout(Some(Duration::from_millis(30)));

        let err = dispatcher.score(config(), "s", 10).unwrap_err();
        assert!(matches!(
            err,
            ExplorerError::Execution(ExecutionError::Timeout { duration_ms: 30 })
        ));
        assert!(err.is_retryable());
    }

    #[test]
    fn stalled_worker_is_skipped_by_later_candidates() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let sim = move |_: &SimulationConfig, _: &str, runs: usize| -> ExplorerResult<SimulationOutcome> {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                std::thread::sleep(Duration::from_millis(500));
            }
            Ok(SimulationOutcome::new(vec![1.0; runs]))
        };
        let dispatcher = TrialDispatcher::with_pool(Arc::new(sim), 3)
            .unwrap()
            .with_timeout(Some(Duration::from_millis(30)));

        let err = dispatcher.score(config(), "s", 30).unwrap_err();
        assert!(matches!(err, ExplorerError::Execution(ExecutionError::Timeout { .. })));

        let pool = dispatcher.pool.as_ref().unwrap();
        let start = Instant::now();
        while pool.idle_workers().len() != 2 && start.elapsed() < Duration::from_millis(200) {
            std::thread::yield_now();
        }
        assert_eq!(pool.idle_workers().len(), 2);

        // round(25 / 2) = 13 on each of the two idle workers.
        let scores = dispatcher.score(config(), "s", 25).unwrap();
        assert_eq!(scores.len(), 26);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn fully_stalled_pool_is_exhausted() {
        let sim = |_: &SimulationConfig, _: &str, runs: usize| -> ExplorerResult<SimulationOutcome> {
            std::thread::sleep(Duration::from_millis(400));
            Ok(SimulationOutcome::new(vec![1.0; runs]))
        };
        let dispatcher = TrialDispatcher::with_pool(Arc::new(sim), 2)
            .unwrap()
            .with_timeout(Some(Duration::from_millis(30)));

        assert!(dispatcher.score(config(), "s", 10).is_err());
        let err = dispatcher.score(config(), "s", 10).unwrap_err();
        assert!(matches!(
            err,
            ExplorerError::Execution(ExecutionError::PoolExhausted { size: 2 })
        ));
        assert!(err.is_retryable());
    }

    #[test]
    fn all_non_finite_scores_fail() {
        let dispatcher = TrialDispatcher::inline(constant(f64::NAN));
        let err = dispatcher.score(config(), "s", 10).unwrap_err();
        assert!(matches!(err, ExplorerError::Execution(ExecutionError::NoSamples)));
    }

    #[test]
    fn from_config_applies_workers_and_timeout() {
        let config = ExplorerConfig {
            workers: Some(2),
            ..ExplorerConfig::default()
        };
        let dispatcher = TrialDispatcher::from_config(constant(1.0), &config).unwrap();
        assert_eq!(dispatcher.worker_count(), 2);
        assert_eq!(dispatcher.timeout, Some(Duration::from_secs(120)));
    }
}
