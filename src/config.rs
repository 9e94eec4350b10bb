//! Exploration configuration.
//!
//! Every user-facing knob lives in [`ExplorerConfig`]. Values are bounded to
//! small discrete sets; [`ExplorerConfig::validate`] must pass before a
//! session is built.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::candidates::CardSwapSettings;
use crate::dispatch::pool::MAX_WORKERS;
use crate::error::{ExplorerError, ExplorerResult, ValidationError};
use crate::storage::StorageError;

/// Accepted trial counts per candidate.
pub const NUM_RUNS_CHOICES: [usize; 6] = [50, 100, 200, 500, 1000, 2000];

/// Trial count used when none is configured.
pub const DEFAULT_NUM_RUNS: usize = 200;

/// Strategy passed to the simulator when none is configured.
pub const DEFAULT_STRATEGY: &str = "HeuristicStrategy";

/// Which generator a run uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplorationMode {
    /// Item-slot combinations.
    #[default]
    Item,
    /// Card swaps into memory sets.
    Card,
}

/// Configuration of one exploration session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Trials per candidate; one of [`NUM_RUNS_CHOICES`].
    pub num_runs: usize,
    /// Customized slots allowed per memory set (1 or 2).
    pub customization_limit: usize,
    /// Trailing slots per memory set eligible for swaps (2..=4).
    pub target_slot_count: usize,
    /// Refinement rounds per refinement pass (1..=10).
    pub retry_set_count: usize,
    /// Generator used by the next run.
    pub mode: ExplorationMode,
    /// Simulator strategy name.
    pub strategy: String,
    /// Worker threads; `None` sizes the pool from the CPU count.
    pub workers: Option<usize>,
    /// Bound on waiting for one candidate's trials; `None` waits forever.
    pub trial_timeout_ms: Option<u64>,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            num_runs: DEFAULT_NUM_RUNS,
            customization_limit: 1,
            target_slot_count: 2,
            retry_set_count: 3,
            mode: ExplorationMode::Item,
            strategy: DEFAULT_STRATEGY.to_string(),
            workers: None,
            trial_timeout_ms: Some(120_000),
        }
    }
}

fn invalid(field: &str, reason: String) -> ValidationError {
    ValidationError::InvalidConfig {
        field: field.to_string(),
        reason,
    }
}

impl ExplorerConfig {
    /// Validate every bounded field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !NUM_RUNS_CHOICES.contains(&self.num_runs) {
            return Err(invalid(
                "num_runs",
                format!("must be one of {NUM_RUNS_CHOICES:?} (got {})", self.num_runs),
            ));
        }
        if !(1..=2).contains(&self.customization_limit) {
            return Err(invalid(
                "customization_limit",
                format!("must be 1 or 2 (got {})", self.customization_limit),
            ));
        }
        if !(2..=4).contains(&self.target_slot_count) {
            return Err(invalid(
                "target_slot_count",
                format!("must be 2..=4 (got {})", self.target_slot_count),
            ));
        }
        if !(1..=10).contains(&self.retry_set_count) {
            return Err(invalid(
                "retry_set_count",
                format!("must be 1..=10 (got {})", self.retry_set_count),
            ));
        }
        if self.strategy.trim().is_empty() {
            return Err(invalid("strategy", "must not be empty".to_string()));
        }
        if self.workers == Some(0) {
            return Err(invalid("workers", "must be > 0".to_string()));
        }
        if self.trial_timeout_ms == Some(0) {
            return Err(invalid("trial_timeout_ms", "must be > 0".to_string()));
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> ExplorerResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ExplorerError::Storage(StorageError::SerializationError(e.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> ExplorerResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ExplorerError::Storage(StorageError::BackendError(e.to_string())))?;
        Self::from_json_str(&json)
    }

    /// Worker threads to start, capped at [`MAX_WORKERS`], at least 1.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers
            .unwrap_or_else(num_cpus::get)
            .clamp(1, MAX_WORKERS)
    }

    /// Per-candidate trial deadline.
    #[must_use]
    pub fn trial_timeout(&self) -> Option<Duration> {
        self.trial_timeout_ms.map(Duration::from_millis)
    }

    /// Card-swap generator settings derived from this configuration.
    #[must_use]
    pub const fn swap_settings(&self) -> CardSwapSettings {
        CardSwapSettings {
            target_slot_count: self.target_slot_count,
            customization_limit: self.customization_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        ExplorerConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_values() {
        let cases: Vec<fn(&mut ExplorerConfig)> = vec![
            |c| c.num_runs = 150,
            |c| c.customization_limit = 0,
            |c| c.customization_limit = 3,
            |c| c.target_slot_count = 1,
            |c| c.target_slot_count = 5,
            |c| c.retry_set_count = 0,
            |c| c.retry_set_count = 11,
            |c| c.strategy = " ".to_string(),
            |c| c.workers = Some(0),
            |c| c.trial_timeout_ms = Some(0),
        ];
        for mutate in cases {
            let mut c = ExplorerConfig::default();
            mutate(&mut c);
            assert!(c.validate().is_err(), "{c:?} should be rejected");
        }
    }

    #[test]
    fn parses_partial_json_with_defaults() {
        let c = ExplorerConfig::from_json_str(r#"{"num_runs": 1000, "mode": "card"}"#).unwrap();
        assert_eq!(c.num_runs, 1000);
        assert_eq!(c.mode, ExplorationMode::Card);
        assert_eq!(c.strategy, DEFAULT_STRATEGY);
    }

    #[test]
    fn json_errors_are_reported() {
        let err = ExplorerConfig::from_json_str("{not json").unwrap_err();
        assert!(err.is_storage());

        let err = ExplorerConfig::from_json_str(r#"{"num_runs": 7}"#).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn worker_count_is_bounded() {
        let mut c = ExplorerConfig::default();
        c.workers = Some(64);
        assert_eq!(c.worker_count(), MAX_WORKERS);
        c.workers = Some(1);
        assert_eq!(c.worker_count(), 1);
        c.workers = None;
        assert!((1..=MAX_WORKERS).contains(&c.worker_count()));
    }
}
