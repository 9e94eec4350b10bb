//! Simulator boundary.
//!
//! The per-turn game simulator is external. The engine only sees it through
//! [`Simulator`] and treats [`SimulationConfig`] as an opaque, serializable
//! value.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ExplorerResult;
use crate::loadout::Loadout;

/// Immutable input of one simulation: a loadout plus stage parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Loadout under test.
    pub loadout: Loadout,
    /// Stage/strategy parameters, passed through untouched.
    #[serde(default)]
    pub stage: serde_json::Value,
}

impl SimulationConfig {
    /// Creates a configuration.
    #[must_use]
    pub fn new(loadout: Loadout, stage: serde_json::Value) -> Self {
        Self { loadout, stage }
    }
}

/// Message sent to a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRequest {
    /// Shared configuration.
    pub config: Arc<SimulationConfig>,
    /// Strategy name.
    pub strategy_name: String,
    /// Trials to run.
    pub num_runs: usize,
}

/// Reply of one simulation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    /// One score per trial.
    pub scores: Vec<f64>,
}

impl SimulationOutcome {
    /// Wraps trial scores.
    #[must_use]
    pub fn new(scores: Vec<f64>) -> Self {
        Self { scores }
    }
}

/// The external per-turn simulator.
pub trait Simulator: Send + Sync {
    /// Runs `num_runs` trials of `config` with `strategy_name`.
    fn simulate(
        &self,
        config: &SimulationConfig,
        strategy_name: &str,
        num_runs: usize,
    ) -> ExplorerResult<SimulationOutcome>;
}

impl<F> Simulator for F
where
    F: Fn(&SimulationConfig, &str, usize) -> ExplorerResult<SimulationOutcome> + Send + Sync,
{
    fn simulate(
        &self,
        config: &SimulationConfig,
        strategy_name: &str,
        num_runs: usize,
    ) -> ExplorerResult<SimulationOutcome> {
        self(config, strategy_name, num_runs)
    }
}
