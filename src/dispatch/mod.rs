//! Trial dispatch.
//!
//! Scores a configuration by running many independent simulator trials,
//! either inline or fanned out over a fixed worker pool.

pub mod dispatcher;
pub mod pool;
pub mod scores;
pub mod simulator;

pub use dispatcher::TrialDispatcher;
pub use pool::{default_pool_size, TrialHandle, TrialPool, MAX_WORKERS};
pub use scores::{ScoreSummary, TrialScores};
pub use simulator::{SimulationConfig, SimulationOutcome, SimulationRequest, Simulator};
