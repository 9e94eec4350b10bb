//! Exploration sessions.
//!
//! A session owns the trial dispatcher, the refinement ledger and the last
//! base ranking, and moves through
//! `Idle -> Generating -> Scoring -> Ranked -> (Refining -> Ranked)*`.
//! A new exploration clears the ledger; any failure returns it to `Idle`.

use std::fmt;
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::candidates::{card_swap_variants, item_variants, SwapStats, Variant, MAX_ITEM_CANDIDATES};
use crate::catalog::CardCatalog;
use crate::config::{ExplorationMode, ExplorerConfig};
use crate::dispatch::{SimulationConfig, Simulator, TrialDispatcher, TrialScores};
use crate::error::{ExecutionError, ExplorerError, ExplorerResult, ValidationError};
use crate::key::VariantKey;
use crate::loadout::{CardCandidate, ItemId, Loadout};
use crate::rank::{Candidate, Ranking};
use crate::refine::{select_retry_set, Ledger, RefinementLoop, RoundSummary};
use crate::schema::{self, LoadoutRecord};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No exploration has produced a ranking.
    #[default]
    Idle,
    /// Building candidate variants.
    Generating,
    /// Running trials for each candidate.
    Scoring,
    /// A base ranking is available.
    Ranked,
    /// Re-scoring the retry set.
    Refining,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Generating => "generating",
            Self::Scoring => "scoring",
            Self::Ranked => "ranked",
            Self::Refining => "refining",
        };
        f.write_str(s)
    }
}

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a new random session ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the user asked to explore.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorationInput {
    /// Base loadout, possibly in the legacy shape.
    pub loadout: LoadoutRecord,
    /// Stage parameters handed to the simulator untouched.
    #[serde(default)]
    pub stage: serde_json::Value,
    /// Items tried in item mode (at most 3).
    #[serde(default)]
    pub item_candidates: Vec<Option<ItemId>>,
    /// Cards tried in card mode (at most 3).
    #[serde(default)]
    pub card_candidates: Vec<CardCandidate>,
}

/// A variant whose scoring failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedCandidate {
    /// Identity of the failed variant.
    pub key: VariantKey,
    /// Rendered failure.
    pub error: String,
}

/// Result of one base exploration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorationReport {
    /// Session that ran the exploration.
    pub session_id: SessionId,
    /// Generator used.
    pub mode: ExplorationMode,
    /// When generation started.
    pub started_at: DateTime<Utc>,
    /// When the last candidate was scored.
    pub finished_at: DateTime<Utc>,
    /// Variants produced by the generator, baseline included.
    pub generated: usize,
    /// Card-swap filter counts; `None` in item mode.
    pub swap_stats: Option<SwapStats>,
    /// Every successfully scored variant, best first.
    pub ranking: Ranking,
    /// Variants excluded from the ranking because scoring failed.
    pub failed: Vec<FailedCandidate>,
}

impl ExplorationReport {
    /// The ranked candidates shown to the user.
    #[must_use]
    pub fn display(&self) -> &[Candidate] {
        self.ranking.display()
    }
}

/// Result of one refinement pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinementReport {
    /// Session that ran the pass.
    pub session_id: SessionId,
    /// When the pass started.
    pub started_at: DateTime<Utc>,
    /// When the last round finished.
    pub finished_at: DateTime<Utc>,
    /// Size of the retry set.
    pub retried: usize,
    /// Per-round order and failure counts.
    pub rounds: Vec<RoundSummary>,
    /// Latest scores of the retry set with accumulated points, best first.
    pub ranking: Ranking,
}

impl RefinementReport {
    /// The refined candidates shown to the user.
    #[must_use]
    pub fn display(&self) -> &[Candidate] {
        self.ranking.display()
    }
}

struct BaseRun {
    mode: ExplorationMode,
    stage: serde_json::Value,
    ranking: Ranking,
}

/// Drives exploration and refinement for one user.
pub struct ExplorationSession {
    id: SessionId,
    config: ExplorerConfig,
    dispatcher: TrialDispatcher,
    catalog: Arc<dyn CardCatalog>,
    state: SessionState,
    ledger: Ledger,
    base: Option<BaseRun>,
}

impl ExplorationSession {
    /// Validates `config` and starts the worker pool it asks for.
    pub fn new(
        config: ExplorerConfig,
        simulator: Arc<dyn Simulator>,
        catalog: Arc<dyn CardCatalog>,
    ) -> ExplorerResult<Self> {
        config.validate()?;
        let dispatcher = TrialDispatcher::from_config(simulator, &config)?;
        Ok(Self::with_dispatcher(config, dispatcher, catalog))
    }

    /// Uses an existing dispatcher. `config` is assumed valid.
    #[must_use]
    pub fn with_dispatcher(config: ExplorerConfig, dispatcher: TrialDispatcher, catalog: Arc<dyn CardCatalog>) -> Self {
        let id = SessionId::new();
        info!(
            "session {id} ready: mode={:?} runs={} workers={}",
            config.mode,
            config.num_runs,
            dispatcher.worker_count()
        );
        Self {
            id,
            config,
            dispatcher,
            catalog,
            state: SessionState::Idle,
            ledger: Ledger::new(),
            base: None,
        }
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    /// Refinement points and trial counts of this session.
    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Ranking of the last base exploration.
    #[must_use]
    pub fn ranking(&self) -> Option<&Ranking> {
        self.base.as_ref().map(|b| &b.ranking)
    }

    /// Switches the generator used by the next exploration.
    pub fn set_mode(&mut self, mode: ExplorationMode) {
        self.config.mode = mode;
    }

    /// Drops the base ranking and the ledger.
    pub fn reset(&mut self) {
        self.ledger.clear();
        self.base = None;
        self.state = SessionState::Idle;
    }

    /// Generates, scores and ranks the variants of `input`.
    ///
    /// Clears the ledger first. Variants whose scoring fails are reported in
    /// [`ExplorationReport::failed`] and left out of the ranking.
    pub fn explore(&mut self, input: &ExplorationInput) -> ExplorerResult<ExplorationReport> {
        self.reset();
        let started_at = Utc::now();

        match self.run_exploration(input, started_at) {
            Ok((report, base)) => {
                self.base = Some(base);
                self.state = SessionState::Ranked;
                Ok(report)
            }
            Err(err) => {
                warn!("session {}: exploration failed: {err}", self.id);
                self.state = SessionState::Idle;
                Err(err)
            }
        }
    }

    fn generate(&self, input: &ExplorationInput) -> ExplorerResult<(Vec<Variant>, Option<SwapStats>)> {
        match self.config.mode {
            ExplorationMode::Item => {
                if input.item_candidates.len() > MAX_ITEM_CANDIDATES {
                    return Err(ValidationError::TooManyCandidates {
                        kind: "item".to_string(),
                        max: MAX_ITEM_CANDIDATES,
                        actual: input.item_candidates.len(),
                    }
                    .into());
                }
                let base = schema::resolve_items_only(&input.loadout)?;
                Ok((item_variants(&base, &input.item_candidates), None))
            }
            ExplorationMode::Card => {
                let base = schema::resolve(&input.loadout)?;
                let outcome = card_swap_variants(
                    &base,
                    &input.card_candidates,
                    &self.config.swap_settings(),
                    self.catalog.as_ref(),
                )?;
                Ok((outcome.variants, Some(outcome.stats)))
            }
        }
    }

    fn run_exploration(
        &mut self,
        input: &ExplorationInput,
        started_at: DateTime<Utc>,
    ) -> ExplorerResult<(ExplorationReport, BaseRun)> {
        self.state = SessionState::Generating;
        let (variants, swap_stats) = self.generate(input)?;
        let generated = variants.len();
        info!(
            "session {}: {generated} {:?} variants to score",
            self.id, self.config.mode
        );

        self.state = SessionState::Scoring;
        let mut scored = Vec::with_capacity(generated);
        let mut failed = Vec::new();
        for variant in variants {
            match self.score(&variant.loadout, &input.stage) {
                Ok(scores) => {
                    debug!("variant {} mean {:.2}", variant.key, scores.mean());
                    scored.push(Candidate::new(variant, scores));
                }
                Err(ExplorerError::Execution(err)) => {
                    warn!("variant {} failed: {err}", variant.key);
                    failed.push(FailedCandidate {
                        key: variant.key,
                        error: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
            thread::yield_now();
        }

        let ranking = Ranking::rank(scored);
        if let Some(best) = ranking.best() {
            info!("session {}: best mean {:.2} of {}", self.id, best.mean(), ranking.len());
        }

        let report = ExplorationReport {
            session_id: self.id,
            mode: self.config.mode,
            started_at,
            finished_at: Utc::now(),
            generated,
            swap_stats,
            ranking: ranking.clone(),
            failed,
        };
        let base = BaseRun {
            mode: self.config.mode,
            stage: input.stage.clone(),
            ranking,
        };
        Ok((report, base))
    }

    fn score(&self, loadout: &Loadout, stage: &serde_json::Value) -> ExplorerResult<TrialScores> {
        let config = Arc::new(SimulationConfig::new(loadout.clone(), stage.clone()));
        self.dispatcher.score(config, &self.config.strategy, self.config.num_runs)
    }

    /// Re-scores the best base candidates for `retry_set_count` rounds.
    ///
    /// Only valid after a card-mode exploration. Points and trials accumulate
    /// in the session ledger across calls.
    pub fn refine(&mut self) -> ExplorerResult<RefinementReport> {
        let base = match (&self.base, self.state) {
            (Some(base), SessionState::Ranked) if base.mode == ExplorationMode::Card => base,
            (Some(_), SessionState::Ranked) => {
                return Err(ExecutionError::InvalidTransition {
                    state: "ranked in item mode".to_string(),
                    action: "refine".to_string(),
                }
                .into())
            }
            _ => {
                return Err(ExecutionError::InvalidTransition {
                    state: self.state.to_string(),
                    action: "refine".to_string(),
                }
                .into())
            }
        };

        let started_at = Utc::now();
        self.state = SessionState::Refining;

        let retry = select_retry_set(&base.ranking);
        let outcome = RefinementLoop::new(
            &self.dispatcher,
            &self.config.strategy,
            self.config.num_runs,
            &base.stage,
        )
        .run(&retry, self.config.retry_set_count, &mut self.ledger);

        self.state = SessionState::Ranked;
        Ok(RefinementReport {
            session_id: self.id,
            started_at,
            finished_at: Utc::now(),
            retried: retry.len(),
            rounds: outcome.rounds,
            ranking: outcome.merged,
        })
    }
}
