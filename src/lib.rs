//! # deckexplorer - loadout variant exploration and ranking
//!
//! deckexplorer searches the space of item and card variants of a game
//! loadout, scores every variant with many randomized runs of an external
//! simulator, and ranks the results. A refinement pass re-scores the best
//! variants over several rounds and accumulates rank-based points per
//! variant.
//!
//! ## Core Concepts
//!
//! - **Loadout**: three item slots and two memory sets of six card slots
//! - **Variant**: one loadout produced by a candidate generator
//! - **VariantKey**: slot-order-independent identity of a variant
//! - **Trial**: one randomized simulator run; a variant's score is the mean of many
//! - **Ledger**: refinement points and trial counts per variant key
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use deckexplorer::{ExplorationInput, ExplorationSession, ExplorerConfig, StaticCatalog};
//!
//! let mut session = ExplorationSession::new(
//!     ExplorerConfig::from_path("explorer.json")?,
//!     Arc::new(my_simulator),
//!     Arc::new(StaticCatalog::new()),
//! )?;
//! let report = session.explore(&input)?;
//! for candidate in report.display() {
//!     println!("{} {:.1}", candidate.key(), candidate.mean());
//! }
//! let refined = session.refine()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Data model
pub mod error;
pub mod key;
pub mod loadout;
pub mod schema;

// Search
pub mod candidates;
pub mod catalog;
pub mod combinatorics;

// Scoring
pub mod dispatch;
pub mod rank;
pub mod refine;

// Session and boundaries
pub mod config;
pub mod session;
pub mod share;
pub mod storage;

// Re-export primary types at crate root for convenience
pub use candidates::{CardSwapSettings, Variant, VariantOrigin};
pub use catalog::{CardCatalog, StaticCatalog};
pub use config::{ExplorationMode, ExplorerConfig};
pub use dispatch::{SimulationConfig, SimulationOutcome, Simulator, TrialDispatcher, TrialScores};
pub use error::{ExecutionError, ExplorerError, ExplorerResult, ShareError, ValidationError};
pub use key::VariantKey;
pub use loadout::{CardCandidate, CardId, Customization, ItemId, Loadout, MemorySet, SlotTarget};
pub use rank::{Candidate, Ranking};
pub use refine::Ledger;
pub use schema::LoadoutRecord;
pub use session::{ExplorationInput, ExplorationReport, ExplorationSession, RefinementReport, SessionState};
pub use storage::{InMemoryStore, KeyValueStore, SavedExploration, StorageError};
