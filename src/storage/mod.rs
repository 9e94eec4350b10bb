//! Persistence boundary.
//!
//! Explorations are saved as a single JSON record under
//! [`SAVED_EXPLORATION_KEY`] in a small string key-value store. Two backends
//! are provided: [`InMemoryStore`] and, with the `persistent` feature, a
//! file-backed store in [`persistent`].

mod memory;
#[cfg(feature = "persistent")]
pub mod persistent;

pub use memory::InMemoryStore;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::loadout::ItemId;
use crate::schema::LoadoutRecord;

/// Key under which the last exploration input is saved.
pub const SAVED_EXPLORATION_KEY: &str = "deckexplorer.saved_exploration";

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Nothing stored under the key.
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Key is not usable by the backend.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),

    /// Serialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Stored bytes failed their integrity check.
    #[error("Corrupted entry: {0}")]
    Corrupted(String),
}

/// A string key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`. Returns true if it was present.
    fn remove(&self, key: &str) -> Result<bool, StorageError>;
}

/// A saved exploration input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedExploration {
    /// The base loadout.
    pub loadout: LoadoutRecord,
    /// Item candidates entered by the user.
    #[serde(default)]
    pub item_candidates: Vec<Option<ItemId>>,
    /// When the record was written.
    pub saved_at: DateTime<Utc>,
}

impl SavedExploration {
    /// A record stamped with the current time.
    #[must_use]
    pub fn new(loadout: LoadoutRecord, item_candidates: Vec<Option<ItemId>>) -> Self {
        Self {
            loadout,
            item_candidates,
            saved_at: Utc::now(),
        }
    }
}

/// Writes `saved` under [`SAVED_EXPLORATION_KEY`].
pub fn save_exploration(store: &dyn KeyValueStore, saved: &SavedExploration) -> Result<(), StorageError> {
    let json = serde_json::to_string(saved).map_err(|e| StorageError::SerializationError(e.to_string()))?;
    store.set(SAVED_EXPLORATION_KEY, &json)?;
    debug!("saved exploration ({} bytes)", json.len());
    Ok(())
}

/// Reads the record under [`SAVED_EXPLORATION_KEY`].
pub fn load_exploration(store: &dyn KeyValueStore) -> Result<SavedExploration, StorageError> {
    let json = store
        .get(SAVED_EXPLORATION_KEY)?
        .ok_or_else(|| StorageError::NotFound(SAVED_EXPLORATION_KEY.to_string()))?;
    serde_json::from_str(&json).map_err(|e| {
        warn!("saved exploration is unreadable: {e}");
        StorageError::SerializationError(e.to_string())
    })
}
