//! Error types for deckexplorer.
//!
//! All errors are strongly typed using thiserror. Every failure path in the
//! exploration engine degrades to one of these values; nothing here is fatal
//! to the host process.

use thiserror::Error;

use crate::storage::StorageError;

/// Validation errors raised before any simulation work is issued.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Loadout has neither memory sets nor legacy skill card groups")]
    MissingMemorySets,

    #[error("Field '{field}' holds {actual} entries, at most {expected} allowed")]
    SlotCountMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid configuration for '{field}': {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    #[error("Too many {kind} candidates: {actual} (max {max})")]
    TooManyCandidates {
        kind: String,
        max: usize,
        actual: usize,
    },

    #[error("Search space of {raw} raw variants exceeds the limit of {max}")]
    SearchSpaceTooLarge {
        raw: u64,
        max: u64,
    },

    #[error("Base loadout set {group_index} has {count} customizations (limit {limit})")]
    BaseOverBudget {
        group_index: usize,
        count: usize,
        limit: usize,
    },

    #[error("Invalid identifier: '{value}'")]
    InvalidIdentifier {
        value: String,
    },
}

/// Errors that occur while scoring candidates or driving a session.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Trial timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Worker {worker} disconnected")]
    Disconnected {
        worker: usize,
    },

    #[error("Worker {worker} already has a request in flight")]
    WorkerBusy {
        worker: usize,
    },

    #[error("No idle worker available ({size} workers in pool)")]
    PoolExhausted {
        size: usize,
    },

    #[error("Failed to spawn worker: {message}")]
    WorkerSpawn {
        message: String,
    },

    #[error("Simulator failed: {message}")]
    Simulator {
        message: String,
    },

    #[error("Simulation produced no finite scores")]
    NoSamples,

    #[error("Cannot {action} while session is {state}")]
    InvalidTransition {
        state: String,
        action: String,
    },
}

/// Errors raised while parsing or producing a shared link.
#[derive(Debug, Error)]
pub enum ShareError {
    #[error("Incomplete configuration: missing '{missing}'")]
    IncompleteConfiguration {
        missing: String,
    },

    #[error("Malformed value for '{param}': {value}")]
    Malformed {
        param: String,
        value: String,
    },
}

/// Top-level error type for deckexplorer.
#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Share error: {0}")]
    Share(#[from] ShareError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl ExplorerError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this is a storage error.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if this is a share-link error.
    #[must_use]
    pub const fn is_share(&self) -> bool {
        matches!(self, Self::Share(_))
    }

    /// Returns true if scoring the same candidate again may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Execution(e) => matches!(
                e,
                ExecutionError::Timeout { .. }
                    | ExecutionError::WorkerBusy { .. }
                    | ExecutionError::PoolExhausted { .. }
            ),
            Self::Validation(_) | Self::Storage(_) | Self::Share(_) | Self::Internal { .. } => {
                false
            }
        }
    }
}

/// Result type alias for deckexplorer operations.
pub type ExplorerResult<T> = Result<T, ExplorerError>;
