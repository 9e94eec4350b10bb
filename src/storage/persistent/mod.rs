//! File-backed storage.
//!
//! ```text
//! <dir>/
//!   <key>.entry    [MAGIC][VERSION][version][len][json][crc32]
//! ```
//!
//! Entries are checksummed; a damaged entry reads as
//! [`StorageError::Corrupted`](crate::storage::StorageError::Corrupted)
//! rather than a bogus value.

mod codec;
mod store;

pub use store::{FileStore, FileStoreConfig};

use std::path::Path;

use crate::storage::StorageError;

/// Opens a file store at `path` with default options.
pub fn open_store(path: impl AsRef<Path>) -> Result<FileStore, StorageError> {
    FileStore::open(path, FileStoreConfig::default())
}
