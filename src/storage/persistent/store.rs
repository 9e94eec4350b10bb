//! File-backed key-value store.
//!
//! One file per key under the store directory, named `<key>.entry`. Writes go
//! to a temporary file that is renamed over the entry, so readers never see a
//! partial value.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, warn};

use super::codec;
use crate::storage::{KeyValueStore, StorageError};

const ENTRY_EXTENSION: &str = "entry";

/// Options of a [`FileStore`].
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Whether to fsync every write before renaming it into place.
    pub sync_on_write: bool,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self { sync_on_write: true }
    }
}

/// A [`KeyValueStore`] persisted to a directory.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    config: FileStoreConfig,
    write_lock: Mutex<()>,
}

fn io_err(context: &str, err: &std::io::Error) -> StorageError {
    StorageError::BackendError(format!("{context}: {err}"))
}

fn valid_key(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && key != ".."
        && key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>, config: FileStoreConfig) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| io_err("create store directory", &e))?;
        debug!("opened file store at {}", dir.display());
        Ok(Self {
            dir,
            config,
            write_lock: Mutex::new(()),
        })
    }

    /// Directory holding the entries.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        if !valid_key(key) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.{ENTRY_EXTENSION}")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.entry_path(key)?;
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err("open entry", &e)),
        };

        let mut reader = BufReader::new(file);
        let value = codec::read_header(&mut reader)
            .and_then(|_| codec::decode::<String>(&mut reader))
            .map_err(|e| {
                warn!("entry {} is unreadable: {e}", path.display());
                StorageError::Corrupted(format!("{key}: {e}"))
            })?;
        Ok(Some(value))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.entry_path(key)?;
        let tmp = path.with_extension(format!("{ENTRY_EXTENSION}.tmp"));
        let frame = codec::encode(&value).map_err(|e| StorageError::SerializationError(e.to_string()))?;

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StorageError::BackendError("poisoned lock: set".to_string()))?;

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)
            .map_err(|e| io_err("create entry", &e))?;
        let mut writer = BufWriter::new(file);
        codec::write_header(&mut writer).map_err(|e| io_err("write entry", &e))?;
        writer.write_all(&frame).map_err(|e| io_err("write entry", &e))?;
        let file = writer
            .into_inner()
            .map_err(|e| io_err("flush entry", e.error()))?;
        if self.config.sync_on_write {
            file.sync_all().map_err(|e| io_err("sync entry", &e))?;
        }
        drop(file);

        fs::rename(&tmp, &path).map_err(|e| io_err("replace entry", &e))
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.entry_path(key)?;
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StorageError::BackendError("poisoned lock: remove".to_string()))?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_err("remove entry", &e)),
        }
    }
}
