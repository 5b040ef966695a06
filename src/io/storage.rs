use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
    #[error("could not serialize {key}: {source}")]
    SerializeError {
        key: String,
        source: serde_json::Error,
    },
}

/// String-keyed blob store
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Keep a copy of a blob that failed to parse. Best effort.
    fn quarantine(&self, _key: &str) {}
}

// ---------------------------------------------------------------------------
// File-backed storage
// ---------------------------------------------------------------------------

/// One `<key>.json` file per key inside a data directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStorage { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadError { path, source: e }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        fs::create_dir_all(&self.dir).map_err(|e| StorageError::WriteError {
            path: self.dir.clone(),
            source: e,
        })?;
        atomic_write(&path, value.as_bytes())
            .map_err(|e| StorageError::WriteError { path, source: e })
    }

    fn quarantine(&self, key: &str) {
        let path = self.path_for(key);
        let bak = path.with_extension("json.bak");
        match fs::copy(&path, &bak) {
            Ok(_) => tracing::warn!(backup = %bak.display(), "backed up unreadable data"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not back up unreadable data"),
        }
    }
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// In-memory storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Typed access
// ---------------------------------------------------------------------------

/// Load and deserialize `key`, falling back to `default` when the key is
/// absent, unreadable, or holds malformed data. Failures are logged.
pub fn load_or_default<T: DeserializeOwned>(storage: &dyn Storage, key: &str, default: T) -> T {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return default,
        Err(e) => {
            tracing::warn!(key, error = %e, "could not read stored data, using default");
            return default;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "stored data is corrupt, using default");
            storage.quarantine(key);
            default
        }
    }
}

/// Serialize `value` as JSON and store it under `key`
pub fn save<T: Serialize + ?Sized>(
    storage: &mut dyn Storage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| StorageError::SerializeError {
        key: key.to_string(),
        source: e,
    })?;
    storage.set(key, &json)
}
