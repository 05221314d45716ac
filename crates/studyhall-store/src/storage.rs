use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{StoreError, StoreResult};

/// Key/value persistence used by the session store
pub trait Storage: Send {
    /// Read the value stored under `key`, `None` if nothing was stored yet
    fn load(&self, key: &str) -> StoreResult<Option<String>>;

    /// Replace the value stored under `key`
    fn save(&self, key: &str, value: &str) -> StoreResult<()>;
}

/// Stores each key as `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create a file storage rooted at `dir`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(dir: P) -> StoreResult<Self> {
        let dir = Self::expand_tilde(dir.as_ref());

        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
                path: dir.clone(),
                source,
            })?;
        }

        Ok(Self { dir })
    }

    /// Expand ~ to home directory
    fn expand_tilde(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        match std::env::var("HOME") {
            Ok(home) if path_str == "~" => PathBuf::from(home),
            Ok(home) if path_str.starts_with("~/") => PathBuf::from(home).join(&path_str[2..]),
            _ => path.to_path_buf(),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Storage for FileStorage {
    fn load(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|source| StoreError::Io { path, source })
    }

    fn save(&self, key: &str, value: &str) -> StoreResult<()> {
        let path = self.path_for(key);
        // Write a sibling file, then rename it into place
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io { path, source })
    }
}

/// In-memory storage. Clones share the same map, so a test can keep a
/// handle and inspect what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    pub fn insert(&self, key: &str, value: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value.into());
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.get(key))
    }

    fn save(&self, key: &str, value: &str) -> StoreResult<()> {
        self.insert(key, value);
        Ok(())
    }
}
