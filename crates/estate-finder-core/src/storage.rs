// SPDX-License-Identifier: AGPL-3.0
// Estate Finder Core - Key/value persistence
//
// Every store writes JSON documents through KeyValueStorage.
// FileStorage keeps one `<key>.json` file per key in the config directory.

use crate::types::AppError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Persistence hook used by the settings, selection and recent stores
pub trait KeyValueStorage: Send + Sync {
    /// Read the raw JSON stored under `key`, if any
    fn load(&self, key: &str) -> Result<Option<String>, AppError>;

    /// Replace the JSON stored under `key`
    fn save(&self, key: &str, value: &str) -> Result<(), AppError>;

    /// Forget `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), AppError>;
}

/// Platform config directory, created if missing
pub fn default_config_dir() -> Result<PathBuf, AppError> {
    let config_dir = directories::ProjectDirs::from("app", "EstateFinder", "estate-finder")
        .ok_or_else(|| AppError::FileIo("Could not determine config directory".to_string()))?
        .config_dir()
        .to_path_buf();

    fs::create_dir_all(&config_dir)
        .map_err(|e| AppError::FileIo(format!("Failed to create config dir: {}", e)))?;

    Ok(config_dir)
}

/// Storage backed by JSON files in a directory
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Storage in the platform config directory
    pub fn new() -> Result<Self, AppError> {
        Ok(Self {
            dir: default_config_dir()?,
        })
    }

    /// Storage in an explicit directory, created if missing
    pub fn in_dir(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| AppError::FileIo(format!("Failed to create {:?}: {}", dir, e)))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, AppError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| AppError::FileIo(format!("Failed to read {}: {}", key, e)))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), AppError> {
        // Write then rename so a crash never leaves a half-written file
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)
            .map_err(|e| AppError::FileIo(format!("Failed to write {}: {}", key, e)))?;
        fs::rename(&tmp, &path)
            .map_err(|e| AppError::FileIo(format!("Failed to replace {}: {}", key, e)))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::FileIo(format!("Failed to remove {}: {}", key, e))),
        }
    }
}

/// In-memory storage, nothing survives the process
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, AppError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}
