//! Settings store — where the analyzer credential lives.
//!
//! A flat string map under well-known keys. The file-backed store keeps the
//! whole map in memory and rewrites the JSON file on every change; the
//! in-memory store backs tests.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::frame::ErrorCode;

/// Key holding the analyzer bearer token.
pub const API_KEY: &str = "apiKey";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ErrorCode for SettingsError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "E_SETTINGS_IO",
            Self::Serialize(_) => "E_SETTINGS_SERIALIZE",
        }
    }
}

/// Async key-value settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`SettingsError`] if the backing store cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, SettingsError>;

    /// # Errors
    ///
    /// Returns a [`SettingsError`] if the backing store cannot be written.
    async fn set(&self, key: &str, value: &str) -> Result<(), SettingsError>;
}

// =============================================================================
// JSON FILE
// =============================================================================

/// Settings persisted as a pretty-printed JSON object.
pub struct JsonFileSettings {
    path: PathBuf,
    data: RwLock<BTreeMap<String, String>>,
}

impl JsonFileSettings {
    /// Load `path`, starting empty if the file does not exist yet.
    ///
    /// A file that is not a JSON string map is logged and ignored; it is
    /// replaced on the next write.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Io`] if the file exists but cannot be read.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(map) => map,
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "settings: unreadable file, starting empty");
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(SettingsError::Io { path, source }),
        };
        tracing::info!(path = %path.display(), keys = data.len(), "settings: loaded");
        Ok(Self { path, data: RwLock::new(data) })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, data: &BTreeMap<String, String>) -> Result<(), SettingsError> {
        let serialized = serde_json::to_string_pretty(data)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| SettingsError::Io { path: dir.to_path_buf(), source })?;
        }
        tokio::fs::write(&self.path, serialized)
            .await
            .map_err(|source| SettingsError::Io { path: self.path.clone(), source })
    }
}

#[async_trait]
impl SettingsStore for JsonFileSettings {
    async fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let mut guard = self.data.write().await;
        let previous = guard.insert(key.to_string(), value.to_string());
        if let Err(err) = self.persist(&guard).await {
            // Keep memory and disk in agreement.
            match previous {
                Some(old) => guard.insert(key.to_string(), old),
                None => guard.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }
}

// =============================================================================
// MEMORY
// =============================================================================

/// Volatile settings.
#[derive(Default)]
pub struct MemorySettings {
    data: RwLock<BTreeMap<String, String>>,
}

impl MemorySettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one entry.
    #[must_use]
    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut data = BTreeMap::new();
        data.insert(key.to_string(), value.to_string());
        Self { data: RwLock::new(data) }
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.data
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
