//! JSON-file key-value store: the client profile on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use boleteria_core::error::{AppError, ErrorKind};
use boleteria_core::result::AppResult;
use boleteria_core::traits::KeyValueStore;

/// Durable key-value store persisted as one JSON object per profile
/// file. Holds the anonymous session id and the cart snapshot across
/// restarts, the way a browser profile would.
#[derive(Debug)]
pub struct JsonFileKvStore {
    path: PathBuf,
    /// In-memory image of the file; flushed whole on every mutation.
    entries: Mutex<HashMap<String, String>>,
}

impl JsonFileKvStore {
    /// Open (or create) the profile file at `path`.
    ///
    /// A missing file starts empty; a malformed one is logged and
    /// treated as empty rather than blocking startup.
    pub async fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        ensure_parent(&path).await?;

        let entries = match fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Profile file malformed, starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Transport,
                    format!("Failed to read profile file: {}", path.display()),
                    e,
                ));
            }
        };

        debug!(path = %path.display(), keys = entries.len(), "Profile store opened");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    async fn flush(&self, entries: &HashMap<String, String>) -> AppResult<()> {
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, json).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Transport,
                format!("Failed to write profile file: {}", self.path.display()),
                e,
            )
        })
    }
}

async fn ensure_parent(path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Transport,
                format!("Failed to create profile directory: {}", parent.display()),
                e,
            )
        })?;
    }
    Ok(())
}

#[async_trait]
impl KeyValueStore for JsonFileKvStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let entries = self.entries.lock().await;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> AppResult<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries).await
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        let mut entries = self.entries.lock().await;
        if entries.remove(key).is_some() {
            self.flush(&entries).await?;
        }
        Ok(())
    }
}
