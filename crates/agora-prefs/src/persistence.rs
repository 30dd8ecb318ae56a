//! Persistence collaborators for preference snapshots.
//!
//! # Design
//! - `PreferencePersistence` is the seam between the store and whatever keeps
//!   the canonical copy (HTTP backend, local file, or the fixed-delay stub).
//! - A save always carries the full snapshot; there are no partial writes.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, instrument};

use crate::error::PersistenceError;
use crate::model::SettingsSnapshot;

/// Delay used by [`DelayedNoopPersistence::default`].
pub const DEFAULT_STUB_DELAY: Duration = Duration::from_secs(1);

/// Backend that holds the canonical copy of a user's preferences.
#[async_trait]
pub trait PreferencePersistence: Send + Sync {
    /// Fetch the stored snapshot; `None` means nothing has been saved yet.
    async fn load(&self) -> Result<Option<SettingsSnapshot>, PersistenceError>;
    /// Replace the stored snapshot with `snapshot`.
    async fn store(&self, snapshot: &SettingsSnapshot) -> Result<(), PersistenceError>;
}

/// Shared reference to a persistence backend.
pub type SharedPersistence = Arc<dyn PreferencePersistence>;

/// Stand-in backend that waits a fixed delay and accepts every save.
#[derive(Debug, Clone, Copy)]
pub struct DelayedNoopPersistence {
    delay: Duration,
}

impl DelayedNoopPersistence {
    /// Stub that completes each save after `delay`.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for DelayedNoopPersistence {
    fn default() -> Self {
        Self::new(DEFAULT_STUB_DELAY)
    }
}

#[async_trait]
impl PreferencePersistence for DelayedNoopPersistence {
    async fn load(&self) -> Result<Option<SettingsSnapshot>, PersistenceError> {
        Ok(None)
    }

    async fn store(&self, _snapshot: &SettingsSnapshot) -> Result<(), PersistenceError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Local JSON file backend; writes go to a sibling temp file then rename.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    /// Backend that reads and writes `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the preferences file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn storage_error(operation: &str, path: &Path, err: &std::io::Error) -> PersistenceError {
    PersistenceError::Storage {
        detail: format!("{operation} {}: {err}", path.display()),
    }
}

#[async_trait]
impl PreferencePersistence for JsonFilePersistence {
    #[instrument(name = "json_file.load", skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Option<SettingsSnapshot>, PersistenceError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("preferences file not found");
                return Ok(None);
            }
            Err(err) => return Err(storage_error("read", &self.path, &err)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|err| PersistenceError::Corrupt {
                detail: err.to_string(),
            })
    }

    #[instrument(name = "json_file.store", skip_all, fields(path = %self.path.display()))]
    async fn store(&self, snapshot: &SettingsSnapshot) -> Result<(), PersistenceError> {
        let payload =
            serde_json::to_vec_pretty(snapshot).map_err(|err| PersistenceError::Storage {
                detail: format!("encode snapshot: {err}"),
            })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| storage_error("create", parent, &err))?;
        }

        let staging = self.staging_path();
        fs::write(&staging, payload)
            .await
            .map_err(|err| storage_error("write", &staging, &err))?;
        fs::rename(&staging, &self.path)
            .await
            .map_err(|err| storage_error("rename", &self.path, &err))?;
        debug!("preferences file written");
        Ok(())
    }
}
