use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::ChannelRegistry;

/// Everything that survives a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationSnapshot {
    #[serde(default)]
    pub channels: ChannelRegistry,
    #[serde(default)]
    pub tracking: bool,
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to access state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("state file {path} is not valid json: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// JSON file holding the [`ConfigurationSnapshot`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the snapshot. A missing file is bootstrapped with the defaults
    /// (no channels, tracking off) and written out right away.
    pub fn load(&self) -> Result<ConfigurationSnapshot, StateError> {
        if !self.path.exists() {
            info!(
                "state file {} not found, bootstrapping defaults",
                self.path.display()
            );
            let snapshot = ConfigurationSnapshot::default();
            self.save(&snapshot)?;
            return Ok(snapshot);
        }

        let content = std::fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        let snapshot: ConfigurationSnapshot =
            serde_json::from_str(&content).map_err(|source| StateError::Json {
                path: self.path.clone(),
                source,
            })?;
        debug!(
            "loaded state from {} channels={} tracking={}",
            self.path.display(),
            snapshot.channels.len(),
            snapshot.tracking
        );
        Ok(snapshot)
    }

    /// Writes to a sibling temp file and renames it over the target, so the
    /// file on disk is always the last complete save.
    pub fn save(&self, snapshot: &ConfigurationSnapshot) -> Result<(), StateError> {
        let body = serde_json::to_string_pretty(snapshot).map_err(|source| StateError::Json {
            path: self.path.clone(),
            source,
        })?;

        let tmp_path = self.tmp_path();
        std::fs::write(&tmp_path, body).map_err(|source| self.io_error(source))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|source| self.io_error(source))?;

        debug!("saved state to {}", self.path.display());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StateError {
        StateError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
