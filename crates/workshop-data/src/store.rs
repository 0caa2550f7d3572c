//! File-backed persistence for [`AutomationState`].

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use workshop_core::host::ConfigStore;
use workshop_core::state::{AutomationState, STATE_VERSION, StoreError};

/// Pretty JSON in a single file. Writes go to a sibling temp file that is
/// then renamed over the target, so a crash never leaves half a file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ConfigStore for JsonFileStore {
    fn load(&mut self) -> Result<Option<AutomationState>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let state: AutomationState =
            serde_json::from_str(&content).map_err(|e| StoreError::Malformed(e.to_string()))?;
        if state.version > STATE_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: state.version,
                supported: STATE_VERSION,
            });
        }
        tracing::debug!(path = %self.path.display(), queued = state.queue.len(), "loaded state");
        Ok(Some(state))
    }

    fn save(&mut self, state: &AutomationState) -> Result<(), StoreError> {
        let json =
            serde_json::to_string_pretty(state).map_err(|e| StoreError::Malformed(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp = self.temp_path();
        fs::write(&temp, json)?;
        fs::rename(&temp, &self.path)?;
        tracing::trace!(path = %self.path.display(), "saved state");
        Ok(())
    }
}
