// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! File-backed package state store (§6, §12). The Scheduler flushes
//! after every completed action (§5), so this is on the hot path and
//! stays a single atomic rename rather than an incremental format.

use std::path::{Path, PathBuf};

use fs_err as fs;
use kiln_engine::{PersistError, StatePersister, TransientState};
use tracing::instrument;

pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StatePersister for JsonStore {
    #[instrument(skip(self, state), fields(path = %self.path.display()))]
    fn flush(&self, state: &TransientState) -> Result<(), PersistError> {
        let serialized = serde_json::to_vec_pretty(state).map_err(|e| PersistError(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| PersistError(e.to_string()))?;
        }

        // Write to a sibling temp file and rename, so a crash mid-write
        // never leaves a half-written state file behind (§5).
        let tmp_path = tmp_path_for(&self.path);
        fs::write(&tmp_path, &serialized).map_err(|e| PersistError(e.to_string()))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| PersistError(e.to_string()))?;

        Ok(())
    }

    fn load(&self) -> Result<TransientState, PersistError> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| PersistError(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TransientState::new()),
            Err(e) => Err(PersistError(e.to_string())),
        }
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let file_name = path.file_name().map(|n| format!("{}.tmp", n.to_string_lossy())).unwrap_or_else(|| "state.tmp".to_string());
    path.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("state.json"));

        let mut state = TransientState::new();
        state.installed.insert(kiln_engine::Package::new("foo", "1.0"));

        store.flush(&state).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.installed, state.installed);
    }

    #[test]
    fn missing_file_loads_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("missing.json"));
        let loaded = store.load().unwrap();
        assert!(loaded.installed.is_empty());
    }
}
