// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use thiserror::Error;

use crate::state::TransientState;

#[derive(Debug, Error)]
#[error("failed to persist state: {0}")]
pub struct PersistError(pub String);

/// The external state store (§6). Flushed after every successful action
/// so that a `kill -9` at any point leaves the store consistent with all
/// actions finished before the crash (§5).
pub trait StatePersister: Send + Sync {
    fn flush(&self, state: &TransientState) -> Result<(), PersistError>;

    /// Loads the persisted state at startup.
    fn load(&self) -> Result<TransientState, PersistError>;
}

/// An in-memory persister that never touches disk; useful for dry runs
/// and for tests exercising the engine in isolation.
#[derive(Debug, Default)]
pub struct NullPersister;

impl StatePersister for NullPersister {
    fn flush(&self, _state: &TransientState) -> Result<(), PersistError> {
        Ok(())
    }

    fn load(&self) -> Result<TransientState, PersistError> {
        Ok(TransientState::new())
    }
}
