// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use thiserror::Error;

/// Exit codes the engine's callers (the CLI) surface to the shell (§6).
pub mod exit_codes {
    pub const ABORTED: i32 = 0;
    pub const ENV_WARNING_DECLINED: i32 = 1;
    pub const NO_SOLUTION: i32 = 3;
    pub const SOLUTION_CHECK_FAILED: i32 = 4;
    pub const UNSATISFIABLE_ATOMS: i32 = 66;
}

/// Top-level errors that unwind out of [`crate::applier::apply`] or
/// [`crate::applier::resolve_and_apply`] rather than being captured as
/// per-node [`crate::graph::Outcome`]s (§7).
#[derive(Debug, Error)]
pub enum Error {
    /// The solver could not satisfy the request; carries the conflict string
    /// that should be printed verbatim (§6, §7).
    #[error("no solution: {0}")]
    NoSolution(String),

    /// One or more atoms could not be resolved against the availability set (§4.7).
    #[error("unsatisfiable atoms: {0:?}")]
    UnsatisfiableAtoms(Vec<String>),

    /// The user declined the confirmation prompt following an
    /// environment-variable warning (§4.9).
    #[error("declined after environment-variable warning")]
    EnvWarningDeclined,

    /// A user-initiated signal (Ctrl-C) aborted the Scheduler (§5, §7).
    /// Finalizers have already been run by the time this is returned.
    #[error("interrupted")]
    Interrupted,

    /// State-store or executor failure encountered outside of node
    /// execution (e.g. failing to open the store before Removal).
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::NoSolution(_) => exit_codes::NO_SOLUTION,
            Error::UnsatisfiableAtoms(_) => exit_codes::UNSATISFIABLE_ATOMS,
            Error::EnvWarningDeclined => exit_codes::ENV_WARNING_DECLINED,
            Error::Interrupted => exit_codes::ABORTED,
            Error::Internal(_) => exit_codes::SOLUTION_CHECK_FAILED,
        }
    }
}
