// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use thiserror::Error;

use crate::{graph::Solution, package::Package, state::TransientState};

/// A fetched source artifact; opaque to the engine.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: camino::Utf8PathBuf,
}

/// Error surfaced by the external package-action executor (§6, §7).
///
/// Each variant maps 1:1 onto one of the audit log's `error` record
/// shapes (§6).
#[derive(Debug, Error, Serialize)]
pub enum ExecError {
    #[error("process exited with code {code} after {duration}s")]
    #[serde(rename = "process-error")]
    Process {
        code: String,
        duration: f64,
        info: BTreeMap<String, String>,
        stdout: Vec<String>,
        stderr: Vec<String>,
    },
    #[error("internal error: {0}")]
    #[serde(rename = "internal-error")]
    Internal(String),
    #[error("package error: {0}")]
    #[serde(rename = "package-error")]
    Package(String),
    #[error("{0}")]
    #[serde(rename = "exception")]
    Unclassified(String),
}

impl ExecError {
    /// The `{"package": .., "error": E}` audit record for this failure (§6).
    pub fn audit_record(&self, package: &Package) -> serde_json::Value {
        serde_json::json!({
            "package": package.name_version(),
            "error": self,
        })
    }
}

/// Outcome of the bulk removal step (§4.3).
pub enum RemovalOutcome {
    Successful { new_state: TransientState, deleted: HashSet<Package> },
    Exception(ExecError),
}

/// The external collaborator that performs the actual download, build,
/// install and removal work for a single package (§6). Out of scope for
/// this specification beyond this contract.
pub trait PackageExecutor: Send + Sync {
    /// Builds and installs `package` against `state`. `metadata` mirrors
    /// the source's flag of the same name and is always `false` from the
    /// Scheduler per §4.4's pseudocode.
    fn build_and_install(&self, state: &TransientState, package: &Package, metadata: bool) -> Result<(), ExecError>;

    /// Removes every package the plan will replace, recompile, or delete,
    /// as a single bulk step (§4.3).
    fn remove_all_packages(&self, state: &TransientState, solution: &Solution) -> RemovalOutcome;

    /// Best-effort cleanup of a deleted, non-pinned package's artefacts.
    /// Invoked from a finalizer (§4.3), never from the hot path.
    fn cleanup_package_artefacts(&self, state: &TransientState, package: &Package);

    /// Makes `package` visible to future invocations by writing its
    /// metadata into the package index (§4.4's `apply_post_install`).
    fn install_metadata(&self, state: &TransientState, package: &Package) -> Result<(), ExecError>;

    /// Fetches `package`'s source, returning `None` on a cache/repository miss (§4.2).
    fn download_package(&self, state: &TransientState, package: &Package) -> Option<Artifact>;

    /// The packages whose sources must be fetched before this solution can be applied (§4.2).
    fn sources_needed(&self, state: &TransientState, solution: &Solution) -> HashSet<Package>;

    /// Whether `package`'s source is locally pinned (skips cache warm-up and artefact cleanup).
    fn is_pinned(&self, package: &Package) -> bool {
        let _ = package;
        false
    }

    /// Best-effort HTTP cache warm-up ahead of the real fetch (§4.2).
    /// Default no-op for executors without a warm cache concept.
    fn warm_cache(&self, package: &Package) -> Result<(), ExecError> {
        let _ = package;
        Ok(())
    }
}
