// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The concrete [`PackageExecutor`]: fetches a cached source artefact,
//! shells out to the configured build/install commands, and keeps the
//! on-disk package metadata directory in sync.
//!
//! Out of scope here (as for the rest of the engine, §6): sandboxing,
//! container isolation, and trigger execution — those belong to a
//! dedicated post-blit stage this binary doesn't implement.

use std::{
    collections::{BTreeMap, HashSet},
    process::Command,
    time::Instant,
};

use fs_err as fs;
use kiln_engine::{Artifact, ExecError, Package, PackageExecutor, RemovalOutcome, Solution, TransientState};
use tracing::{info, instrument, warn};

use crate::installation::Installation;

pub struct ProcessExecutor {
    installation: Installation,
    build_command: String,
    install_command: String,
}

impl ProcessExecutor {
    pub fn new(installation: Installation, build_command: String, install_command: String) -> Self {
        Self {
            installation,
            build_command,
            install_command,
        }
    }

    fn run(&self, template: &str, package: &Package) -> Result<(), ExecError> {
        let command_line = template
            .replace("{name}", package.name.as_str())
            .replace("{version}", package.version.as_str())
            .replace("{root}", &self.installation.root.to_string_lossy());

        let start = Instant::now();
        let output = Command::new("sh")
            .arg("-c")
            .arg(&command_line)
            .output()
            .map_err(|err| ExecError::Internal(format!("failed to spawn {command_line:?}: {err}")))?;

        let duration = start.elapsed().as_secs_f64();

        if output.status.success() {
            Ok(())
        } else {
            let mut info = BTreeMap::new();
            info.insert("command".to_string(), command_line);
            Err(ExecError::Process {
                code: output.status.code().map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()),
                duration,
                info,
                stdout: String::from_utf8_lossy(&output.stdout).lines().map(String::from).collect(),
                stderr: String::from_utf8_lossy(&output.stderr).lines().map(String::from).collect(),
            })
        }
    }

    fn source_path(&self, package: &Package) -> std::path::PathBuf {
        self.installation.cache_path(format!("{}.src", package.name_version()))
    }

    fn metadata_path(&self, package: &Package) -> std::path::PathBuf {
        self.installation.assets_path(format!("{}.meta.json", package.name_version()))
    }
}

impl PackageExecutor for ProcessExecutor {
    #[instrument(skip(self, state), fields(package = %package))]
    fn build_and_install(&self, state: &TransientState, package: &Package, metadata: bool) -> Result<(), ExecError> {
        let _ = state;
        self.run(&self.build_command, package)?;
        self.run(&self.install_command, package)?;

        if metadata {
            self.install_metadata(state, package)?;
        }

        info!("built and installed");
        Ok(())
    }

    #[instrument(skip(self, state, solution))]
    fn remove_all_packages(&self, state: &TransientState, solution: &Solution) -> RemovalOutcome {
        let mut new_state = state.clone();
        let mut deleted = HashSet::new();

        for action in solution.to_process.iter_nodes() {
            let previous = match action {
                kiln_engine::Action::ToDelete(p) => Some(p.clone()),
                kiln_engine::Action::ToChange { previous: Some(p), .. } => Some(p.clone()),
                kiln_engine::Action::ToRecompile(p) => Some(p.clone()),
                kiln_engine::Action::ToChange { previous: None, .. } => None,
            };

            if let Some(previous) = previous {
                new_state.installed.remove(&previous);
                new_state.installed_roots.remove(&previous);
                deleted.insert(previous);
            }
        }

        new_state.assert_invariants();
        RemovalOutcome::Successful { new_state, deleted }
    }

    fn cleanup_package_artefacts(&self, _state: &TransientState, package: &Package) {
        let path = self.source_path(package);
        if let Err(err) = fs::remove_file(&path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(%err, package = %package, "failed to clean up package artefacts");
            }
        }
    }

    fn install_metadata(&self, _state: &TransientState, package: &Package) -> Result<(), ExecError> {
        let serialized = serde_json::to_vec_pretty(package).map_err(|e| ExecError::Internal(e.to_string()))?;
        fs::write(self.metadata_path(package), serialized).map_err(|e| ExecError::Internal(e.to_string()))
    }

    fn download_package(&self, _state: &TransientState, package: &Package) -> Option<Artifact> {
        let repo_source = self.installation.repo_path(format!("{}.src", package.name_version()));
        if !repo_source.exists() {
            return None;
        }

        let cached = self.source_path(package);
        if !cached.exists() {
            crate::util::hardlink_or_copy(&repo_source, &cached).ok()?;
        }

        camino::Utf8PathBuf::from_path_buf(cached).ok().map(|path| Artifact { path })
    }

    fn sources_needed(&self, _state: &TransientState, solution: &Solution) -> HashSet<Package> {
        solution
            .to_process
            .iter_nodes()
            .filter(|a| !a.is_delete())
            .map(|a| a.package().clone())
            .filter(|p| !self.source_path(p).exists())
            .collect()
    }
}
