// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! `kiln.yaml` configuration (§12), loaded via [`config::Manager`] the
//! same way the rest of the ecosystem loads its YAML config: merged from
//! `/usr/share` and `/etc` relative to the installation root, then
//! overridden by whatever the CLI flags supplied.

use serde::Deserialize;

use crate::installation::Installation;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub download_jobs: usize,
    pub build_jobs: usize,
    pub strict_atoms: bool,
    pub auto_yes: bool,
    pub audit_log_path: Option<String>,
    pub build_command: String,
    pub install_command: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_jobs: crate::util::num_cpus().get(),
            build_jobs: crate::util::num_cpus().get(),
            strict_atoms: true,
            auto_yes: false,
            audit_log_path: None,
            build_command: "kiln-builder build {name} {version} {root}".to_string(),
            install_command: "kiln-builder install {name} {version} {root}".to_string(),
        }
    }
}

impl config::Config for Settings {
    fn domain() -> String {
        "kiln".into()
    }
}

impl Settings {
    /// Loads and merges every `kiln.yaml` visible from `installation`'s
    /// root, falling back to [`Settings::default`] if none are found.
    pub fn load(installation: &Installation) -> Self {
        let manager = config::Manager::system(&installation.root, "kiln");
        manager.load::<Settings>().into_iter().next().unwrap_or_default()
    }

    pub fn audit_log_path(&self, installation: &Installation) -> std::path::PathBuf {
        match &self.audit_log_path {
            Some(custom) => std::path::PathBuf::from(custom),
            None => installation.assets_path("audit.jsonl"),
        }
    }
}
