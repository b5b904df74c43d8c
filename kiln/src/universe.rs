// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The local repository index: a single `repo.yaml` describing every
//! package kiln knows how to fetch and build, plus the manifest data
//! (dependencies, post-install messages, compiler environment variables)
//! the engine's external collaborator traits need.
//!
//! There is no real dependency solver here (out of scope, §6): requests
//! are turned directly into `ToChange`/`ToDelete` actions, ordered by the
//! manifest's own `depends` edges.

use std::collections::{BTreeMap, HashMap, HashSet};

use astr::AStr;
use kiln_engine::{
    Action, ActionGraph, EnvWarningSource, ManifestAccessor, Package, PackageUniverse, PostMessage, RequestKind, Solution,
    Solver, TagGroup, TransientState,
};
use serde::{Deserialize, Serialize};

/// One repository entry: everything kiln knows about a buildable package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub depends: Vec<String>,
    #[serde(default)]
    pub post_messages: Vec<Message>,
    /// Coarse OS-level dependency tag groups (§4.1 step 3, §9 "External
    /// tags"), e.g. distro-specific build-dep hints.
    #[serde(default)]
    pub external_tags: Vec<ManifestTagGroup>,
    /// Non-empty only for toolchain compiler packages; the environment
    /// variables this compiler's manifest defines via `=` (§4.9).
    #[serde(default)]
    pub compiler_vars: BTreeMap<String, String>,
    /// Whether this is *the* toolchain meta-package whose presence gates
    /// the fixed toolchain variable warning (§4.9).
    #[serde(default)]
    pub is_toolchain: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub template: String,
    pub filter: String,
}

/// On-disk shape of a [`TagGroup`]; kept separate so `repo.yaml` doesn't
/// depend on the engine crate's (de)serialisation choices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestTagGroup {
    pub tags: Vec<String>,
}

/// Variable names a compiler toolchain's presence makes relevant,
/// regardless of which specific compiler is installed.
const TOOLCHAIN_VARS: &[&str] = &["CC", "CXX", "CFLAGS", "CXXFLAGS", "LDFLAGS"];

/// The on-disk repository index (`repo.yaml`, loaded wholesale at startup).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryIndex {
    pub packages: Vec<PackageManifest>,
}

/// In-memory view over a loaded [`RepositoryIndex`], implementing the
/// engine's read-only external collaborator traits.
pub struct Repository {
    manifests: HashMap<String, PackageManifest>,
    available: HashSet<Package>,
    all: HashSet<Package>,
}

impl Repository {
    pub fn new(index: RepositoryIndex) -> Self {
        let available: HashSet<Package> = index.packages.iter().map(|m| Package::new(m.name.clone(), m.version.clone())).collect();

        let manifests = index.packages.into_iter().map(|m| (m.name.clone(), m)).collect();

        Self {
            all: available.clone(),
            available,
            manifests,
        }
    }

    fn manifest_for(&self, package: &Package) -> Option<&PackageManifest> {
        self.manifests.get(package.name.as_str())
    }
}

impl PackageUniverse for Repository {
    fn available_packages(&self) -> &HashSet<Package> {
        &self.available
    }

    fn all_packages(&self) -> &HashSet<Package> {
        &self.all
    }
}

impl ManifestAccessor for Repository {
    fn post_messages(&self, package: &Package) -> Vec<PostMessage> {
        self.manifest_for(package)
            .map(|m| {
                m.post_messages
                    .iter()
                    .map(|msg| PostMessage {
                        template: msg.template.clone(),
                        filter: msg.filter.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn external_dependency_tags(&self, package: &Package) -> Vec<TagGroup> {
        self.manifest_for(package)
            .map(|m| m.external_tags.iter().map(|g| TagGroup { tags: g.tags.clone() }).collect())
            .unwrap_or_default()
    }
}

impl EnvWarningSource for Repository {
    fn toolchain_variables(&self, state: &TransientState) -> Vec<String> {
        let toolchain_installed = state
            .installed
            .iter()
            .any(|p| self.manifest_for(p).is_some_and(|m| m.is_toolchain));

        if toolchain_installed {
            TOOLCHAIN_VARS.iter().map(|s| s.to_string()).collect()
        } else {
            Vec::new()
        }
    }

    fn compiler_variable_diff(&self, state: &TransientState) -> Vec<String> {
        let installed_names: HashSet<&str> = state.installed.iter().map(|p| p.name.as_str()).collect();

        let current_vars: HashSet<&str> = self
            .manifests
            .values()
            .filter(|m| !m.compiler_vars.is_empty() && installed_names.contains(m.name.as_str()))
            .flat_map(|m| m.compiler_vars.keys().map(String::as_str))
            .collect();

        self.manifests
            .values()
            .filter(|m| !m.compiler_vars.is_empty() && !installed_names.contains(m.name.as_str()))
            .flat_map(|m| m.compiler_vars.keys())
            .filter(|var| !current_vars.contains(var.as_str()))
            .cloned()
            .collect()
    }
}

/// A stand-in for the real dependency solver (§6, out of scope): turns a
/// request directly into `ToChange`/`ToDelete` actions ordered by the
/// manifest's `depends` edges, with no version arbitration.
pub struct TrivialSolver<'a> {
    pub repository: &'a Repository,
}

impl Solver for TrivialSolver<'_> {
    fn solve(
        &self,
        state: &TransientState,
        kind: &RequestKind,
        requested_names: &HashSet<AStr>,
        _orphans: &HashSet<AStr>,
    ) -> Result<Solution, String> {
        let mut graph = ActionGraph::new();

        if matches!(kind, RequestKind::Remove) {
            for name in requested_names {
                if let Some(package) = state.installed.iter().find(|p| &p.name == name) {
                    graph.add_node_or_get_index(&Action::ToDelete(package.clone()));
                }
            }
            return Ok(Solution { to_process: graph });
        }

        let mut queue: Vec<AStr> = requested_names.iter().cloned().collect();
        let mut seen = HashSet::new();

        while let Some(name) = queue.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }

            let Some(manifest) = self.repository.manifests.get(name.as_str()) else {
                return Err(format!("unknown package: {name}"));
            };

            let target = Package::new(manifest.name.clone(), manifest.version.clone());
            let previous = state.installed.iter().find(|p| p.name == target.name).cloned();

            if previous.as_ref() == Some(&target) {
                continue;
            }

            graph.add_node_or_get_index(&Action::ToChange {
                previous,
                target: target.clone(),
            });

            for dep in &manifest.depends {
                queue.push(AStr::from(dep.as_str()));
            }
        }

        // Link depends edges so a dependency's action batches before its dependents.
        let actions: Vec<Action> = graph.iter_nodes().cloned().collect();
        for action in &actions {
            let Action::ToChange { target, .. } = action else { continue };
            let Some(manifest) = self.repository.manifests.get(target.name.as_str()) else {
                continue;
            };
            for dep in &manifest.depends {
                if let Some(dep_action) = actions.iter().find(|a| a.package().name.as_str() == dep) {
                    let from = graph.add_node_or_get_index(dep_action);
                    let to = graph.add_node_or_get_index(action);
                    graph.add_edge(from, to);
                }
            }
        }

        Ok(Solution { to_process: graph })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo_with(packages: Vec<(&str, &str, Vec<&str>)>) -> Repository {
        Repository::new(RepositoryIndex {
            packages: packages
                .into_iter()
                .map(|(name, version, depends)| PackageManifest {
                    name: name.into(),
                    version: version.into(),
                    depends: depends.into_iter().map(String::from).collect(),
                    post_messages: vec![],
                    external_tags: vec![],
                    compiler_vars: BTreeMap::new(),
                    is_toolchain: false,
                })
                .collect(),
        })
    }

    #[test]
    fn solver_orders_dependency_before_dependent() {
        let repo = repo_with(vec![("bar", "1.0", vec![]), ("foo", "1.0", vec!["bar"])]);
        let solver = TrivialSolver { repository: &repo };
        let state = TransientState::new();
        let requested: HashSet<AStr> = [AStr::from("foo")].into_iter().collect();

        let solution = solver
            .solve(&state, &RequestKind::Install(vec![AStr::from("foo")]), &requested, &HashSet::new())
            .unwrap();

        assert_eq!(solution.to_process.iter_nodes().count(), 2);
        let bar_action = solution
            .to_process
            .iter_nodes()
            .find(|a| a.package().name.as_str() == "bar")
            .unwrap();
        let foo_action = solution
            .to_process
            .iter_nodes()
            .find(|a| a.package().name.as_str() == "foo")
            .unwrap();
        assert!(kiln_engine::graph::predecessors(&solution.to_process, foo_action).contains(&bar_action));
    }

    #[test]
    fn remove_targets_installed_package() {
        let repo = repo_with(vec![("foo", "1.0", vec![])]);
        let solver = TrivialSolver { repository: &repo };
        let mut state = TransientState::new();
        state.installed.insert(Package::new("foo", "1.0"));

        let requested: HashSet<AStr> = [AStr::from("foo")].into_iter().collect();
        let solution = solver.solve(&state, &RequestKind::Remove, &requested, &HashSet::new()).unwrap();

        assert_eq!(solution.to_process.iter_nodes().count(), 1);
        assert!(solution.to_process.iter_nodes().next().unwrap().is_delete());
    }

    #[test]
    fn unknown_package_is_a_conflict() {
        let repo = repo_with(vec![]);
        let solver = TrivialSolver { repository: &repo };
        let state = TransientState::new();
        let requested: HashSet<AStr> = [AStr::from("missing")].into_iter().collect();

        let result = solver.solve(&state, &RequestKind::Install(vec![AStr::from("missing")]), &requested, &HashSet::new());
        assert!(result.is_err());
    }
}
