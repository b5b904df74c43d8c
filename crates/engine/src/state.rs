// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::collections::HashSet;

use astr::AStr;
use serde::{Deserialize, Serialize};

use crate::package::Package;

/// In-memory snapshot of the three package sets the engine reasons about.
///
/// Invariants (§3): `installed_roots ⊆ installed`; a package is
/// `installed` iff it has been flushed to the state store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransientState {
    pub installed: HashSet<Package>,
    pub installed_roots: HashSet<Package>,
    pub reinstall: HashSet<Package>,
}

impl TransientState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.installed.iter().any(|p| p.name.as_str() == name)
    }

    pub fn assert_invariants(&self) {
        debug_assert!(
            self.installed_roots.is_subset(&self.installed),
            "installed_roots must be a subset of installed"
        );
    }
}

/// The kind of user request that produced a [`crate::graph::Solution`];
/// determines which names seed [`root_install_names`] (§4.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    Init(Vec<AStr>),
    Install(Vec<AStr>),
    Import(Vec<AStr>),
    Switch(Vec<AStr>),
    Upgrade,
    Reinstall,
    Depends,
    Remove,
}

/// Derives the set of package names that should be added to
/// `installed_roots` on successful install during this apply (§4.8).
pub fn root_install_names(state: &TransientState, kind: &RequestKind) -> HashSet<AStr> {
    let current_roots = || state.installed_roots.iter().map(|p| p.name.clone()).collect::<HashSet<_>>();

    match kind {
        RequestKind::Init(r) | RequestKind::Install(r) | RequestKind::Import(r) | RequestKind::Switch(r) => {
            let mut names = current_roots();
            names.extend(r.iter().cloned());
            names
        }
        RequestKind::Upgrade | RequestKind::Reinstall => current_roots(),
        RequestKind::Depends | RequestKind::Remove => HashSet::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depends_and_remove_start_empty() {
        let mut state = TransientState::new();
        state.installed_roots.insert(Package::new("a", "1.0"));
        state.installed.insert(Package::new("a", "1.0"));

        assert!(root_install_names(&state, &RequestKind::Depends).is_empty());
        assert!(root_install_names(&state, &RequestKind::Remove).is_empty());
    }

    #[test]
    fn install_adds_requested_names_to_current_roots() {
        let mut state = TransientState::new();
        state.installed_roots.insert(Package::new("a", "1.0"));
        state.installed.insert(Package::new("a", "1.0"));

        let names = root_install_names(&state, &RequestKind::Install(vec![AStr::from("b")]));
        assert!(names.contains(&AStr::from("a")));
        assert!(names.contains(&AStr::from("b")));
    }
}
