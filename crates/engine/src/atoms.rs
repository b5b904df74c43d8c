// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Atom sanitisation and availability checking (§4.7), run before any
//! solver call.

use std::collections::HashSet;

use astr::AStr;

use crate::{
    error::Error,
    package::{Atom, Package},
    state::TransientState,
};

/// The package universe the solver would consult; out of scope beyond
/// this read-only accessor contract (§6).
pub trait PackageUniverse {
    /// All packages a repository currently offers for install.
    fn available_packages(&self) -> &HashSet<Package>;

    /// Every package ever known to the universe, including unavailable
    /// ones kept for permissive-mode lookups.
    fn all_packages(&self) -> &HashSet<Package>;
}

/// Rewrites each atom's name to its canonical capitalisation by
/// case-insensitive lookup; on ambiguity (more than one distinct
/// capitalisation matches) the user-supplied form is kept unchanged.
pub fn sanitize_atoms(atoms: Vec<Atom>, universe: &dyn PackageUniverse) -> Vec<Atom> {
    atoms
        .into_iter()
        .map(|atom| {
            let lower = atom.name.to_lowercase();
            let mut matches: Vec<&AStr> = universe
                .all_packages()
                .iter()
                .map(|p| &p.name)
                .filter(|name| name.to_lowercase() == lower)
                .collect();
            matches.dedup_by(|a, b| a.as_str() == b.as_str());

            match matches.as_slice() {
                [single] => Atom {
                    name: (*single).clone(),
                    constraint: atom.constraint,
                },
                _ => atom,
            }
        })
        .collect()
}

enum Diagnostic {
    UnknownPackage(String),
    UnavailableReason(String),
}

impl Diagnostic {
    fn render(&self) -> String {
        match self {
            Diagnostic::UnknownPackage(name) => format!("unknown package: {name}"),
            Diagnostic::UnavailableReason(name) => format!("no available version satisfies: {name}"),
        }
    }
}

/// Checks every atom against the availability set appropriate to `strict`
/// (§4.7). Returns [`Error::UnsatisfiableAtoms`] listing every atom that
/// failed, or `Ok(())` if all atoms resolved.
pub fn check_availability(
    atoms: &[Atom],
    state: &TransientState,
    universe: &dyn PackageUniverse,
    strict: bool,
) -> Result<(), Error> {
    let mut diagnostics = Vec::new();

    for atom in atoms {
        let name_known = universe.all_packages().iter().any(|p| p.name.to_lowercase() == atom.name.to_lowercase());

        if !name_known {
            diagnostics.push(Diagnostic::UnknownPackage(atom.name.to_string()));
            continue;
        }

        let base_set = if strict { universe.available_packages() } else { universe.all_packages() };

        let satisfied = base_set.iter().chain(state.installed.iter()).any(|p| atom.matches(p));

        if !satisfied {
            diagnostics.push(Diagnostic::UnavailableReason(atom.name.to_string()));
        }
    }

    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(Error::UnsatisfiableAtoms(diagnostics.iter().map(Diagnostic::render).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedUniverse {
        available: HashSet<Package>,
        all: HashSet<Package>,
    }

    impl PackageUniverse for FixedUniverse {
        fn available_packages(&self) -> &HashSet<Package> {
            &self.available
        }
        fn all_packages(&self) -> &HashSet<Package> {
            &self.all
        }
    }

    fn universe_with(names: &[&str]) -> FixedUniverse {
        let packages: HashSet<Package> = names.iter().map(|n| Package::new(*n, "1.0")).collect();
        FixedUniverse {
            available: packages.clone(),
            all: packages,
        }
    }

    #[test]
    fn canonicalises_unambiguous_case_insensitive_match() {
        let universe = universe_with(&["Foo"]);
        let atoms = vec![Atom::new("FOO")];
        let sanitized = sanitize_atoms(atoms, &universe);
        assert_eq!(sanitized[0].name.as_str(), "Foo");
    }

    #[test]
    fn leaves_ambiguous_name_unchanged() {
        let packages: HashSet<Package> = [Package::new("Foo", "1.0"), Package::new("foo", "2.0")].into_iter().collect();
        let universe = FixedUniverse {
            available: packages.clone(),
            all: packages,
        };
        let atoms = vec![Atom::new("FOO")];
        let sanitized = sanitize_atoms(atoms, &universe);
        assert_eq!(sanitized[0].name.as_str(), "FOO");
    }

    #[test]
    fn unknown_package_is_reported() {
        let universe = universe_with(&["Foo"]);
        let state = TransientState::new();
        let result = check_availability(&[Atom::new("Bar")], &state, &universe, true);
        assert!(result.is_err());
    }

    #[test]
    fn known_package_satisfies() {
        let universe = universe_with(&["Foo"]);
        let state = TransientState::new();
        let result = check_availability(&[Atom::new("Foo")], &state, &universe, true);
        assert!(result.is_ok());
    }
}
