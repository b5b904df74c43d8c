// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::fmt;

use astr::AStr;
use serde::{Deserialize, Serialize};

/// Dot-separated version string, ordered component-wise with a
/// lexicographic fallback so equal orderings imply equal strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version(AStr);

impl Version {
    pub fn new(raw: impl Into<AStr>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    fn components(&self) -> Vec<Result<u64, &str>> {
        self.0
            .split('.')
            .map(|part| part.parse::<u64>().map_err(|_| part))
            .collect()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.components()
            .cmp(&other.components())
            .then_with(|| self.0.as_str().cmp(other.0.as_str()))
    }
}

/// `(name, version)` identity of an installable package.
///
/// Names are stored in their canonical capitalisation; comparisons for
/// lookup purposes are done case-insensitively by callers (see
/// [`crate::atoms`]), not by `Eq`/`Ord` here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Package {
    pub name: AStr,
    pub version: Version,
}

impl Package {
    pub fn new(name: impl Into<AStr>, version: impl Into<AStr>) -> Self {
        Self {
            name: name.into(),
            version: Version::new(version),
        }
    }

    /// `name-version`, used as the audit log's package identifier.
    pub fn name_version(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl RelOp {
    pub fn matches(self, lhs: &Version, rhs: &Version) -> bool {
        match self {
            RelOp::Eq => lhs == rhs,
            RelOp::Ne => lhs != rhs,
            RelOp::Lt => lhs < rhs,
            RelOp::Le => lhs <= rhs,
            RelOp::Gt => lhs > rhs,
            RelOp::Ge => lhs >= rhs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constraint {
    pub op: RelOp,
    pub version: Version,
}

/// A solver input: a package name with an optional version constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Atom {
    pub name: AStr,
    pub constraint: Option<Constraint>,
}

impl Atom {
    pub fn new(name: impl Into<AStr>) -> Self {
        Self {
            name: name.into(),
            constraint: None,
        }
    }

    pub fn matches(&self, package: &Package) -> bool {
        if self.name.to_lowercase() != package.name.to_lowercase() {
            return false;
        }
        match &self.constraint {
            Some(c) => c.op.matches(&package.version, &c.version),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_numeric_ordering() {
        assert!(Version::new("1.2") < Version::new("1.10"));
        assert!(Version::new("1.2.0") > Version::new("1.2"));
    }

    #[test]
    fn version_ord_consistent_with_eq() {
        let a = Version::new("2.0");
        let b = Version::new("2.0");
        assert_eq!(a.cmp(&b), std::cmp::Ordering::Equal);
        assert_eq!(a, b);
    }

    #[test]
    fn atom_case_insensitive_match() {
        let atom = Atom::new("Foo");
        let package = Package::new("foo", "1.0");
        assert!(atom.matches(&package));
    }
}
