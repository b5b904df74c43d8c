// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::trace;
use nix::unistd::{access, AccessFlags, Uid};
use thiserror::Error;

pub mod lockfile;

/// System mutability - do we have readwrite?
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Mutability {
    /// We only have readonly access
    ReadOnly,
    /// We have read-write access
    ReadWrite,
}

/// An Installation is a general encapsulation pattern for a root filesystem
/// as seen from kiln. We're largely active in the mutability and path builders
/// used by the executor, store, and audit sink.
#[derive(Debug, Clone)]
pub struct Installation {
    /// Fully qualified rootfs path
    pub root: PathBuf,

    /// Do we have R/W access?
    pub mutability: Mutability,

    /// Custom cache directory location,
    /// otherwise derived from root
    pub cache_dir: Option<PathBuf>,
}

impl Installation {
    /// Open a system root as an Installation type.
    /// This determines the mutability per the current user identity
    /// and ACL permissions.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root: PathBuf = root.into();

        if !root.exists() || !root.is_dir() {
            return Err(Error::RootInvalid);
        }

        // Make sure directories exist (silently fail if read-only)
        //
        // It's important we try this first in-case `root` needs to be created
        // as well, otherwise mutability will always be read-only
        ensure_dirs_exist(&root);

        // Root? Always RW. Otherwise, check access for W
        let mutability = if Uid::effective().is_root() || access(&root, AccessFlags::W_OK).is_ok() {
            Mutability::ReadWrite
        } else {
            Mutability::ReadOnly
        };

        trace!("Mutability: {mutability}");
        trace!("Root dir: {root:?}");

        Ok(Self {
            root,
            mutability,
            cache_dir: None,
        })
    }

    pub fn with_cache_dir(self, dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let dir = dir.into();

        if !dir.exists() || !dir.is_dir() {
            return Err(Error::CacheInvalid);
        }

        Ok(Self {
            cache_dir: Some(dir),
            ..self
        })
    }

    /// Return true if we lack write access
    pub fn read_only(&self) -> bool {
        matches!(self.mutability, Mutability::ReadOnly)
    }

    // Helper to form paths
    fn kiln_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(".kiln").join(path)
    }

    /// Build a database path relative to the kiln root
    pub fn db_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.kiln_path("db").join(path)
    }

    /// Build a cache path relative to the kiln root, or
    /// from the custom cache dir, if provided
    pub fn cache_path(&self, path: impl AsRef<Path>) -> PathBuf {
        if let Some(dir) = self.cache_dir.as_ref() {
            dir.join(path)
        } else {
            self.kiln_path("cache").join(path)
        }
    }

    /// Build an asset path relative to the kiln root
    pub fn assets_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.kiln_path("assets").join(path)
    }

    /// Build a repo path relative to the root
    pub fn repo_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.kiln_path("repo").join(path)
    }

    /// Acquire exclusive access to this installation, blocking (with a
    /// message to the user) if another `kiln` process already holds it.
    pub fn lock(&self) -> Result<lockfile::Lock, lockfile::Error> {
        lockfile::acquire(self.db_path("lock"), "Waiting for another kiln process to finish...")
    }
}

/// Ensures the `.kiln` directory tree is created
fn ensure_dirs_exist(root: &Path) {
    let kiln = root.join(".kiln");

    for path in [kiln.join("db"), kiln.join("cache"), kiln.join("assets"), kiln.join("repo")] {
        let _ = fs::create_dir_all(path);
    }
    ensure_cachedir_tag(&kiln.join("cache"));
}

/// Ensure we install a cachedir tag to prevent backup tools
/// from archiving the contents of this tree.
fn ensure_cachedir_tag(path: &Path) {
    let cachedir_tag = path.join("CACHEDIR.TAG");
    if !cachedir_tag.exists() {
        let _ = fs::write(
            cachedir_tag,
            br#"Signature: 8a477f597d28d172789f06886806bc55
# This file is a cache directory tag created by kiln.
# For information about cache directory tags see https://bford.info/cachedir/"#,
        );
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("root is invalid")]
    RootInvalid,
    #[error("cache directory is invalid")]
    CacheInvalid,
}
