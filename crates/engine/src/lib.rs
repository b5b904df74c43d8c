// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The solution application engine: schedules a solver-produced action
//! graph against the local installation, propagating cancellation on
//! failure and keeping the persisted package database consistent across
//! interruptions.

pub mod applier;
pub mod atoms;
pub mod audit;
pub mod classify;
pub mod downloader;
pub mod env_warnings;
pub mod error;
pub mod executor;
pub mod finalizer;
pub mod graph;
pub mod messaging;
pub mod package;
pub mod persist;
pub mod remover;
pub mod scheduler;
pub mod state;

pub use applier::{Applier, ApplyOptions, Solver, Ui};
pub use atoms::PackageUniverse;
pub use audit::{AuditSink, NullAuditSink};
pub use classify::FinalResult;
pub use env_warnings::EnvWarningSource;
pub use error::Error;
pub use executor::{Artifact, ExecError, PackageExecutor, RemovalOutcome};
pub use graph::{Action, ActionGraph, Solution};
pub use messaging::{FilterEvaluator, ManifestAccessor, PostMessage, RenderedMessage, TagGroup, select_external_tags};
pub use package::{Atom, Constraint, Package, RelOp, Version};
pub use persist::{NullPersister, PersistError, StatePersister};
pub use state::{RequestKind, TransientState};
