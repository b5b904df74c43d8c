// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Bulk removal stage, run before any install (§4.3).

use std::sync::Arc;

use tracing::{info, instrument};

use crate::{
    executor::{ExecError, PackageExecutor, RemovalOutcome},
    finalizer::Finalizers,
    graph::{Action, Solution},
    state::TransientState,
};

/// What the Scheduler should do after removal.
pub enum RemoveResult {
    /// Removal succeeded; `state` is the updated state to schedule installs against.
    Proceed(TransientState),
    /// Removal failed; these three sets are the final classification and
    /// the Scheduler must not run at all (§4.3).
    Classified {
        successful: Vec<Action>,
        failed: Vec<(Action, ExecError)>,
        remaining: Vec<Action>,
    },
}

#[instrument(skip(executor, state, solution, finalizers))]
pub fn remove(
    executor: Arc<dyn PackageExecutor>,
    state: &TransientState,
    solution: &Solution,
    finalizers: &mut Finalizers,
) -> RemoveResult {
    match executor.remove_all_packages(state, solution) {
        RemovalOutcome::Successful { mut new_state, deleted } => {
            info!(count = deleted.len(), "removed packages");

            new_state.installed.retain(|p| !deleted.contains(p));
            new_state.installed_roots.retain(|p| !deleted.contains(p));
            new_state.reinstall.retain(|p| !deleted.contains(p));

            for package in deleted {
                if executor.is_pinned(&package) {
                    continue;
                }
                // The finalizer runs after classification (§4.3).
                let executor = executor.clone();
                let snapshot = new_state.clone();
                finalizers.push(move || executor.cleanup_package_artefacts(&snapshot, &package));
            }

            RemoveResult::Proceed(new_state)
        }
        RemovalOutcome::Exception(err) => classify_removal_failure(solution, state, &err),
    }
}

/// On removal failure, classify without running the Scheduler (§4.3):
/// - `successful` = `ToDelete(p)` no longer installed;
/// - `failed` = `ToChange(Some previous, _)`/`ToRecompile(p)` whose old
///   version is no longer installed (removed but replacement never built);
/// - `remaining` = everything else.
///
/// Resolved open question (§9, §13): a `ToChange`/`ToRecompile` whose
/// removal step was a no-op (old version was already absent, so it is
/// vacuously "no longer installed" without any removal actually having
/// happened) is classified conservatively as `remaining`, not `failed` —
/// the literal source conflates these two cases; we distinguish them by
/// checking the *pre-removal* state snapshot.
fn classify_removal_failure(solution: &Solution, pre_removal_state: &TransientState, cause: &ExecError) -> RemoveResult {
    let mut successful = Vec::new();
    let mut failed = Vec::new();
    let mut remaining = Vec::new();

    let wrap = |action: &Action| (action.clone(), ExecError::Internal(format!("removal failed: {cause}")));

    for action in solution.to_process.iter_nodes() {
        match action {
            Action::ToDelete(p) => {
                if !pre_removal_state.installed.contains(p) {
                    successful.push(action.clone());
                } else {
                    remaining.push(action.clone());
                }
            }
            Action::ToChange { previous: Some(prev), .. } => {
                if pre_removal_state.installed.contains(prev) {
                    remaining.push(action.clone());
                } else {
                    failed.push(wrap(action));
                }
            }
            Action::ToRecompile(p) => {
                if pre_removal_state.installed.contains(p) {
                    remaining.push(action.clone());
                } else {
                    failed.push(wrap(action));
                }
            }
            Action::ToChange { previous: None, .. } => remaining.push(action.clone()),
        }
    }

    RemoveResult::Classified { successful, failed, remaining }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::package::Package;

    #[test]
    fn classifies_delete_as_successful_when_absent() {
        let mut solution = Solution::default();
        let p = Package::new("a", "1.0");
        solution.to_process.add_node_or_get_index(&Action::ToDelete(p.clone()));

        let state = TransientState {
            installed: HashSet::new(),
            ..TransientState::new()
        };

        let cause = ExecError::Internal("boom".into());
        match classify_removal_failure(&solution, &state, &cause) {
            RemoveResult::Classified { successful, failed, remaining } => {
                assert_eq!(successful.len(), 1);
                assert!(failed.is_empty());
                assert!(remaining.is_empty());
            }
            RemoveResult::Proceed(_) => panic!("expected classification"),
        }
    }

    #[test]
    fn classifies_change_as_failed_when_previous_removed() {
        let mut solution = Solution::default();
        let prev = Package::new("a", "1.0");
        let target = Package::new("a", "2.0");
        solution.to_process.add_node_or_get_index(&Action::ToChange {
            previous: Some(prev.clone()),
            target,
        });

        let state = TransientState::new();

        let cause = ExecError::Internal("boom".into());
        match classify_removal_failure(&solution, &state, &cause) {
            RemoveResult::Classified { failed, .. } => assert_eq!(failed.len(), 1),
            RemoveResult::Proceed(_) => panic!("expected classification"),
        }
    }
}
