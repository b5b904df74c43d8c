// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Topological, bounded-parallelism execution of the action graph (§4.4).

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};

use astr::AStr;
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::{
    error::Error,
    executor::{ExecError, PackageExecutor},
    graph::{Action, ActionGraph, predecessors},
    package::Package,
    persist::StatePersister,
    state::TransientState,
};

/// Per-node result (§3, §9 "Cancellation as data"). Cancellation is a
/// value, never an exception, so it cannot be conflated with a thrown error.
#[derive(Debug)]
pub enum Outcome {
    Success,
    Failed(ExecError),
    Cancelled,
}

pub struct ScheduleReport {
    pub state: TransientState,
    pub outcomes: HashMap<Action, Outcome>,
    /// Set when a user-initiated interrupt (§5) stopped batch dispatch
    /// before the whole graph ran; undispatched nodes have no entry in
    /// `outcomes` at all.
    pub interrupted: bool,
}

/// Walks `graph` batch by batch (§4.4), dispatching each batch's nodes
/// under a `jobs`-bounded worker pool. A node is dispatched only once
/// every graph predecessor has an outcome recorded, which `batched_topo`
/// guarantees by construction (a node's batch index is always greater
/// than every predecessor's).
///
/// `interrupted` is checked between batches (§5): once set, no further
/// batches are dispatched and the report comes back with `interrupted: true`
/// so the caller can abort, run finalizers, and re-raise instead of
/// classifying a partial result as an ordinary failure.
#[instrument(skip_all, fields(jobs))]
pub fn schedule(
    executor: Arc<dyn PackageExecutor>,
    persister: Arc<dyn StatePersister>,
    graph: &ActionGraph,
    initial_state: TransientState,
    root_names: &HashSet<AStr>,
    jobs: usize,
    dry_run: bool,
    interrupted: &AtomicBool,
) -> Result<ScheduleReport, Error> {
    let batches = graph.batched_topo();
    let total: usize = batches.iter().map(Vec::len).sum();
    let state = Mutex::new(initial_state);
    let outcomes: Mutex<HashMap<Action, Outcome>> = Mutex::new(HashMap::new());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .map_err(|e| Error::Internal(e.to_string()))?;

    tracing_common::progress_start("schedule", total);
    let started = Instant::now();
    let mut dispatched = 0;
    let mut was_interrupted = false;

    for (index, batch) in batches.iter().enumerate() {
        if interrupted.load(Ordering::Relaxed) {
            info!(batch = index, "interrupted, aborting schedule");
            was_interrupted = true;
            break;
        }

        debug!(batch = index, size = batch.len(), "dispatching batch");

        pool.install(|| {
            let results: Vec<(Action, Outcome)> = batch
                .par_iter()
                .map(|action| {
                    let outcome = run_node(action, graph, &executor, &persister, &state, &outcomes, root_names, dry_run);
                    (action.clone(), outcome)
                })
                .collect();

            let mut guard = outcomes.lock().expect("outcomes mutex poisoned");
            guard.extend(results);
        });

        dispatched += batch.len();
        tracing_common::progress_update(dispatched, total, &format!("batch {index}"));
        info!(batch = index, "batch complete");
    }

    tracing_common::progress_completed("schedule", started.elapsed().as_millis(), total);

    let state = state.into_inner().expect("state mutex poisoned");
    let outcomes = outcomes.into_inner().expect("outcomes mutex poisoned");

    Ok(ScheduleReport {
        state,
        outcomes,
        interrupted: was_interrupted,
    })
}

fn run_node(
    action: &Action,
    graph: &ActionGraph,
    executor: &Arc<dyn PackageExecutor>,
    persister: &Arc<dyn StatePersister>,
    state: &Mutex<TransientState>,
    outcomes: &Mutex<HashMap<Action, Outcome>>,
    root_names: &HashSet<AStr>,
    dry_run: bool,
) -> Outcome {
    let preds = predecessors(graph, action);
    let cancelled = {
        let done = outcomes.lock().expect("outcomes mutex poisoned");
        preds.iter().any(|pred| !matches!(done.get(*pred), Some(Outcome::Success)))
    };

    if cancelled {
        debug!(package = %action.package(), "cancelled: predecessor did not succeed");
        return Outcome::Cancelled;
    }

    match action {
        Action::ToDelete(_) => Outcome::Success,
        Action::ToChange { target, .. } => build_and_install(target, executor, persister, state, root_names, dry_run),
        Action::ToRecompile(package) => build_and_install(package, executor, persister, state, root_names, dry_run),
    }
}

#[instrument(skip(executor, persister, state, root_names), fields(package = %package))]
fn build_and_install(
    package: &Package,
    executor: &Arc<dyn PackageExecutor>,
    persister: &Arc<dyn StatePersister>,
    state: &Mutex<TransientState>,
    root_names: &HashSet<AStr>,
    dry_run: bool,
) -> Outcome {
    let snapshot = state.lock().expect("state mutex poisoned").clone();

    match executor.build_and_install(&snapshot, package, false) {
        Ok(()) => match apply_post_install(package, executor, persister, state, root_names, dry_run) {
            Ok(()) => Outcome::Success,
            Err(e) => Outcome::Failed(e),
        },
        Err(e) => Outcome::Failed(e),
    }
}

/// `apply_post_install(p)` (§4.4). The whole sequence — in-memory
/// mutation, state-store flush, and metadata install — is serialised
/// with respect to other post-install updates by holding `state`'s lock
/// for its entire duration (§5), so the persisted store is always a
/// valid prefix of some topological order.
fn apply_post_install(
    package: &Package,
    executor: &Arc<dyn PackageExecutor>,
    persister: &Arc<dyn StatePersister>,
    state: &Mutex<TransientState>,
    root_names: &HashSet<AStr>,
    dry_run: bool,
) -> Result<(), ExecError> {
    let mut guard = state.lock().expect("state mutex poisoned");

    guard.installed.insert(package.clone());
    guard.reinstall.remove(package);
    if root_names.contains(&package.name) {
        guard.installed_roots.insert(package.clone());
    }
    guard.assert_invariants();

    persister.flush(&guard).map_err(|e| ExecError::Internal(e.0))?;

    if !dry_run {
        executor.install_metadata(&guard, package)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::{executor::RemovalOutcome, graph::Solution, persist::NullPersister};

    struct MockExecutor {
        fails: HashSet<String>,
    }

    impl PackageExecutor for MockExecutor {
        fn build_and_install(&self, _state: &TransientState, package: &Package, _metadata: bool) -> Result<(), ExecError> {
            if self.fails.contains(package.name.as_str()) {
                Err(ExecError::Process {
                    code: "2".into(),
                    duration: 0.1,
                    info: Default::default(),
                    stdout: vec![],
                    stderr: vec![],
                })
            } else {
                Ok(())
            }
        }
        fn remove_all_packages(&self, state: &TransientState, _solution: &Solution) -> RemovalOutcome {
            RemovalOutcome::Successful {
                new_state: state.clone(),
                deleted: HashSet::new(),
            }
        }
        fn cleanup_package_artefacts(&self, _state: &TransientState, _package: &Package) {}
        fn install_metadata(&self, _state: &TransientState, _package: &Package) -> Result<(), ExecError> {
            Ok(())
        }
        fn download_package(&self, _state: &TransientState, _package: &Package) -> Option<crate::executor::Artifact> {
            None
        }
        fn sources_needed(&self, _state: &TransientState, _solution: &Solution) -> HashSet<Package> {
            HashSet::new()
        }
    }

    fn install(name: &str) -> Action {
        Action::ToChange {
            previous: None,
            target: Package::new(name, "1.0"),
        }
    }

    #[test]
    fn linear_chain_all_succeed() {
        let mut graph = ActionGraph::new();
        let a = install("a");
        let b = install("b");
        let c = install("c");
        let ia = graph.add_node_or_get_index(&a);
        let ib = graph.add_node_or_get_index(&b);
        let ic = graph.add_node_or_get_index(&c);
        graph.add_edge(ia, ib);
        graph.add_edge(ib, ic);

        let executor = Arc::new(MockExecutor { fails: HashSet::new() });
        let report = schedule(
            executor,
            Arc::new(NullPersister),
            &graph,
            TransientState::new(),
            &HashSet::new(),
            2,
            false,
            &AtomicBool::new(false),
        )
        .unwrap();

        assert!(matches!(report.outcomes.get(&a), Some(Outcome::Success)));
        assert!(matches!(report.outcomes.get(&b), Some(Outcome::Success)));
        assert!(matches!(report.outcomes.get(&c), Some(Outcome::Success)));
        assert_eq!(report.state.installed.len(), 3);
    }

    #[test]
    fn middle_failure_cascades() {
        let mut graph = ActionGraph::new();
        let a = install("a");
        let b = install("b");
        let c = install("c");
        let ia = graph.add_node_or_get_index(&a);
        let ib = graph.add_node_or_get_index(&b);
        let ic = graph.add_node_or_get_index(&c);
        graph.add_edge(ia, ib);
        graph.add_edge(ib, ic);

        let executor = Arc::new(MockExecutor {
            fails: ["b".to_string()].into_iter().collect(),
        });
        let report = schedule(
            executor,
            Arc::new(NullPersister),
            &graph,
            TransientState::new(),
            &HashSet::new(),
            2,
            false,
            &AtomicBool::new(false),
        )
        .unwrap();

        assert!(matches!(report.outcomes.get(&a), Some(Outcome::Success)));
        assert!(matches!(report.outcomes.get(&b), Some(Outcome::Failed(_))));
        assert!(matches!(report.outcomes.get(&c), Some(Outcome::Cancelled)));
    }

    #[test]
    fn parallel_siblings_isolate_failure() {
        let mut graph = ActionGraph::new();
        let a = install("a");
        let b = install("b");
        let c = install("c");
        let ia = graph.add_node_or_get_index(&a);
        let ib = graph.add_node_or_get_index(&b);
        let ic = graph.add_node_or_get_index(&c);
        graph.add_edge(ia, ib);
        graph.add_edge(ia, ic);

        let executor = Arc::new(MockExecutor {
            fails: ["b".to_string()].into_iter().collect(),
        });
        let report = schedule(
            executor,
            Arc::new(NullPersister),
            &graph,
            TransientState::new(),
            &HashSet::new(),
            2,
            false,
            &AtomicBool::new(false),
        )
        .unwrap();

        assert!(matches!(report.outcomes.get(&a), Some(Outcome::Success)));
        assert!(matches!(report.outcomes.get(&b), Some(Outcome::Failed(_))));
        assert!(matches!(report.outcomes.get(&c), Some(Outcome::Success)));
    }

    #[test]
    fn pre_set_interrupt_flag_stops_before_first_batch() {
        let mut graph = ActionGraph::new();
        let a = install("a");
        graph.add_node_or_get_index(&a);

        let executor = Arc::new(MockExecutor { fails: HashSet::new() });
        let report = schedule(
            executor,
            Arc::new(NullPersister),
            &graph,
            TransientState::new(),
            &HashSet::new(),
            2,
            false,
            &AtomicBool::new(true),
        )
        .unwrap();

        assert!(report.interrupted);
        assert!(report.outcomes.is_empty());
    }
}
