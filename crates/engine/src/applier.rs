// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The entry point that orchestrates preview, confirmation, and
//! invocation of download → remove → schedule → classify (§4.1, §6).

use std::{
    collections::HashSet,
    sync::{Arc, atomic::AtomicBool},
};

use astr::AStr;
use tracing::{info, instrument};

use crate::{
    audit::{self, AuditSink},
    classify::{self, FinalResult},
    downloader::{self, DownloadOutcome},
    env_warnings::{EnvWarningGuard, EnvWarningSource},
    error::Error,
    executor::PackageExecutor,
    finalizer::Finalizers,
    graph::{Action, Solution},
    messaging::{self, FilterEvaluator, ManifestAccessor, RenderedMessage, select_external_tags},
    persist::StatePersister,
    remover::{self, RemoveResult},
    scheduler,
    state::{RequestKind, TransientState, root_install_names},
};

/// Per-call knobs that are ambient configuration, not solver/executor
/// concerns (§12).
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    pub download_jobs: usize,
    pub build_jobs: usize,
    pub auto_yes: bool,
    pub show_only: bool,
    pub external_tags: Option<Vec<String>>,
    pub dry_run: bool,
}

/// Confirmation and env-warning prompts are UI concerns (§1 out of
/// scope); the caller supplies callbacks so the engine stays
/// terminal-agnostic.
pub trait Ui {
    fn render_preview(&self, solution: &Solution);
    fn confirm(&self, prompt: &str) -> bool;
    fn report(&self, text: &str);

    /// A post-install message rendered for one package (§4.6). Default
    /// no-op so `Ui` implementors that don't care about manifests (tests,
    /// mocks) need not handle it.
    fn post_install_message(&self, _rendered: &RenderedMessage) {}
}

pub struct Applier {
    pub executor: Arc<dyn PackageExecutor>,
    pub persister: Arc<dyn StatePersister>,
    pub audit_sink: Arc<dyn AuditSink>,
    pub manifests: Arc<dyn ManifestAccessor>,
    pub filter: Arc<dyn FilterEvaluator>,
    pub env_warnings: EnvWarningGuard,
}

impl Applier {
    pub fn new(
        executor: Arc<dyn PackageExecutor>,
        persister: Arc<dyn StatePersister>,
        audit_sink: Arc<dyn AuditSink>,
        manifests: Arc<dyn ManifestAccessor>,
        filter: Arc<dyn FilterEvaluator>,
    ) -> Self {
        Self {
            executor,
            persister,
            audit_sink,
            manifests,
            filter,
            env_warnings: EnvWarningGuard::new(),
        }
    }

    /// `apply(state, action_kind, requested_names, solution) → FinalResult` (§4.1).
    #[instrument(skip_all)]
    pub fn apply(
        &self,
        state: TransientState,
        kind: &RequestKind,
        requested_names: &HashSet<AStr>,
        solution: &Solution,
        ui: &dyn Ui,
        env_source: &dyn EnvWarningSource,
        env: &std::collections::HashMap<String, String>,
        options: &ApplyOptions,
        interrupted: &AtomicBool,
    ) -> Result<FinalResult, Error> {
        if solution.is_empty() {
            return Ok(FinalResult::NothingToDo);
        }

        if let Some(configured) = &options.external_tags {
            self.emit_external_tags(solution, configured, ui);
            return Ok(FinalResult::Aborted);
        }

        ui.render_preview(solution);

        let exact_match = solution.package_names() == *requested_names;
        if !options.auto_yes && !exact_match && !ui.confirm("Continue?") {
            return Ok(FinalResult::Aborted);
        }

        if options.show_only {
            return Ok(FinalResult::Aborted);
        }

        self.env_warnings.warn_once(env_source, &state, env, |vars| ui.confirm(&format!("{vars:?} set, continue?")))?;

        self.parallel_apply(state, kind, solution, ui, options, interrupted)
    }

    #[instrument(skip_all)]
    fn parallel_apply(
        &self,
        state: TransientState,
        kind: &RequestKind,
        solution: &Solution,
        ui: &dyn Ui,
        options: &ApplyOptions,
        interrupted: &AtomicBool,
    ) -> Result<FinalResult, Error> {
        let mut finalizers = Finalizers::new();

        let download = downloader::download(self.executor.as_ref(), &state, solution, options.download_jobs, options.dry_run)?;
        if matches!(download, DownloadOutcome::Missing) {
            return Ok(FinalResult::Error {
                successful: vec![],
                failed: vec![],
                remaining: vec![],
            });
        }

        let state_after_remove = match remover::remove(self.executor.clone(), &state, solution, &mut finalizers) {
            RemoveResult::Proceed(new_state) => new_state,
            RemoveResult::Classified { successful, failed, remaining } => {
                finalizers.run();
                audit::record_apply(self.audit_sink.as_ref(), &solution.to_process, &failed);
                return Ok(FinalResult::Error { successful, failed, remaining });
            }
        };

        let root_names = root_install_names(&state_after_remove, kind);

        let report = scheduler::schedule(
            self.executor.clone(),
            self.persister.clone(),
            &solution.to_process,
            state_after_remove,
            &root_names,
            options.build_jobs,
            options.dry_run,
            interrupted,
        )?;

        if report.interrupted {
            ui.report("Aborting");
            finalizers.run();
            return Err(Error::Interrupted);
        }

        let result = classify::classify(report);

        if let FinalResult::Error { failed, .. } = &result {
            audit::record_apply(self.audit_sink.as_ref(), &solution.to_process, failed);
        } else {
            self.audit_sink.append(audit::solution_record(&solution.to_process));
        }

        self.emit_post_install_messages(&result, ui);

        finalizers.run();

        info!("apply complete");
        Ok(result)
    }

    /// Renders and reports every manifest message for actions that ran to
    /// completion, successful or failed; cancelled actions never installed
    /// anything and get none (§4.6).
    fn emit_post_install_messages(&self, result: &FinalResult, ui: &dyn Ui) {
        let (successful, failed): (&[Action], &[(Action, crate::executor::ExecError)]) = match result {
            FinalResult::Ok(actions) => (actions, &[]),
            FinalResult::Error { successful, failed, .. } => (successful, failed),
            FinalResult::NothingToDo | FinalResult::Aborted | FinalResult::NoSolution => return,
        };

        for action in successful {
            self.render_messages(action, false, ui);
        }
        for (action, _) in failed {
            self.render_messages(action, true, ui);
        }
    }

    /// External-tags mode (§4.1 step 3): for every non-delete action in
    /// the plan, emit the package's external-dependency tag groups whose
    /// tag set is a subset of `configured`, instead of acting on anything.
    fn emit_external_tags(&self, solution: &Solution, configured: &[String], ui: &dyn Ui) {
        let configured: HashSet<String> = configured.iter().cloned().collect();

        for action in solution.to_process.iter_nodes() {
            if action.is_delete() {
                continue;
            }
            let package = action.package();
            let groups = self.manifests.external_dependency_tags(package);
            for group in select_external_tags(&groups, &configured) {
                ui.report(&format!("{package}: {}", group.tags.join(",")));
            }
        }
    }

    fn render_messages(&self, action: &Action, failed: bool, ui: &dyn Ui) {
        if action.is_delete() {
            return;
        }
        let package = action.package();
        let messages = self.manifests.post_messages(package);
        for rendered in messaging::render_post_install_messages(package, &messages, failed, self.filter.as_ref()) {
            ui.post_install_message(&rendered);
        }
    }
}

/// `resolve_and_apply` (§6): calls the out-of-scope solver and, on
/// conflict, prints the conflict reason and returns [`FinalResult::NoSolution`].
pub trait Solver {
    /// Returns `Err(conflict reason)` when the request cannot be satisfied.
    fn solve(
        &self,
        state: &TransientState,
        kind: &RequestKind,
        requested_names: &HashSet<AStr>,
        orphans: &HashSet<AStr>,
    ) -> Result<Solution, String>;
}

impl Applier {
    #[allow(clippy::too_many_arguments)]
    pub fn resolve_and_apply(
        &self,
        state: TransientState,
        kind: RequestKind,
        requested_names: HashSet<AStr>,
        orphans: HashSet<AStr>,
        solver: &dyn Solver,
        ui: &dyn Ui,
        env_source: &dyn EnvWarningSource,
        env: &std::collections::HashMap<String, String>,
        options: &ApplyOptions,
        interrupted: &AtomicBool,
    ) -> Result<FinalResult, Error> {
        match solver.solve(&state, &kind, &requested_names, &orphans) {
            Ok(solution) => self.apply(state, &kind, &requested_names, &solution, ui, env_source, env, options, interrupted),
            Err(conflict) => {
                ui.report(&conflict);
                Ok(FinalResult::NoSolution)
            }
        }
    }
}

pub use crate::atoms::{check_availability, sanitize_atoms};
