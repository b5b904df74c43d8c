// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Bounded-parallelism source fetch stage, run before any mutation (§4.2).

use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, instrument, warn};

use crate::{error::Error, executor::PackageExecutor, graph::Solution, state::TransientState};

/// Result of the download stage; `Missing` maps onto the classified
/// `Error([], [], [])` final result (§4.2), while a real [`Error`]
/// unwinds out of the Applier entirely.
pub enum DownloadOutcome {
    Ready,
    Missing,
}

#[instrument(skip(executor, state, solution), fields(jobs))]
pub fn download(
    executor: &dyn PackageExecutor,
    state: &TransientState,
    solution: &Solution,
    jobs: usize,
    dry_run: bool,
) -> Result<DownloadOutcome, Error> {
    let needed = executor.sources_needed(state, solution);
    debug!(count = needed.len(), "packages requiring source fetch");
    tracing_common::progress_start("download", needed.len());
    let started = Instant::now();

    for package in &needed {
        if executor.is_pinned(package) {
            continue;
        }
        if let Err(e) = executor.warm_cache(package) {
            // Resolved open question (§9, §13): log and proceed rather than
            // failing the apply or silently degrading to offline mode.
            warn!(package = %package, error = %e, "cache warm-up failed, continuing");
        }
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .map_err(|e| Error::Internal(e.to_string()))?;

    let total = needed.len();
    let completed = std::sync::atomic::AtomicUsize::new(0);
    let results: Vec<bool> = pool.install(|| {
        needed
            .par_iter()
            .map(|p| {
                let fetched = executor.download_package(state, p).is_some();
                let done = completed.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
                tracing_common::progress_update(done, total, p.name.as_str());
                fetched
            })
            .collect()
    });

    tracing_common::progress_completed("download", started.elapsed().as_millis(), total);

    let any_missing = results.into_iter().any(|fetched| !fetched);

    if any_missing && !dry_run {
        Ok(DownloadOutcome::Missing)
    } else {
        Ok(DownloadOutcome::Ready)
    }
}
