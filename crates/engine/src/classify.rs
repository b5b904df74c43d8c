// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Outcome classification and the user-facing report (§4.5).

use std::collections::HashMap;

use crate::{
    executor::ExecError,
    graph::Action,
    scheduler::{Outcome, ScheduleReport},
};

/// The apply pipeline's overall result (§3).
pub enum FinalResult {
    Ok(Vec<Action>),
    NothingToDo,
    Aborted,
    NoSolution,
    Error {
        successful: Vec<Action>,
        failed: Vec<(Action, ExecError)>,
        remaining: Vec<Action>,
    },
}

/// Partitions a [`ScheduleReport`]'s outcomes into `successful`/`failed`/`remaining`
/// and produces the corresponding [`FinalResult`] (§4.4 "Batch classification on completion").
pub fn classify(report: ScheduleReport) -> FinalResult {
    classify_outcomes(report.outcomes)
}

pub fn classify_outcomes(outcomes: HashMap<Action, Outcome>) -> FinalResult {
    let mut successful = Vec::new();
    let mut failed = Vec::new();
    let mut remaining = Vec::new();

    for (action, outcome) in outcomes {
        match outcome {
            Outcome::Success => successful.push(action),
            Outcome::Failed(e) => failed.push((action, e)),
            Outcome::Cancelled => remaining.push(action),
        }
    }

    if failed.is_empty() && remaining.is_empty() {
        FinalResult::Ok(successful)
    } else {
        FinalResult::Error { successful, failed, remaining }
    }
}

/// Renders the human-readable report (§4.5). Returns `None` when fewer
/// than two actions are involved in total, per the boundary rule in §8
/// ("Plan with a single node ... must not print the Error report header").
pub fn render_report(result: &FinalResult) -> Option<String> {
    let (successful, failed, remaining): (&[Action], &[(Action, ExecError)], &[Action]) = match result {
        FinalResult::Ok(actions) => (actions, &[], &[]),
        FinalResult::Error { successful, failed, remaining } => (successful, failed, remaining),
        FinalResult::NothingToDo | FinalResult::Aborted | FinalResult::NoSolution => return None,
    };

    let total = successful.len() + failed.len() + remaining.len();
    if total < 2 {
        return None;
    }

    let mut lines = Vec::new();

    if !successful.is_empty() {
        lines.push(format!(
            "These actions have been completed successfully: {}",
            join_names(successful)
        ));
    }
    if !failed.is_empty() {
        let names: Vec<String> = failed.iter().map(|(a, _)| a.package().to_string()).collect();
        lines.push(format!("The following failed: {}", names.join(", ")));
        for (action, error) in failed {
            lines.push(format!("  {} {}: {error}", action.verb(), action.package()));
        }
    }
    if !remaining.is_empty() {
        lines.push(format!(
            "Due to the errors, the following have been cancelled: {}",
            join_names(remaining)
        ));
    }

    Some(lines.join("\n"))
}

fn join_names(actions: &[Action]) -> String {
    actions.iter().map(|a| a.package().to_string()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::Package;

    fn install(name: &str) -> Action {
        Action::ToChange {
            previous: None,
            target: Package::new(name, "1.0"),
        }
    }

    #[test]
    fn single_node_failure_has_no_report() {
        let result = FinalResult::Error {
            successful: vec![],
            failed: vec![(install("a"), ExecError::Internal("boom".into()))],
            remaining: vec![],
        };
        assert!(render_report(&result).is_none());
    }

    #[test]
    fn multi_node_failure_has_report() {
        let result = FinalResult::Error {
            successful: vec![install("a")],
            failed: vec![(install("b"), ExecError::Internal("boom".into()))],
            remaining: vec![install("c")],
        };
        let report = render_report(&result).unwrap();
        assert!(report.contains("completed successfully"));
        assert!(report.contains("following failed"));
        assert!(report.contains("cancelled"));
    }
}
