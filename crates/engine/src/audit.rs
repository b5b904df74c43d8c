// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Audit JSON log (§6): a solution record describing the plan, followed
//! by one error record per failed action.

use crate::{executor::ExecError, graph::{Action, ActionGraph}};

/// A shared JSON sink the engine appends records to. Kept as a trait so
/// the engine has no filesystem dependency of its own; the CLI supplies
/// a concrete file-backed implementation.
pub trait AuditSink: Send + Sync {
    fn append(&self, record: serde_json::Value);
}

/// The solution record: a single array describing the planned actions (§6).
pub fn solution_record(graph: &ActionGraph) -> serde_json::Value {
    serde_json::Value::Array(graph.iter_nodes().map(Action::audit_record).collect())
}

/// Writes the solution record, then one error record per failed action.
pub fn record_apply(sink: &dyn AuditSink, graph: &ActionGraph, failed: &[(Action, ExecError)]) {
    sink.append(solution_record(graph));
    for (action, error) in failed {
        sink.append(error.audit_record(action.package()));
    }
}

/// An [`AuditSink`] that discards every record; used for dry runs and tests.
#[derive(Debug, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn append(&self, _record: serde_json::Value) {}
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::package::Package;

    struct CollectingSink(Mutex<Vec<serde_json::Value>>);

    impl AuditSink for CollectingSink {
        fn append(&self, record: serde_json::Value) {
            self.0.lock().unwrap().push(record);
        }
    }

    #[test]
    fn records_solution_then_one_error_per_failure() {
        let mut graph = ActionGraph::new();
        graph.add_node_or_get_index(&Action::ToChange {
            previous: None,
            target: Package::new("a", "1.0"),
        });

        let sink = CollectingSink(Mutex::new(Vec::new()));
        let failed = vec![(
            Action::ToChange {
                previous: None,
                target: Package::new("b", "2.0"),
            },
            ExecError::Process {
                code: "2".into(),
                duration: 1.0,
                info: Default::default(),
                stdout: vec![],
                stderr: vec![],
            },
        )];

        record_apply(&sink, &graph, &failed);

        let records = sink.0.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["package"], "b-2.0");
        assert_eq!(records[1]["error"]["process-error"]["code"], "2");
    }
}
