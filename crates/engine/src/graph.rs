// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use dag::Dag;
use petgraph::Direction;
use serde::Serialize;

use crate::package::Package;

/// A single package action, as produced by the solver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    ToChange { previous: Option<Package>, target: Package },
    ToRecompile(Package),
    ToDelete(Package),
}

impl Action {
    pub fn package(&self) -> &Package {
        match self {
            Action::ToChange { target, .. } => target,
            Action::ToRecompile(p) => p,
            Action::ToDelete(p) => p,
        }
    }

    /// Verb used in report lines and error messages (§4.5).
    pub fn verb(&self) -> &'static str {
        match self {
            Action::ToChange { previous: None, .. } => "installing",
            Action::ToChange {
                previous: Some(prev),
                target,
            } => match target.version.cmp(&prev.version) {
                std::cmp::Ordering::Greater => "upgrading to",
                std::cmp::Ordering::Less => "downgrading to",
                std::cmp::Ordering::Equal => "installing",
            },
            Action::ToRecompile(_) => "recompiling",
            Action::ToDelete(_) => "removing",
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Action::ToDelete(_))
    }

    /// Audit-log solution record entry (§6).
    pub fn audit_record(&self) -> serde_json::Value {
        match self {
            Action::ToChange { previous: None, target } => serde_json::json!({ "install": target }),
            Action::ToChange {
                previous: Some(prev),
                target,
            } => {
                let key = if target.version > prev.version { "upgrade" } else { "downgrade" };
                serde_json::json!({ key: [prev, target] })
            }
            Action::ToRecompile(p) => serde_json::json!({ "recompile": p }),
            Action::ToDelete(p) => serde_json::json!({ "delete": p }),
        }
    }
}

impl Serialize for Action {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.audit_record().serialize(serializer)
    }
}

/// DAG of [`Action`]s; edges point from a prerequisite action to an
/// action that depends on it.
pub type ActionGraph = Dag<Action>;

/// The solver's output, consumed read-only by the engine.
#[derive(Debug, Clone, Default)]
pub struct Solution {
    pub to_process: ActionGraph,
}

impl Solution {
    pub fn is_empty(&self) -> bool {
        self.to_process.iter_nodes().next().is_none()
    }

    pub fn package_names(&self) -> std::collections::HashSet<astr::AStr> {
        self.to_process.iter_nodes().map(|a| a.package().name.clone()).collect()
    }
}

/// Direct graph predecessors of `node` (nodes with an edge into it).
pub fn predecessors<'a>(graph: &'a ActionGraph, node: &Action) -> Vec<&'a Action> {
    let Some(index) = graph.get_index(node) else {
        return Vec::new();
    };
    graph
        .as_ref()
        .neighbors_directed(index, Direction::Incoming)
        .map(|i| &graph.as_ref()[i])
        .collect()
}

/// Direct graph successors (used for cancellation-closure assertions in tests).
pub fn successors<'a>(graph: &'a ActionGraph, node: &Action) -> Vec<&'a Action> {
    let Some(index) = graph.get_index(node) else {
        return Vec::new();
    };
    graph
        .as_ref()
        .neighbors_directed(index, Direction::Outgoing)
        .map(|i| &graph.as_ref()[i])
        .collect()
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
    fn predecessors_reflect_edges() {
        let mut graph = ActionGraph::new();
        let a = install("a");
        let b = install("b");
        let ia = graph.add_node_or_get_index(&a);
        let ib = graph.add_node_or_get_index(&b);
        graph.add_edge(ia, ib);

        assert_eq!(predecessors(&graph, &b), vec![&a]);
        assert!(predecessors(&graph, &a).is_empty());
        assert_eq!(successors(&graph, &a), vec![&b]);
    }

    #[test]
    fn verb_selection() {
        let upgrade = Action::ToChange {
            previous: Some(Package::new("a", "1.0")),
            target: Package::new("a", "2.0"),
        };
        assert_eq!(upgrade.verb(), "upgrading to");

        let downgrade = Action::ToChange {
            previous: Some(Package::new("a", "2.0")),
            target: Package::new("a", "1.0"),
        };
        assert_eq!(downgrade.verb(), "downgrading to");
    }
}
