/// Dependency-ordered node scheduler
///
/// Compiles a workflow's nodes and edges into the order the orchestrator runs
/// them in. A node is ready once every source of its incoming edges has been
/// ordered. Cycles and edges from unknown nodes are not fatal: the nodes caught
/// in them are left out of the order and simply never execute.

use crate::workflow::types::{Edge, Node};
use std::collections::{HashMap, HashSet};

/// Result of scheduling a workflow
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    /// Node ids in execution order
    pub order: Vec<String>,
    /// Node ids that could never become ready (cycle or missing dependency)
    pub unscheduled: Vec<String>,
}

impl Schedule {
    /// Whether every node made it into the order
    pub fn is_complete(&self) -> bool {
        self.unscheduled.is_empty()
    }
}

/// Build `dependencies[node_id] = [source ids of incoming edges]`
///
/// Sources are kept even when they don't name a node in the workflow, which is
/// what makes their targets unreachable.
pub fn dependencies<'a>(nodes: &'a [Node], edges: &'a [Edge]) -> HashMap<&'a str, Vec<&'a str>> {
    let mut deps: HashMap<&str, Vec<&str>> = nodes.iter().map(|node| (node.id.as_str(), Vec::new())).collect();
    for edge in edges {
        if let Some(sources) = deps.get_mut(edge.target.as_str()) {
            sources.push(edge.source.as_str());
        }
    }
    deps
}

/// Compute a deterministic, dependency-respecting execution order
///
/// Repeatedly scans the not-yet-ordered nodes in declaration order, appending
/// each one whose dependencies are all ordered. Stops when everything is
/// ordered or a full pass adds nothing.
pub fn schedule(nodes: &[Node], edges: &[Edge]) -> Schedule {
    let deps = dependencies(nodes, edges);
    let mut ordered: HashSet<&str> = HashSet::with_capacity(nodes.len());
    let mut order = Vec::with_capacity(nodes.len());

    loop {
        let mut progressed = false;

        for node in nodes {
            let id = node.id.as_str();
            if ordered.contains(id) {
                continue;
            }
            let ready = deps
                .get(id)
                .map_or(true, |sources| sources.iter().all(|source| ordered.contains(source)));
            if ready {
                ordered.insert(id);
                order.push(node.id.clone());
                progressed = true;
            }
        }

        if !progressed || ordered.len() == nodes.len() {
            break;
        }
    }

    let unscheduled: Vec<String> = nodes
        .iter()
        .filter(|node| !ordered.contains(node.id.as_str()))
        .map(|node| node.id.clone())
        .collect();

    if !unscheduled.is_empty() {
        tracing::warn!(
            "🔁 {} node(s) can never become ready (cycle or missing dependency): {:?}",
            unscheduled.len(),
            unscheduled
        );
    }
    tracing::debug!("📋 Execution order: {:?}", order);

    Schedule { order, unscheduled }
}
