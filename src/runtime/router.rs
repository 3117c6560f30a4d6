/// Branch router
///
/// Decides which upstream outputs a node can see. Direct parents feed the
/// positional inputs, filtered by the branch handles of conditional sources.
/// Every transitive ancestor feeds the named inputs, regardless of branches.

use crate::runtime::output::NodeOutput;
use crate::workflow::types::{Edge, Node, NodeKind};
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{Bfs, Reversed};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// The inputs visible to one node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibleInputs {
    /// Outputs of contributing direct parents, in edge declaration order
    pub positional: Vec<Value>,
    /// Ancestor outputs keyed by custom name / label / type, then by node id
    pub named: BTreeMap<String, Value>,
    /// Number of incoming edges from known nodes, contributing or not
    pub incoming_edges: usize,
}

impl VisibleInputs {
    /// Inputs with only positional values, for nodes run outside a graph
    pub fn positional(values: Vec<Value>) -> Self {
        Self {
            positional: values,
            ..Self::default()
        }
    }

    /// First positional input, or null
    pub fn first(&self) -> Value {
        self.positional.first().cloned().unwrap_or(Value::Null)
    }

    /// Whether every incoming edge was cut off by branch routing
    pub fn is_pruned(&self) -> bool {
        self.incoming_edges > 0 && self.positional.is_empty()
    }
}

/// Compute the inputs visible to `node_id`
///
/// Pure: reads the accumulated outputs and conditional results, writes nothing.
pub fn visible_inputs(
    node_id: &str,
    edges: &[Edge],
    outputs: &HashMap<String, NodeOutput>,
    conditionals: &HashMap<String, bool>,
    nodes: &[Node],
) -> VisibleInputs {
    let nodes_by_id: HashMap<&str, &Node> = nodes.iter().map(|node| (node.id.as_str(), node)).collect();
    let mut inputs = VisibleInputs::default();

    for edge in edges.iter().filter(|edge| edge.target == node_id) {
        let Some(source) = nodes_by_id.get(edge.source.as_str()) else {
            continue;
        };
        inputs.incoming_edges += 1;

        let contributes = match conditionals.get(&edge.source) {
            Some(result) => edge.source_handle.as_deref() == Some(if *result { "true" } else { "false" }),
            // A conditional that never produced a result feeds neither branch
            None => source.kind != NodeKind::Conditional,
        };
        if !contributes {
            tracing::debug!(
                "✂️ Edge '{}' → '{}' (handle {:?}) pruned",
                edge.source,
                edge.target,
                edge.source_handle
            );
            continue;
        }

        if let Some(output) = outputs.get(&edge.source) {
            inputs.positional.push(output.to_value());
        }
    }

    inputs.named = named_ancestors(node_id, edges, outputs, &nodes_by_id);
    inputs
}

/// Collect every ancestor's output, nearest first
///
/// Name keys win over id keys, and the nearest ancestor wins among equal names.
fn named_ancestors(
    node_id: &str,
    edges: &[Edge],
    outputs: &HashMap<String, NodeOutput>,
    nodes_by_id: &HashMap<&str, &Node>,
) -> BTreeMap<String, Value> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    graph.add_node(node_id);
    for edge in edges {
        graph.add_edge(edge.source.as_str(), edge.target.as_str(), ());
    }

    let mut ancestors = Vec::new();
    let reversed = Reversed(&graph);
    let mut bfs = Bfs::new(reversed, node_id);
    while let Some(ancestor) = bfs.next(reversed) {
        if ancestor == node_id {
            continue;
        }
        if let (Some(node), Some(output)) = (nodes_by_id.get(ancestor), outputs.get(ancestor)) {
            ancestors.push((*node, output.to_value()));
        }
    }

    let mut named = BTreeMap::new();
    for (node, output) in &ancestors {
        named
            .entry(node.display_name().to_string())
            .or_insert_with(|| output.clone());
    }
    for (node, output) in ancestors {
        named.entry(node.id.clone()).or_insert(output);
    }
    named
}
