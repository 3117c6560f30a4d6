/// Core workflow type definitions
///
/// Defines the workflow snapshot the engine runs against: nodes, edges, and the
/// triggering event. These types are deserialized from the JSON definitions saved
/// by the workflow editor, so field names follow that wire format.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

/// A complete workflow definition containing nodes and their connections
///
/// A run captures one of these as an immutable snapshot at start and never
/// re-reads it, so every node in the run sees the same graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique workflow identifier (e.g., "wf-orders")
    pub id: String,
    /// Human-readable workflow name
    #[serde(default)]
    pub name: String,
    /// List of nodes in this workflow
    pub nodes: Vec<Node>,
    /// List of edges connecting nodes
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Workflow {
    /// Look up a node by id
    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == node_id)
    }

    /// Check the structural preconditions a run depends on
    ///
    /// Node ids must be non-empty and unique. Dangling edges are not an error
    /// here: the scheduler treats their targets as unreachable.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if node.id.trim().is_empty() {
                return Err(anyhow::anyhow!("Workflow '{}' contains a node with an empty id", self.id));
            }
            if !seen.insert(node.id.as_str()) {
                return Err(anyhow::anyhow!("Workflow '{}' contains duplicate node id '{}'", self.id, node.id));
            }
        }
        Ok(())
    }
}

/// A single node in the workflow DAG
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique node identifier within the workflow (e.g., "node_1")
    pub id: String,
    /// The type of node which determines execution behavior
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Configuration plus the alternate names this node can be addressed by
    #[serde(default)]
    pub data: NodeData,
}

impl Node {
    /// Node configuration object (empty object when absent)
    pub fn config(&self) -> &Value {
        &self.data.config
    }

    /// The key this node's output is published under for named lookups
    ///
    /// Custom name first, then label, then the raw type string.
    pub fn display_name(&self) -> &str {
        self.data
            .custom_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| self.data.label.as_deref().filter(|label| !label.trim().is_empty()))
            .unwrap_or_else(|| self.kind.as_str())
    }
}

/// Per-node payload as saved by the editor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeData {
    /// Node-specific configuration parameters as flexible JSON
    #[serde(default = "empty_object")]
    pub config: Value,
    /// User-assigned name, usable in `{{ Name.path }}` expressions
    #[serde(rename = "customName", default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    /// Editor label, used when no custom name is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Default for NodeData {
    fn default() -> Self {
        Self {
            config: empty_object(),
            custom_name: None,
            label: None,
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Available node kinds
///
/// Parsed from the `type` string of a saved node. Unknown types are kept verbatim
/// in `Other` and executed as passthrough, so old workflows with retired node
/// types still run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Entry point; emits the triggering request
    Trigger,
    /// Outbound HTTP request
    Http,
    /// If/else evaluation; its result drives branch routing
    Conditional,
    /// User script run in an external runtime process
    CodeRun,
    /// Chat-completion call against an LLM provider
    LlmCall,
    /// Any other type string
    Other(String),
}

impl NodeKind {
    /// Parse a saved type string, accepting the legacy aliases
    pub fn parse(type_name: &str) -> Self {
        match type_name {
            "trigger" | "webhook" => NodeKind::Trigger,
            "http" | "httpRequest" => NodeKind::Http,
            "conditional" | "if" => NodeKind::Conditional,
            "codeRun" | "code" => NodeKind::CodeRun,
            "llmCall" | "llm" | "openai" => NodeKind::LlmCall,
            other => NodeKind::Other(other.to_string()),
        }
    }

    /// Canonical type string
    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::Trigger => "trigger",
            NodeKind::Http => "http",
            NodeKind::Conditional => "conditional",
            NodeKind::CodeRun => "codeRun",
            NodeKind::LlmCall => "llmCall",
            NodeKind::Other(name) => name,
        }
    }
}

impl Serialize for NodeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NodeKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let type_name = String::deserialize(deserializer)?;
        Ok(NodeKind::parse(&type_name))
    }
}

/// Connection between two nodes in the workflow DAG
///
/// `source_handle` is set on edges leaving a conditional node and names the
/// branch ("true" or "false") the edge belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Source node ID
    pub source: String,
    /// Target node ID
    pub target: String,
    /// Branch identity when the source is a conditional node
    #[serde(rename = "sourceHandle", default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
}

impl Edge {
    /// Plain edge without a branch handle
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            source_handle: None,
        }
    }

    /// Edge leaving a conditional node on the given branch
    pub fn branch(source: impl Into<String>, target: impl Into<String>, handle: bool) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            source_handle: Some(handle.to_string()),
        }
    }
}

/// The inbound request that started a run
///
/// Headers keep every value per name, which is the shape trigger nodes emit
/// and the template resolver unwraps for single-value headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    /// HTTP method (e.g., "POST")
    #[serde(default)]
    pub method: String,
    /// Request URL including the query string
    #[serde(default)]
    pub url: String,
    /// Header name (lowercase) -> values
    #[serde(default)]
    pub headers: BTreeMap<String, Vec<String>>,
    /// URL query parameters
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    /// Request body; JSON when it parsed, a string otherwise
    #[serde(default)]
    pub body: Value,
}

impl TriggerEvent {
    /// Trigger event carrying only a JSON body, as used by manual runs
    pub fn with_body(body: Value) -> Self {
        Self {
            method: "POST".to_string(),
            body,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_kind_aliases_and_round_trip() {
        let node: Node = serde_json::from_value(json!({
            "id": "n1",
            "type": "webhook",
            "data": { "config": {}, "customName": "Incoming" }
        }))
        .unwrap();
        assert_eq!(node.kind, NodeKind::Trigger);
        assert_eq!(node.display_name(), "Incoming");

        let legacy: Node = serde_json::from_value(json!({ "id": "n2", "type": "slackMessage" })).unwrap();
        assert_eq!(legacy.kind, NodeKind::Other("slackMessage".to_string()));
        assert_eq!(serde_json::to_value(&legacy).unwrap()["type"], json!("slackMessage"));
        assert_eq!(legacy.display_name(), "slackMessage");
    }

    #[test]
    fn test_display_name_prefers_custom_name_then_label() {
        let node: Node = serde_json::from_value(json!({
            "id": "n1",
            "type": "http",
            "data": { "label": "Fetch user", "customName": "  " }
        }))
        .unwrap();
        assert_eq!(node.display_name(), "Fetch user");
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let workflow: Workflow = serde_json::from_value(json!({
            "id": "wf",
            "nodes": [
                { "id": "a", "type": "trigger" },
                { "id": "a", "type": "http" }
            ],
            "edges": []
        }))
        .unwrap();
        assert!(workflow.validate().is_err());
    }

    #[test]
    fn test_edge_source_handle_wire_name() {
        let edge: Edge = serde_json::from_value(json!({
            "source": "if", "target": "high", "sourceHandle": "true"
        }))
        .unwrap();
        assert_eq!(edge.source_handle.as_deref(), Some("true"));
    }
}
