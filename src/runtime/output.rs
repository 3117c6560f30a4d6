/// Node output values
///
/// Every node produces exactly one `NodeOutput`. Outputs are written once per run
/// and never mutated afterwards; the router and resolver read them as JSON.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};

/// Structured value produced by executing one node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutput {
    /// JSON object
    Object(Map<String, Value>),
    /// JSON array
    Array(Vec<Value>),
    /// String, number, boolean or null
    Scalar(Value),
    /// Node-local failure, serialized as `{"error": .., "message": ..}`
    Error {
        /// Failure category (e.g., "HTTP request failed")
        error: String,
        /// Detail message
        message: String,
    },
}

impl NodeOutput {
    /// Build an error record
    pub fn error(error: impl Into<String>, message: impl Into<String>) -> Self {
        NodeOutput::Error {
            error: error.into(),
            message: message.into(),
        }
    }

    /// Whether this output records a failure
    pub fn is_error(&self) -> bool {
        matches!(self, NodeOutput::Error { .. })
    }

    /// JSON form of this output
    pub fn to_value(&self) -> Value {
        match self {
            NodeOutput::Object(map) => Value::Object(map.clone()),
            NodeOutput::Array(items) => Value::Array(items.clone()),
            NodeOutput::Scalar(value) => value.clone(),
            NodeOutput::Error { error, message } => json!({ "error": error, "message": message }),
        }
    }
}

impl From<Value> for NodeOutput {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                // {"error": "...", "message": "..."} and nothing else is an error record
                let is_error_record = map.len() == 2
                    && map.get("error").is_some_and(Value::is_string)
                    && map.get("message").is_some_and(Value::is_string);
                if is_error_record {
                    let error = map.get("error").and_then(Value::as_str).unwrap_or_default();
                    let message = map.get("message").and_then(Value::as_str).unwrap_or_default();
                    NodeOutput::error(error, message)
                } else {
                    NodeOutput::Object(map)
                }
            }
            Value::Array(items) => NodeOutput::Array(items),
            scalar => NodeOutput::Scalar(scalar),
        }
    }
}

impl Serialize for NodeOutput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NodeOutput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Value::deserialize(deserializer)?.into())
    }
}
