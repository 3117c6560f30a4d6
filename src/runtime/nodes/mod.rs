/// Built-in node kinds
///
/// One module per kind, each exposing a `NodeHandler` implementation.

pub mod auth;
pub mod code_run;
pub mod conditional;
pub mod http;
pub mod llm_call;
pub mod passthrough;
pub mod trigger;

use crate::runtime::executor::NodeError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Deserialize a node's config into its typed form
pub(crate) fn parse_config<T: DeserializeOwned>(config: &Value) -> Result<T, NodeError> {
    serde_json::from_value(config.clone()).map_err(|e| {
        let message = e.to_string();
        match message.strip_prefix("missing field `") {
            Some(rest) => NodeError::MissingConfig(rest.split('`').next().unwrap_or_default().to_string()),
            None => NodeError::InvalidConfig(format!("invalid node config: {}", message)),
        }
    })
}

/// Read a timeout given as seconds (number or numeric string)
pub(crate) fn timeout_secs(value: Option<&Value>) -> Option<f64> {
    let secs = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (secs > 0.0 && secs.is_finite()).then_some(secs)
}
