/// Trigger node: emits the request that started the run

use crate::runtime::{
    executor::{NodeError, NodeHandler, RunContext},
    output::NodeOutput,
    router::VisibleInputs,
};
use crate::workflow::types::Node;
use async_trait::async_trait;
use serde_json::json;

/// Identity over the triggering event
pub struct TriggerHandler;

#[async_trait]
impl NodeHandler for TriggerHandler {
    async fn execute(&self, node: &Node, _inputs: &VisibleInputs, ctx: &RunContext) -> Result<NodeOutput, NodeError> {
        tracing::debug!("🎯 Trigger '{}' emitting {} {}", node.id, ctx.trigger.method, ctx.trigger.url);
        let event = &ctx.trigger;
        Ok(NodeOutput::from(json!({
            "method": event.method,
            "headers": event.headers,
            "query": event.query,
            "body": event.body,
            "url": event.url,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::types::{NodeData, NodeKind, TriggerEvent};
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_trigger_returns_event_verbatim() {
        let ctx = RunContext {
            trigger: TriggerEvent {
                method: "POST".to_string(),
                url: "/webhook/wf?x=1".to_string(),
                headers: BTreeMap::from([("content-type".to_string(), vec!["application/json".to_string()])]),
                query: BTreeMap::from([("x".to_string(), "1".to_string())]),
                body: json!({ "amount": 150 }),
            },
            ..RunContext::default()
        };
        let node = Node {
            id: "hook".to_string(),
            kind: NodeKind::Trigger,
            data: NodeData::default(),
        };

        let output = TriggerHandler.execute(&node, &VisibleInputs::default(), &ctx).await.unwrap();
        let value = output.to_value();
        assert_eq!(value["body"]["amount"], json!(150));
        assert_eq!(value["headers"]["content-type"], json!(["application/json"]));
        assert_eq!(value["query"]["x"], json!("1"));
        assert_eq!(value["method"], json!("POST"));
    }
}
